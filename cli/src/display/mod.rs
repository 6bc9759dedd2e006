use colored::Colorize;
use refwatch_core::{
    AuditError, AuditReport, AuditRequest, CategoryFilter, Config, ProbeOutcome, SortMode,
};
use std::path::Path;

const TABLE_HEADER: &str = "Module References";
const INDENT: &str = "  ";
const COLUMN_GAP: &str = "  ";

pub fn flags_banner(config: &Config, request: &AuditRequest) -> String {
    let mut flags = Vec::new();

    if request.options.check {
        flags.push("URI Check: Yes".to_string());
    }
    match request.sort {
        SortMode::ByReference => flags.push("Order: Sorting by Reference".to_string()),
        SortMode::ByReferenceReversed => flags.push("Order: Reverse Sorting".to_string()),
        SortMode::None => {}
    }
    if request.categories != CategoryFilter::All {
        flags.push(format!("Module Filter: {}", request.categories));
    }
    if let Some(pattern) = &config.name_match {
        flags.push(format!("Regex: {}", pattern));
    }
    if config.output.is_some() {
        flags.push("Output to file: Yes".to_string());
    }
    flags.push(format!("Type: {}", request.options.kind_filter));

    flags.join(" | ")
}

fn status_cell(status: Option<ProbeOutcome>, width: usize, colorize: bool) -> String {
    let text = format!("{:<width$}", status.map(|s| s.as_str()).unwrap_or(""), width = width);
    if !colorize {
        return text;
    }
    match status {
        Some(ProbeOutcome::Alive) => text.green().to_string(),
        Some(ProbeOutcome::Down) => text.red().to_string(),
        Some(ProbeOutcome::Unsupported) => text.yellow().to_string(),
        None => text,
    }
}

/// Renders the report table. Padding is computed before colouring so ANSI
/// codes never skew the column widths.
pub fn render_table(report: &AuditReport, colorize: bool) -> String {
    let columns = report.columns();
    let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();

    for row in &report.rows {
        let mut cells = vec![row.module.chars().count()];
        if report.checked {
            cells.push(row.status.map(|s| s.as_str().len()).unwrap_or(0));
        }
        cells.push(row.reference.chars().count());
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell);
        }
    }

    let last = widths.len() - 1;
    let pad = |text: &str, column: usize| -> String {
        if column == last {
            text.to_string()
        } else {
            format!("{:<width$}", text, width = widths[column])
        }
    };

    let mut out = String::new();
    out.push_str(TABLE_HEADER);
    out.push('\n');
    out.push_str(&"=".repeat(TABLE_HEADER.len()));
    out.push_str("\n\n");

    let header: Vec<String> = columns.iter().enumerate().map(|(i, c)| pad(c, i)).collect();
    out.push_str(&format!("{}{}\n", INDENT, header.join(COLUMN_GAP)));
    let rule: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| pad(&"-".repeat(c.len()), i))
        .collect();
    out.push_str(&format!("{}{}\n", INDENT, rule.join(COLUMN_GAP)));

    for row in &report.rows {
        let mut cells = vec![pad(&row.module, 0)];
        if report.checked {
            cells.push(status_cell(row.status, widths[1], colorize));
        }
        cells.push(row.reference.clone());
        out.push_str(&format!("{}{}\n", INDENT, cells.join(COLUMN_GAP)));
    }

    out
}

pub fn print_report(report: &AuditReport) {
    println!();
    print!("{}", render_table(report, true));
    println!();

    if report.interrupted {
        println!(
            "{}",
            format!(
                "Run interrupted: {} references were not checked",
                report.summary.unchecked
            )
            .yellow()
        );
    }
    println!("Number of bad references found: {}", report.bad_reference_count());
}

pub fn print_json(report: &AuditReport) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Writes the rendered table, or the JSON report when the path ends in `.json`.
pub fn save_report(path: &Path, report: &AuditReport) -> refwatch_core::Result<()> {
    let sink_error = |source: std::io::Error| AuditError::Sink {
        path: path.to_path_buf(),
        source,
    };

    let content = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        report.to_json().map_err(|e| sink_error(e.into()))?
    } else {
        render_table(report, false)
    };

    std::fs::write(path, content).map_err(sink_error)
}
