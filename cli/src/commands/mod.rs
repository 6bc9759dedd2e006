use clap::Parser;
use log::info;
use refwatch_core::{Config, SortMode};
use std::path::PathBuf;

#[derive(Parser)]
pub struct Audit {
    #[arg(short, long, help = "Check reference status")]
    check: bool,
    #[arg(short, long, help = "Sort by reference instead of discovery order")]
    sort: bool,
    #[arg(short, long, help = "Reverse sort (implies sorting by reference)")]
    reverse: bool,
    #[arg(
        short = 'f',
        long = "filter",
        value_name = "CATEGORY",
        help = "Filter on module type [All,Exploit,Payload,Post,NOP,Encoder,Auxiliary], repeatable"
    )]
    filter: Vec<String>,
    #[arg(
        short = 't',
        long = "type",
        value_name = "KIND",
        help = "Only show references of this type (see `refwatch kinds`)"
    )]
    kind: Option<String>,
    #[arg(
        short = 'x',
        long = "match",
        value_name = "REGEX",
        help = "String or regex to match against the module name"
    )]
    name_match: Option<String>,
    #[arg(short, long, value_name = "PATH", help = "Save the results to a file (.json for JSON)")]
    output: Option<PathBuf>,
    #[arg(long, value_name = "DIR", help = "Module catalog directory (default: ./modules)")]
    catalog: Option<PathBuf>,
    #[arg(short, long, help = "Output in JSON format")]
    json: bool,
    #[arg(
        long,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Per-reference timeout"
    )]
    timeout: Option<u64>,
    #[arg(
        long,
        value_name = "N",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Number of references checked at once"
    )]
    concurrency: Option<u64>,
    #[arg(long, value_name = "PATH", help = "Config file (default: ./refwatch.yml when present)")]
    config: Option<PathBuf>,
}

impl Audit {
    pub async fn run(&self) -> anyhow::Result<()> {
        let cwd = std::env::current_dir()?;
        let mut config = Config::discover(self.config.as_deref(), &cwd)?;
        self.apply(&mut config);

        let types = config.reference_types()?;
        let request = config.to_request(&types)?;

        if !self.json {
            println!("{}", super::display::flags_banner(&config, &request));
        }

        info!(
            "Auditing {} (check: {}, concurrency: {})",
            config.catalog.display(),
            request.options.check,
            request.options.concurrency
        );
        let registry = super::scan::open_registry(&config.catalog)?;
        let report =
            super::scan::run_audit(registry.as_ref(), &types, &request, config.timeout()).await?;

        if self.json {
            println!("{}", super::display::print_json(&report)?);
        } else {
            super::display::print_report(&report);
        }

        if let Some(path) = &config.output {
            match super::display::save_report(path, &report) {
                Ok(()) => eprintln!("Results saved to: {}", path.display()),
                Err(e) => eprintln!("Warning: {}", e),
            }
        }

        Ok(())
    }

    /// Command line flags win over the config file.
    fn apply(&self, config: &mut Config) {
        if let Some(catalog) = &self.catalog {
            config.catalog = catalog.clone();
        }
        if !self.filter.is_empty() {
            config.categories = self.filter.clone();
        }
        if let Some(kind) = &self.kind {
            config.kind = Some(kind.clone());
        }
        if let Some(pattern) = &self.name_match {
            config.name_match = Some(pattern.clone());
        }
        if self.sort || self.reverse {
            config.sort = SortMode::from_flags(self.sort, self.reverse);
        }
        if self.check {
            config.check = true;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency as usize;
        }
        if let Some(output) = &self.output {
            config.output = Some(output.clone());
        }
    }
}

#[derive(Parser)]
pub struct Kinds {
    #[arg(long, value_name = "PATH", help = "Config file declaring extra reference types")]
    config: Option<PathBuf>,
}

impl Kinds {
    pub fn run(&self) -> anyhow::Result<()> {
        let cwd = std::env::current_dir()?;
        let config = Config::discover(self.config.as_deref(), &cwd)?;
        let types = config.reference_types()?;

        println!("Supported reference types:");
        for (kind, template) in types.entries() {
            if template.is_empty() {
                println!("  - {:<12} (no filter)", kind);
            } else {
                println!("  - {:<12} {}", kind, template);
            }
        }

        Ok(())
    }
}
