use crate::collector::Collection;
use crate::reference_types::KindFilter;
use crate::types::ProbeOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One line of the report table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProbeOutcome>,
    pub reference: String,
}

impl ReportRow {
    pub fn new(module: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            status: None,
            reference: reference.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortMode {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "reference")]
    ByReference,
    #[serde(rename = "reference_reversed")]
    ByReferenceReversed,
}

impl SortMode {
    /// Reversal is only defined on the sorted order, so `reverse` alone still sorts.
    pub fn from_flags(sort: bool, reverse: bool) -> Self {
        match (sort, reverse) {
            (_, true) => SortMode::ByReferenceReversed,
            (true, false) => SortMode::ByReference,
            (false, false) => SortMode::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::None => "none",
            SortMode::ByReference => "reference",
            SortMode::ByReferenceReversed => "reference_reversed",
        }
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(SortMode::None),
            "reference" => Ok(SortMode::ByReference),
            "reference_reversed" => Ok(SortMode::ByReferenceReversed),
            other => Err(format!(
                "unknown sort mode '{}', expected one of: none, reference, reference_reversed",
                other
            )),
        }
    }
}

/// Applies the sort policy. Sorting is stable, discovery order breaks ties.
pub fn sort_rows(mut rows: Vec<ReportRow>, mode: SortMode) -> Vec<ReportRow> {
    match mode {
        SortMode::None => {}
        SortMode::ByReference => rows.sort_by(|a, b| a.reference.cmp(&b.reference)),
        SortMode::ByReferenceReversed => {
            rows.sort_by(|a, b| a.reference.cmp(&b.reference));
            rows.reverse();
        }
    }
    rows
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub total_references: usize,
    pub bad_reference_count: usize,
    pub alive: usize,
    pub down: usize,
    pub unsupported: usize,
    /// References dropped because the run was interrupted before they were probed.
    pub unchecked: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub timestamp: DateTime<Utc>,

    pub checked: bool,

    pub interrupted: bool,

    pub kind_filter: String,

    pub sort: SortMode,

    pub elapsed: u64,

    pub summary: ReportSummary,

    pub rows: Vec<ReportRow>,
}

impl AuditReport {
    /// Turns collected rows into the final, ordered report.
    ///
    /// The bad reference count is carried over from collection as is.
    pub fn finalize(
        collection: Collection,
        checked: bool,
        kind_filter: &KindFilter,
        sort: SortMode,
    ) -> Self {
        let rows = sort_rows(collection.rows, sort);

        let mut summary = ReportSummary {
            total_references: rows.len(),
            bad_reference_count: collection.bad_reference_count,
            unchecked: collection.skipped,
            ..ReportSummary::default()
        };

        for row in &rows {
            match row.status {
                Some(ProbeOutcome::Alive) => summary.alive += 1,
                Some(ProbeOutcome::Down) => summary.down += 1,
                Some(ProbeOutcome::Unsupported) => summary.unsupported += 1,
                None => {}
            }
        }

        Self {
            timestamp: Utc::now(),
            checked,
            interrupted: collection.skipped > 0,
            kind_filter: kind_filter.to_string(),
            sort,
            elapsed: 0,
            summary,
            rows,
        }
    }

    pub fn columns(&self) -> Vec<&'static str> {
        if self.checked {
            vec!["Module", "Status", "Reference"]
        } else {
            vec!["Module", "Reference"]
        }
    }

    pub fn bad_reference_count(&self) -> usize {
        self.summary.bad_reference_count
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(references: &[&str]) -> Vec<ReportRow> {
        references
            .iter()
            .enumerate()
            .map(|(i, r)| ReportRow::new(format!("m{}", i), *r))
            .collect()
    }

    fn references(rows: &[ReportRow]) -> Vec<&str> {
        rows.iter().map(|r| r.reference.as_str()).collect()
    }

    #[test]
    fn test_sort_modes() {
        let input = rows(&["CVE-1", "BID-2"]);

        let none = sort_rows(input.clone(), SortMode::None);
        assert_eq!(references(&none), vec!["CVE-1", "BID-2"]);

        let sorted = sort_rows(input.clone(), SortMode::ByReference);
        assert_eq!(references(&sorted), vec!["BID-2", "CVE-1"]);

        let reversed = sort_rows(input, SortMode::ByReferenceReversed);
        assert_eq!(references(&reversed), vec!["CVE-1", "BID-2"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let input = rows(&["CVE-1", "BID-2", "CVE-1", "BID-2"]);
        let sorted = sort_rows(input, SortMode::ByReference);

        let modules: Vec<&str> = sorted.iter().map(|r| r.module.as_str()).collect();
        assert_eq!(modules, vec!["m1", "m3", "m0", "m2"]);
    }

    #[test]
    fn test_reversed_is_exact_reverse_of_sorted() {
        let input = rows(&["EDB-3", "CVE-1", "BID-2", "CVE-1", "URL-x"]);
        let mut sorted = sort_rows(input.clone(), SortMode::ByReference);
        let reversed = sort_rows(input, SortMode::ByReferenceReversed);

        sorted.reverse();
        assert_eq!(sorted, reversed);
    }

    #[test]
    fn test_reverse_flag_alone_still_sorts() {
        // -r without -s reverses the sorted order, not the discovery order
        assert_eq!(SortMode::from_flags(false, true), SortMode::ByReferenceReversed);
        assert_eq!(SortMode::from_flags(true, true), SortMode::ByReferenceReversed);
        assert_eq!(SortMode::from_flags(true, false), SortMode::ByReference);
        assert_eq!(SortMode::from_flags(false, false), SortMode::None);

        let input = rows(&["BID-2", "CVE-1", "ZDI-3"]);
        let reversed = sort_rows(input, SortMode::from_flags(false, true));
        assert_eq!(references(&reversed), vec!["ZDI-3", "CVE-1", "BID-2"]);
    }

    #[test]
    fn test_sort_mode_from_str() {
        assert_eq!("reference".parse::<SortMode>().unwrap(), SortMode::ByReference);
        assert_eq!(
            "Reference_Reversed".parse::<SortMode>().unwrap(),
            SortMode::ByReferenceReversed
        );
        assert!("module".parse::<SortMode>().is_err());
    }

    #[test]
    fn test_finalize_keeps_bad_count_and_counts_statuses() {
        let mut collected = rows(&["CVE-1", "ZZZ-2", "BID-3"]);
        collected[0].status = Some(ProbeOutcome::Down);
        collected[1].status = Some(ProbeOutcome::Unsupported);
        collected[2].status = Some(ProbeOutcome::Alive);

        let collection = Collection {
            rows: collected,
            bad_reference_count: 2,
            skipped: 0,
        };
        let report =
            AuditReport::finalize(collection, true, &KindFilter::All, SortMode::ByReference);

        assert_eq!(report.bad_reference_count(), 2);
        assert_eq!(report.summary.alive, 1);
        assert_eq!(report.summary.down, 1);
        assert_eq!(report.summary.unsupported, 1);
        assert!(!report.interrupted);
        assert_eq!(references(&report.rows), vec!["BID-3", "CVE-1", "ZZZ-2"]);
        assert_eq!(report.columns(), vec!["Module", "Status", "Reference"]);
        assert_eq!(report.kind_filter, "ALL");
    }

    #[test]
    fn test_json_omits_status_when_unchecked() {
        let collection = Collection {
            rows: rows(&["CVE-1"]),
            bad_reference_count: 0,
            skipped: 0,
        };
        let report = AuditReport::finalize(collection, false, &KindFilter::All, SortMode::None);

        let json = report.to_json().unwrap();
        assert!(!json.contains("\"status\""));
        assert!(json.contains("\"reference\": \"CVE-1\""));
        assert_eq!(report.columns(), vec!["Module", "Reference"]);
    }
}
