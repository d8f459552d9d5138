//! Fit report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use sheetfit_io_xlsx::{SpecFileError, SpecSheetReport};

use crate::spec::{EnumFileOutcome, SpecFileOutcome};

/// Aggregate counters and diagnostics for one `fit_files` run.
#[derive(Debug, Default, Clone)]
pub struct ReportFit {
    /// Number of requested files.
    pub cnt_files: u64,
    /// Files fitted and saved.
    pub cnt_succeeded: u64,
    /// Files that failed.
    pub cnt_failed: u64,
    /// Sheets written across all succeeded files.
    pub cnt_sheets: u64,
    /// Non-fatal warnings collected while writing.
    pub warnings: Vec<String>,
    /// Per-file outcomes, in input order.
    pub outcomes: Vec<SpecFileOutcome>,
}

impl ReportFit {
    /// Number of failed files.
    pub fn error_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.is_success())
            .count()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Whether at least one file was requested and all of them succeeded.
    pub fn is_success(&self) -> bool {
        self.cnt_files > 0 && self.cnt_failed == 0
    }

    /// Per-file errors in input order.
    pub fn errors(&self) -> impl Iterator<Item = &SpecFileError> {
        self.outcomes.iter().filter_map(SpecFileOutcome::error)
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_files".to_string(), self.cnt_files);
        dict_counts.insert("cnt_succeeded".to_string(), self.cnt_succeeded);
        dict_counts.insert("cnt_failed".to_string(), self.cnt_failed);
        dict_counts.insert("cnt_sheets".to_string(), self.cnt_sheets);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} files={} succeeded={} failed={} sheets={} warnings={}",
            dict_counts["cnt_files"],
            dict_counts["cnt_succeeded"],
            dict_counts["cnt_failed"],
            dict_counts["cnt_sheets"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[FIT]"))
    }
}

/// Mutable accumulator for fit outcomes.
#[derive(Debug, Default, Clone)]
pub struct ReportFitBuilder {
    /// See [`ReportFit::cnt_sheets`].
    pub cnt_sheets: u64,
    /// See [`ReportFit::warnings`].
    pub warnings: Vec<String>,
    /// See [`ReportFit::outcomes`].
    pub outcomes: Vec<SpecFileOutcome>,
}

impl ReportFitBuilder {
    /// Record a fitted and saved file.
    pub fn add_success(
        &mut self,
        path_file_in: PathBuf,
        path_file_out: PathBuf,
        sheets: Vec<SpecSheetReport>,
    ) {
        self.cnt_sheets += sheets.len() as u64;
        for sheet in &sheets {
            for warning in &sheet.warnings {
                self.warnings.push(format!(
                    "{} [{}]: {warning}",
                    path_file_in.display(),
                    sheet.sheet_name
                ));
            }
        }
        self.outcomes.push(SpecFileOutcome {
            path_file_in,
            outcome: EnumFileOutcome::Success {
                path_file_out,
                sheets,
            },
        });
    }

    /// Record one per-file failure.
    pub fn add_error(&mut self, path_file_in: PathBuf, error: SpecFileError) {
        self.outcomes.push(SpecFileOutcome {
            path_file_in,
            outcome: EnumFileOutcome::Failure(error),
        });
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportFit {
        let cnt_succeeded = self
            .outcomes
            .iter()
            .filter(|outcome| outcome.is_success())
            .count() as u64;
        let cnt_files = self.outcomes.len() as u64;
        ReportFit {
            cnt_files,
            cnt_succeeded,
            cnt_failed: cnt_files - cnt_succeeded,
            cnt_sheets: self.cnt_sheets,
            warnings: self.warnings,
            outcomes: self.outcomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use sheetfit_io_xlsx::{EnumFileErrorKind, SpecFileError, SpecSheetReport};

    use super::{ReportFit, ReportFitBuilder};

    #[test]
    fn report_fit_to_dict_and_format() {
        let mut builder = ReportFitBuilder::default();
        let mut sheet = SpecSheetReport {
            sheet_name: "S".to_string(),
            ..Default::default()
        };
        sheet.warn("Column 0 width capped");
        builder.add_success(
            PathBuf::from("a.xlsx"),
            PathBuf::from("a_beautifuler.xlsx"),
            vec![sheet, SpecSheetReport::default()],
        );
        builder.add_error(
            PathBuf::from("b.xlsx"),
            SpecFileError::new("b.xlsx", EnumFileErrorKind::FileNotFound, "missing"),
        );
        let report = builder.build();

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_files"], 2);
        assert_eq!(dict_counts["cnt_succeeded"], 1);
        assert_eq!(dict_counts["cnt_failed"], 1);
        assert_eq!(dict_counts["cnt_sheets"], 2);
        assert_eq!(dict_counts["cnt_warnings"], 1);
        assert_eq!(report.error_count(), 1);
        assert!(!report.is_success());
        assert_eq!(report.warnings, vec!["a.xlsx [S]: Column 0 width capped"]);

        let txt = report.format("[FIT]");
        assert_eq!(txt, "[FIT] files=2 succeeded=1 failed=1 sheets=2 warnings=1");
        assert_eq!(report.to_string(), txt);
    }

    #[test]
    fn empty_report_is_not_success() {
        assert!(!ReportFit::default().is_success());
        assert!(!ReportFitBuilder::default().build().is_success());
    }
}
