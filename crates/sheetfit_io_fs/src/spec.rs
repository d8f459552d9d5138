//! Batch task models and top-level error types.

use std::fmt;
use std::path::PathBuf;

use sheetfit_io_xlsx::{FitConfigError, SpecFileError, SpecSheetReport};

////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// One input workbook and the path its fitted copy is saved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFitTask {
    /// Source workbook.
    pub path_file_in: PathBuf,
    /// Destination workbook.
    pub path_file_out: PathBuf,
}

/// Result of processing one task.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumFileOutcome {
    /// Every sheet was fitted and the output was saved.
    Success {
        /// Saved output path.
        path_file_out: PathBuf,
        /// Per-sheet write summaries, in workbook order.
        sheets: Vec<SpecSheetReport>,
    },
    /// The file failed; other files were still processed.
    Failure(SpecFileError),
}

/// Per-task outcome tagged with its input path.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecFileOutcome {
    /// Source workbook.
    pub path_file_in: PathBuf,
    /// Success summary or per-file error.
    pub outcome: EnumFileOutcome,
}

impl SpecFileOutcome {
    /// Whether this file was fitted and saved.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, EnumFileOutcome::Success { .. })
    }

    /// Per-file error, if any.
    pub fn error(&self) -> Option<&SpecFileError> {
        match &self.outcome {
            EnumFileOutcome::Failure(err) => Some(err),
            EnumFileOutcome::Success { .. } => None,
        }
    }
}

/// "Top-level call failed" errors (input validation / setup stage).
///
/// Nothing is processed when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// Invalid option combination or sizing configuration.
    Configuration(String),
    /// Invalid preset glob pattern.
    InvalidPattern(String),
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "ConfigurationError: {msg}"),
            Self::InvalidPattern(msg) => write!(f, "ConfigurationError: {msg}"),
        }
    }
}

impl std::error::Error for BatchError {}

impl From<FitConfigError> for BatchError {
    fn from(err: FitConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
