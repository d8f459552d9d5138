//! `sheetfit_io_fs` v1:
//! Batch runner that fits many workbooks in one call.
//!
//! Layout:
//! - `batch`  : task planning and per-file orchestration
//! - `spec`   : tasks/outcomes/errors
//! - `report` : run-time report model
//! - `util`   : output path and preset expansion helpers

pub mod batch;
pub mod report;
pub mod spec;
pub mod util;

#[cfg(test)]
pub(crate) mod test_util;

pub use batch::{fit_file, fit_files, plan_fit_tasks};
pub use report::{ReportFit, ReportFitBuilder};
pub use spec::{BatchError, EnumFileOutcome, SpecFileOutcome, SpecFitTask};
pub use util::{derive_output_path, expand_preset_paths};
