//! Batch planning and per-file fit orchestration.

use std::path::{Path, PathBuf};

use sheetfit_io_xlsx::{
    SpecFileError, SpecFitConfig, SpecSheetReport, XlsxFitWriter, XlsxReader, estimate_sheet,
};
use tracing::{debug, info, warn};

use crate::report::{ReportFit, ReportFitBuilder};
use crate::spec::{BatchError, SpecFitTask};
use crate::util::derive_output_path;

/// Pair each input with its output path.
///
/// `path_file_out` overrides the default `<stem>_beautifuler.xlsx` location and
/// is only valid with exactly one input.
pub fn plan_fit_tasks(
    paths_file_in: &[PathBuf],
    path_file_out: Option<&Path>,
) -> Result<Vec<SpecFitTask>, BatchError> {
    if paths_file_in.is_empty() {
        return Err(BatchError::Configuration(
            "No input files were given.".to_string(),
        ));
    }
    if let Some(path_out) = path_file_out {
        if paths_file_in.len() != 1 {
            return Err(BatchError::Configuration(format!(
                "An explicit output path ({}) requires exactly one input file (got {}).",
                path_out.display(),
                paths_file_in.len()
            )));
        }
        return Ok(vec![SpecFitTask {
            path_file_in: paths_file_in[0].clone(),
            path_file_out: path_out.to_path_buf(),
        }]);
    }

    Ok(paths_file_in
        .iter()
        .map(|path_in| SpecFitTask {
            path_file_in: path_in.clone(),
            path_file_out: derive_output_path(path_in),
        })
        .collect())
}

/// Fit every task in order.
///
/// Returns [`ReportFit`] when the run completes (with possible per-file errors
/// stored in the report). Returns [`BatchError`] only when the configuration is
/// invalid, in which case no file is touched.
pub fn fit_files(tasks: &[SpecFitTask], config: &SpecFitConfig) -> Result<ReportFit, BatchError> {
    config.validate()?;

    let mut builder_fit_report = ReportFitBuilder::default();
    for task in tasks {
        info!(path = %task.path_file_in.display(), "fitting workbook");
        match fit_file(task, config) {
            Ok(l_sheets) => {
                info!(
                    path = %task.path_file_out.display(),
                    n_sheets = l_sheets.len(),
                    "saved fitted workbook"
                );
                builder_fit_report.add_success(
                    task.path_file_in.clone(),
                    task.path_file_out.clone(),
                    l_sheets,
                );
            }
            Err(err) => {
                warn!(
                    path = %err.path.display(),
                    kind = %err.kind,
                    "{}",
                    err.message
                );
                builder_fit_report.add_error(task.path_file_in.clone(), err);
            }
        }
    }

    Ok(builder_fit_report.build())
}

/// Read, estimate and write one workbook.
pub fn fit_file(
    task: &SpecFitTask,
    config: &SpecFitConfig,
) -> Result<Vec<SpecSheetReport>, SpecFileError> {
    let mut reader = XlsxReader::open(&task.path_file_in)?;
    let mut writer = XlsxFitWriter::new(&task.path_file_out);

    let l_sheet_names = reader.sheet_names().to_vec();
    let mut l_sheets = Vec::with_capacity(l_sheet_names.len());
    for sheet_name in &l_sheet_names {
        let grid = reader.read_sheet(sheet_name)?;
        info!(
            sheet = %sheet_name,
            n_rows = grid.n_rows,
            n_cols = grid.n_cols,
            "fitting sheet"
        );
        let estimate = estimate_sheet(&grid, config);
        debug!(
            sheet = %sheet_name,
            widths = ?estimate.widths_by_col,
            heights = ?estimate.heights_by_row,
            "estimated sheet"
        );
        l_sheets.push(writer.write_sheet(&grid, &estimate, config)?);
    }
    writer.close()?;

    Ok(l_sheets)
}
