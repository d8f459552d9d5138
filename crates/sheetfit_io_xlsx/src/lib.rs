//! `sheetfit_io_xlsx` v1:
//! XLSX sizing kernel for wide-glyph and multi-line content.
//!
//! Layout:
//! - `conf`      : constants and default presets
//! - `spec`      : specs/models/errors
//! - `util`      : pure helper functions (text metrics, merges, A1 refs)
//! - `estimator` : column width / row height / font autofit estimation
//! - `reader`    : calamine-backed workbook reader
//! - `writer`    : rust_xlsxwriter-backed fitted workbook writer
pub mod conf;
pub mod estimator;
pub mod reader;
pub mod spec;
pub mod util;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_util;

pub use conf::{
    LINE_PITCH_PER_POINT, N_HEIGHT_EXCEL_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    N_WIDTH_EXCEL_MAX, derive_default_fit_config,
};
pub use estimator::{
    calculate_cell_raw_height, calculate_cell_raw_width, calculate_column_width,
    calculate_row_height, estimate_sheet,
};
pub use reader::XlsxReader;
pub use spec::{
    EnumCellValue, EnumFileErrorKind, EnumHorizontalAlign, EnumVerticalAlign, FitConfigError,
    SpecCell, SpecDateTime, SpecFileError, SpecFitConfig, SpecMergeRange, SpecSheetEstimate,
    SpecSheetGrid, SpecSheetReport,
};
pub use util::{calculate_text_width, count_text_lines, is_wide_char};
pub use writer::{XlsxFitWriter, derive_cell_format};
