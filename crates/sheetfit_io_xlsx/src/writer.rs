//! XLSX writer kernel that applies sizing estimates to workbook output.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{ExcelDateTime, Format, FormatAlign, Formula, Workbook, Worksheet, XlsxError};
use tracing::{debug, warn};

use crate::conf::{N_HEIGHT_EXCEL_MAX, N_WIDTH_EXCEL_MAX};
use crate::spec::{
    EnumCellValue, EnumFileErrorKind, EnumHorizontalAlign, EnumVerticalAlign, SpecCell,
    SpecDateTime, SpecFileError, SpecFitConfig, SpecMergeRange, SpecSheetEstimate, SpecSheetGrid,
    SpecSheetReport,
};
use crate::util::{derive_file_error_kind, derive_merge_member_tracker};

/// Stateful workbook writer for fitted sheets.
pub struct XlsxFitWriter {
    path_file_out: PathBuf,
    workbook: Workbook,
    l_reports: Vec<SpecSheetReport>,
    if_closed: bool,
}

impl XlsxFitWriter {
    /// Create writer bound to output path.
    ///
    /// The workbook is buffered in memory until [`Self::close`] is called.
    pub fn new(path_file_out: impl Into<PathBuf>) -> Self {
        Self {
            path_file_out: path_file_out.into(),
            workbook: Workbook::new(),
            l_reports: Vec::new(),
            if_closed: false,
        }
    }

    /// Output file path.
    pub fn file_out(&self) -> &Path {
        &self.path_file_out
    }

    /// Snapshot of per-sheet write reports.
    pub fn report(&self) -> Vec<SpecSheetReport> {
        self.l_reports.clone()
    }

    /// Flush workbook to disk. Idempotent.
    pub fn close(&mut self) -> Result<(), SpecFileError> {
        if self.if_closed {
            return Ok(());
        }
        self.workbook.save(&self.path_file_out).map_err(|err| {
            let kind = match &err {
                XlsxError::IoError(e) => derive_file_error_kind(e),
                _ => EnumFileErrorKind::FileFormat,
            };
            SpecFileError::new(&self.path_file_out, kind, derive_xlsx_error_text(err))
        })?;
        self.if_closed = true;
        Ok(())
    }

    /// Write one fitted sheet: values, cell styles, merges, widths and heights.
    pub fn write_sheet(
        &mut self,
        grid: &SpecSheetGrid,
        estimate: &SpecSheetEstimate,
        config: &SpecFitConfig,
    ) -> Result<SpecSheetReport, SpecFileError> {
        if self.if_closed {
            return Err(self.derive_format_error("Cannot write after close().".to_string()));
        }
        let report = self
            .write_sheet_impl(grid, estimate, config)
            .map_err(|msg| self.derive_format_error(msg))?;
        self.l_reports.push(report.clone());
        Ok(report)
    }

    fn write_sheet_impl(
        &mut self,
        grid: &SpecSheetGrid,
        estimate: &SpecSheetEstimate,
        config: &SpecFitConfig,
    ) -> Result<SpecSheetReport, String> {
        let worksheet = self.workbook.add_worksheet();
        worksheet
            .set_name(&grid.sheet_name)
            .map_err(derive_xlsx_error_text)?;

        let mut report = SpecSheetReport {
            sheet_name: grid.sheet_name.clone(),
            n_rows: grid.n_rows,
            n_cols: grid.n_cols,
            n_fonts_adjusted: estimate.font_sizes_by_cell.len(),
            ..Default::default()
        };

        let mut cache_formats = FormatCache::new(config);
        let set_merge_members = derive_merge_member_tracker(&grid.merges, grid.n_rows, grid.n_cols);

        for (&(row_idx, col_idx), cell) in &grid.cells {
            if set_merge_members.contains(&(row_idx, col_idx)) {
                continue;
            }
            let n_font_size = estimate
                .font_sizes_by_cell
                .get(&(row_idx, col_idx))
                .copied()
                .or(cell.font_size);
            let format = cache_formats.get(n_font_size, cell.value.num_format());
            write_cell_with_format(worksheet, row_idx, col_idx, cell, format)?;
            report.n_cells_written += 1;
        }

        for merge in &grid.merges {
            let (row_idx, col_idx) = merge.anchor();
            let cell_anchor = grid.cells.get(&(row_idx, col_idx));
            let n_font_size = estimate
                .font_sizes_by_cell
                .get(&(row_idx, col_idx))
                .copied()
                .or(cell_anchor.and_then(|cell| cell.font_size));
            let format = cache_formats.get(
                n_font_size,
                cell_anchor.and_then(|cell| cell.value.num_format()),
            );

            match write_merge_with_format(worksheet, merge, cell_anchor, format) {
                Ok(()) => report.n_merges += 1,
                Err(msg) => {
                    warn!(sheet = %grid.sheet_name, "Skipped merge re-apply: {msg}");
                    report.warn(format!("Merge {merge:?} not re-applied: {msg}"));
                }
            }
        }

        for (col_idx, n_width) in estimate.widths_by_col.iter().copied().enumerate() {
            let n_width_final = if n_width > N_WIDTH_EXCEL_MAX {
                report.warn(format!(
                    "Column {col_idx} width {n_width:.2} capped to {N_WIDTH_EXCEL_MAX}."
                ));
                N_WIDTH_EXCEL_MAX
            } else {
                n_width
            };
            worksheet
                .set_column_width(cast_col_num(col_idx)?, n_width_final)
                .map_err(derive_xlsx_error_text)?;
        }

        for (row_idx, n_height) in estimate.heights_by_row.iter().copied().enumerate() {
            let n_height_final = if n_height > N_HEIGHT_EXCEL_MAX {
                report.warn(format!(
                    "Row {row_idx} height {n_height:.2} capped to {N_HEIGHT_EXCEL_MAX}."
                ));
                N_HEIGHT_EXCEL_MAX
            } else {
                n_height
            };
            worksheet
                .set_row_height(cast_row_num(row_idx)?, n_height_final)
                .map_err(derive_xlsx_error_text)?;
        }

        for msg in &report.warnings {
            warn!(sheet = %grid.sheet_name, "{msg}");
        }
        debug!(
            sheet = %grid.sheet_name,
            n_cells = report.n_cells_written,
            n_merges = report.n_merges,
            "wrote fitted sheet"
        );
        Ok(report)
    }

    fn derive_format_error(&self, message: String) -> SpecFileError {
        SpecFileError::new(&self.path_file_out, EnumFileErrorKind::FileFormat, message)
    }
}

/// Per-sheet cache of cell formats keyed by font size and number format.
struct FormatCache<'a> {
    config: &'a SpecFitConfig,
    dict_formats: BTreeMap<(Option<u64>, Option<&'static str>), Format>,
}

impl<'a> FormatCache<'a> {
    fn new(config: &'a SpecFitConfig) -> Self {
        Self {
            config,
            dict_formats: BTreeMap::new(),
        }
    }

    fn get(&mut self, font_size: Option<f64>, num_format: Option<&'static str>) -> &Format {
        let config = self.config;
        self.dict_formats
            .entry((font_size.map(f64::to_bits), num_format))
            .or_insert_with(|| {
                let format = derive_cell_format(config, font_size);
                match num_format {
                    Some(c_num_format) => format.set_num_format(c_num_format),
                    None => format,
                }
            })
    }
}

/// Build the format applied to a touched cell.
pub fn derive_cell_format(config: &SpecFitConfig, font_size: Option<f64>) -> Format {
    let mut format = Format::new();

    if config.enable_cell_wrap {
        format = format.set_text_wrap();
    }
    if config.enable_cell_alignment {
        format = format
            .set_align(derive_horizontal_format_align(config.horizontal_alignment))
            .set_align(derive_vertical_format_align(config.vertical_alignment));
    }
    if let Some(val) = font_size
        && val.is_finite()
        && val > 0.0
    {
        format = format.set_font_size(val);
    }

    format
}

fn derive_horizontal_format_align(align: EnumHorizontalAlign) -> FormatAlign {
    match align {
        EnumHorizontalAlign::Left => FormatAlign::Left,
        EnumHorizontalAlign::Center => FormatAlign::Center,
        EnumHorizontalAlign::Right => FormatAlign::Right,
    }
}

fn derive_vertical_format_align(align: EnumVerticalAlign) -> FormatAlign {
    match align {
        EnumVerticalAlign::Top => FormatAlign::Top,
        EnumVerticalAlign::Center => FormatAlign::VerticalCenter,
        EnumVerticalAlign::Bottom => FormatAlign::Bottom,
    }
}

fn write_merge_with_format(
    worksheet: &mut Worksheet,
    merge: &SpecMergeRange,
    cell_anchor: Option<&SpecCell>,
    format: &Format,
) -> Result<(), String> {
    let c_anchor_text = match cell_anchor {
        Some(SpecCell {
            value: EnumCellValue::String(val),
            formula: None,
            ..
        }) => val.as_str(),
        _ => "",
    };
    worksheet
        .merge_range(
            cast_row_num(merge.row_start)?,
            cast_col_num(merge.col_start)?,
            cast_row_num(merge.row_end)?,
            cast_col_num(merge.col_end)?,
            c_anchor_text,
            format,
        )
        .map_err(derive_xlsx_error_text)?;

    // merge_range only takes text; other anchors are rewritten in place.
    if let Some(cell) = cell_anchor
        && (cell.formula.is_some()
            || !matches!(cell.value, EnumCellValue::String(_) | EnumCellValue::None))
    {
        write_cell_with_format(worksheet, merge.row_start, merge.col_start, cell, format)?;
    }
    Ok(())
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    cell: &SpecCell,
    format: &Format,
) -> Result<(), String> {
    if let Some(c_formula) = &cell.formula {
        let formula = Formula::new(c_formula).set_result(derive_formula_result(&cell.value));
        worksheet
            .write_formula_with_format(
                cast_row_num(row_idx)?,
                cast_col_num(col_idx)?,
                formula,
                format,
            )
            .map_err(derive_xlsx_error_text)?;
        return Ok(());
    }

    match &cell.value {
        EnumCellValue::None => {
            worksheet
                .write_blank(cast_row_num(row_idx)?, cast_col_num(col_idx)?, format)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::String(val) => {
            worksheet
                .write_string_with_format(
                    cast_row_num(row_idx)?,
                    cast_col_num(col_idx)?,
                    val,
                    format,
                )
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::Number(val) => {
            worksheet
                .write_number_with_format(
                    cast_row_num(row_idx)?,
                    cast_col_num(col_idx)?,
                    *val,
                    format,
                )
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::Boolean(val) => {
            worksheet
                .write_boolean_with_format(
                    cast_row_num(row_idx)?,
                    cast_col_num(col_idx)?,
                    *val,
                    format,
                )
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::DateTime(val) => match derive_excel_datetime(val) {
            Ok(dt) => {
                worksheet
                    .write_datetime_with_format(
                        cast_row_num(row_idx)?,
                        cast_col_num(col_idx)?,
                        &dt,
                        format,
                    )
                    .map_err(derive_xlsx_error_text)?;
            }
            Err(err) => {
                debug!("Date {val} kept as text: {err}");
                worksheet
                    .write_string_with_format(
                        cast_row_num(row_idx)?,
                        cast_col_num(col_idx)?,
                        val.to_string(),
                        format,
                    )
                    .map_err(derive_xlsx_error_text)?;
            }
        },
    }
    Ok(())
}

fn derive_excel_datetime(val: &SpecDateTime) -> Result<ExcelDateTime, XlsxError> {
    let dt = ExcelDateTime::from_ymd(val.year, val.month, val.day)?;
    if val.has_time() {
        dt.and_hms_milli(u16::from(val.hour), val.minute, val.second, val.milli)
    } else {
        Ok(dt)
    }
}

/// Cached result stored next to a formula; dates are stored as serial numbers.
fn derive_formula_result(value: &EnumCellValue) -> String {
    match value {
        EnumCellValue::DateTime(val) => derive_excel_datetime(val)
            .map(|dt| dt.to_excel().to_string())
            .unwrap_or_else(|_| val.to_string()),
        _ => value.text().into_owned(),
    }
}

fn cast_row_num(value: usize) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("row index overflow: {value}"))
}

fn cast_col_num(value: usize) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("column index overflow: {value}"))
}

fn derive_xlsx_error_text(err: XlsxError) -> String {
    format!("xlsx write error: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{calculate_cell_raw_width, estimate_sheet};
    use crate::reader::XlsxReader;
    use crate::test_util::TestDir;

    #[test]
    fn merges_survive_write_and_read_back() {
        let tmp = TestDir::new();
        let path_out = tmp.path().join("out.xlsx");
        let config = SpecFitConfig::default();

        let mut grid = SpecSheetGrid::from_text_rows("Merged", &[&["title", "", "x"], &["a", "b", "c"]]);
        let merge = SpecMergeRange {
            row_start: 0,
            col_start: 0,
            row_end: 0,
            col_end: 1,
        };
        grid.add_merge(merge);
        grid.insert(
            1,
            2,
            SpecCell {
                value: EnumCellValue::Number(3.5),
                font_size: Some(14.0),
                formula: None,
            },
        );

        let estimate = estimate_sheet(&grid, &config);
        let mut writer = XlsxFitWriter::new(&path_out);
        let report = writer
            .write_sheet(&grid, &estimate, &config)
            .expect("write sheet");
        writer.close().expect("close");
        writer.close().expect("close is idempotent");

        assert_eq!(report.n_merges, 1);
        assert!(report.warnings.is_empty());

        let mut reader = XlsxReader::open(&path_out).expect("open output");
        let grid_back = reader.read_sheet("Merged").expect("read back");
        assert_eq!(grid_back.merges, vec![merge]);
        assert_eq!((grid_back.n_rows, grid_back.n_cols), (2, 3));
        assert_eq!(
            grid_back.cells[&(0, 0)].value,
            EnumCellValue::String("title".to_string())
        );
        assert_eq!(grid_back.cells[&(1, 2)].value, EnumCellValue::Number(3.5));
    }

    #[test]
    fn numeric_merge_anchor_keeps_its_value() {
        let tmp = TestDir::new();
        let path_out = tmp.path().join("out.xlsx");
        let config = SpecFitConfig::default();

        let mut grid = SpecSheetGrid::with_extent("S", 2, 2);
        grid.insert(
            0,
            0,
            SpecCell {
                value: EnumCellValue::Number(7.0),
                ..Default::default()
            },
        );
        grid.add_merge(SpecMergeRange {
            row_start: 0,
            col_start: 0,
            row_end: 1,
            col_end: 1,
        });

        let estimate = estimate_sheet(&grid, &config);
        let mut writer = XlsxFitWriter::new(&path_out);
        writer.write_sheet(&grid, &estimate, &config).expect("write");
        writer.close().expect("close");

        let grid_back = XlsxReader::open(&path_out)
            .expect("open")
            .read_sheet("S")
            .expect("read");
        assert_eq!(grid_back.cells[&(0, 0)].value, EnumCellValue::Number(7.0));
        assert_eq!(grid_back.merges.len(), 1);
    }

    #[test]
    fn dates_and_formulas_survive_write_and_read_back() {
        let tmp = TestDir::new();
        let path_out = tmp.path().join("out.xlsx");
        let config = SpecFitConfig::default();

        let date = SpecDateTime {
            year: 2024,
            month: 3,
            day: 5,
            hour: 0,
            minute: 0,
            second: 0,
            milli: 0,
        };
        let stamp = SpecDateTime {
            hour: 8,
            minute: 30,
            ..date
        };
        let cell_of = |value| SpecCell {
            value,
            ..Default::default()
        };
        let mut grid = SpecSheetGrid::with_extent("S", 0, 0);
        grid.insert(0, 0, cell_of(EnumCellValue::DateTime(date)));
        grid.insert(0, 1, cell_of(EnumCellValue::Number(2.0)));
        grid.insert(0, 2, cell_of(EnumCellValue::Number(6.0)).with_formula("=B1*3"));
        grid.insert(1, 0, cell_of(EnumCellValue::DateTime(stamp)));

        let estimate = estimate_sheet(&grid, &config);
        // Dates are measured by their rendered text.
        assert_eq!(
            calculate_cell_raw_width(&grid.cells[&(1, 0)], &config),
            Some("2024-03-05 08:30:00".len() as f64)
        );

        let mut writer = XlsxFitWriter::new(&path_out);
        writer.write_sheet(&grid, &estimate, &config).expect("write");
        writer.close().expect("close");

        let grid_back = XlsxReader::open(&path_out)
            .expect("open")
            .read_sheet("S")
            .expect("read");
        assert_eq!(grid_back.cells[&(0, 0)].value, EnumCellValue::DateTime(date));
        assert_eq!(grid_back.cells[&(1, 0)].value, EnumCellValue::DateTime(stamp));
        assert_eq!(grid_back.cells[&(0, 1)].formula, None);

        let cell_formula = &grid_back.cells[&(0, 2)];
        assert_eq!(cell_formula.formula.as_deref(), Some("B1*3"));
        assert_eq!(cell_formula.value, EnumCellValue::Number(6.0));
    }

    #[test]
    fn oversized_dimensions_are_capped_with_warnings() {
        let tmp = TestDir::new();
        let mut writer = XlsxFitWriter::new(tmp.path().join("out.xlsx"));
        let grid = SpecSheetGrid::from_text_rows("S", &[&["a"]]);
        let estimate = SpecSheetEstimate {
            widths_by_col: vec![300.0],
            heights_by_row: vec![500.0],
            ..Default::default()
        };

        let report = writer
            .write_sheet(&grid, &estimate, &SpecFitConfig::default())
            .expect("write");
        assert_eq!(report.warnings.len(), 2);
        assert_eq!(writer.report().len(), 1);
        writer.close().expect("close");
    }

    #[test]
    fn write_after_close_is_rejected() {
        let tmp = TestDir::new();
        let mut writer = XlsxFitWriter::new(tmp.path().join("out.xlsx"));
        let grid = SpecSheetGrid::from_text_rows("S", &[&["a"]]);
        let config = SpecFitConfig::default();
        let estimate = estimate_sheet(&grid, &config);
        writer.write_sheet(&grid, &estimate, &config).expect("write");
        writer.close().expect("close");

        let err = writer
            .write_sheet(&grid, &estimate, &config)
            .expect_err("closed writer");
        assert_eq!(err.kind, EnumFileErrorKind::FileFormat);
    }

    #[test]
    fn save_into_missing_directory_fails_per_file() {
        let tmp = TestDir::new();
        let mut writer = XlsxFitWriter::new(tmp.path().join("nope").join("out.xlsx"));
        let grid = SpecSheetGrid::from_text_rows("S", &[&["a"]]);
        let config = SpecFitConfig::default();
        let estimate = estimate_sheet(&grid, &config);
        writer.write_sheet(&grid, &estimate, &config).expect("write");
        assert!(writer.close().is_err());
    }
}
