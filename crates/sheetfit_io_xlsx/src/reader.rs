//! XLSX reader kernel that loads worksheet grids for the estimator.
//!
//! Values and fonts come from calamine; merged regions are parsed straight from
//! the worksheet XML part since the value reader does not expose them.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use calamine_styles::{Data, ExcelDateTime, Reader, StyleRange, Xlsx};
use quick_xml::Reader as XmlReader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::spec::{
    EnumCellValue, EnumFileErrorKind, SpecCell, SpecDateTime, SpecFileError, SpecMergeRange,
    SpecSheetGrid,
};
use crate::util::{derive_file_error_kind, parse_a1_range};

type XlsxSource = Xlsx<BufReader<File>>;

/// Workbook opened for reading.
pub struct XlsxReader {
    path_file_in: PathBuf,
    workbook: XlsxSource,
    sheet_names: Vec<String>,
    dict_sheet_xml_paths: Option<BTreeMap<String, String>>,
}

impl XlsxReader {
    /// Open `path_file_in`, classifying failures per file.
    pub fn open(path_file_in: impl AsRef<Path>) -> Result<Self, SpecFileError> {
        let path_file_in = path_file_in.as_ref().to_path_buf();
        let file = File::open(&path_file_in).map_err(|e| {
            SpecFileError::new(
                &path_file_in,
                derive_file_error_kind(&e),
                format!("Failed to open file: {e}"),
            )
        })?;
        let workbook: XlsxSource = Xlsx::new(BufReader::new(file)).map_err(|e| {
            SpecFileError::new(
                &path_file_in,
                EnumFileErrorKind::FileFormat,
                format!("Failed to parse xlsx: {e}"),
            )
        })?;
        let sheet_names = workbook.sheet_names().to_vec();

        Ok(Self {
            path_file_in,
            workbook,
            sheet_names,
            dict_sheet_xml_paths: None,
        })
    }

    /// Source file path.
    pub fn file_in(&self) -> &Path {
        &self.path_file_in
    }

    /// Worksheet names in workbook order.
    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    /// Read one worksheet into a grid anchored at A1.
    pub fn read_sheet(&mut self, sheet_name: &str) -> Result<SpecSheetGrid, SpecFileError> {
        let range = self
            .workbook
            .worksheet_range(sheet_name)
            .map_err(|e| self.derive_format_error(format!("Failed to read sheet {sheet_name}: {e}")))?;

        let mut grid = SpecSheetGrid::with_extent(sheet_name, 0, 0);
        if let Some((n_row_start, n_col_start)) = range.start() {
            let (n_height, n_width) = range.get_size();
            if n_height > 0 && n_width > 0 {
                grid.n_rows = n_row_start as usize + n_height;
                grid.n_cols = n_col_start as usize + n_width;
            }
        }

        let styles = match self.workbook.worksheet_style(sheet_name) {
            Ok(val) => Some(val),
            Err(e) => {
                warn!(
                    path = %self.path_file_in.display(),
                    sheet = sheet_name,
                    "Failed to read cell styles, using default font size: {e}"
                );
                None
            }
        };
        let (n_row_origin, n_col_origin) = range.start().unwrap_or((0, 0));
        for (row_rel, col_rel, data) in range.used_cells() {
            let value = derive_cell_value_from_data(data);
            if value == EnumCellValue::None {
                continue;
            }
            let n_row_abs = n_row_origin + row_rel as u32;
            let n_col_abs = n_col_origin + col_rel as u32;
            grid.insert(
                n_row_abs as usize,
                n_col_abs as usize,
                SpecCell {
                    value,
                    font_size: lookup_font_size(styles.as_ref(), n_row_abs, n_col_abs),
                    formula: None,
                },
            );
        }

        match self.workbook.worksheet_formula(sheet_name) {
            Ok(formulas) => {
                let (n_row_origin, n_col_origin) = formulas.start().unwrap_or((0, 0));
                for (row_rel, col_rel, c_formula) in formulas.used_cells() {
                    let n_row_abs = n_row_origin + row_rel as u32;
                    let n_col_abs = n_col_origin + col_rel as u32;
                    let pos = (n_row_abs as usize, n_col_abs as usize);
                    // Formulas without a cached result still need a cell.
                    let cell = match grid.cells.remove(&pos) {
                        Some(cell) => cell,
                        None => SpecCell {
                            font_size: lookup_font_size(styles.as_ref(), n_row_abs, n_col_abs),
                            ..Default::default()
                        },
                    };
                    grid.insert(pos.0, pos.1, cell.with_formula(c_formula));
                }
            }
            Err(e) => {
                warn!(
                    path = %self.path_file_in.display(),
                    sheet = sheet_name,
                    "Failed to read formulas, keeping cached values: {e}"
                );
            }
        }

        // Merges come last so whole-row/column spans trim to the populated range.
        for merge in self.read_merged_ranges(sheet_name)? {
            if !merge.is_single_cell() && !grid.add_source_merge(merge) {
                debug!(sheet = sheet_name, ?merge, "dropped merge outside populated range");
            }
        }

        debug!(
            sheet = sheet_name,
            n_rows = grid.n_rows,
            n_cols = grid.n_cols,
            n_cells = grid.cells.len(),
            n_merges = grid.merges.len(),
            "read sheet grid"
        );
        Ok(grid)
    }

    fn read_merged_ranges(
        &mut self,
        sheet_name: &str,
    ) -> Result<Vec<SpecMergeRange>, SpecFileError> {
        let mut archive = self.open_zip()?;
        if self.dict_sheet_xml_paths.is_none() {
            let c_workbook_xml = self.read_zip_entry(&mut archive, "xl/workbook.xml")?;
            let c_rels_xml = self.read_zip_entry(&mut archive, "xl/_rels/workbook.xml.rels")?;
            let dict_rel_targets =
                parse_relationship_targets(&c_rels_xml).map_err(|e| self.derive_format_error(e))?;
            let dict_paths = parse_workbook_sheet_rids(&c_workbook_xml)
                .map_err(|e| self.derive_format_error(e))?
                .into_iter()
                .filter_map(|(c_name, c_rid)| {
                    dict_rel_targets
                        .get(&c_rid)
                        .map(|c_target| (c_name, join_part_path("xl/", c_target)))
                })
                .collect();
            self.dict_sheet_xml_paths = Some(dict_paths);
        }

        let Some(c_sheet_path) = self
            .dict_sheet_xml_paths
            .as_ref()
            .and_then(|dict_paths| dict_paths.get(sheet_name))
            .cloned()
        else {
            return Err(self.derive_format_error(format!("Sheet XML not found: {sheet_name}")));
        };
        let c_sheet_xml = self.read_zip_entry(&mut archive, &c_sheet_path)?;
        parse_merged_ranges(&c_sheet_xml).map_err(|e| self.derive_format_error(e))
    }

    fn open_zip(&self) -> Result<ZipArchive<File>, SpecFileError> {
        let file = File::open(&self.path_file_in).map_err(|e| {
            SpecFileError::new(
                &self.path_file_in,
                derive_file_error_kind(&e),
                format!("Failed to reopen file: {e}"),
            )
        })?;
        ZipArchive::new(file)
            .map_err(|e| self.derive_format_error(format!("Failed to read xlsx zip: {e}")))
    }

    fn read_zip_entry(
        &self,
        archive: &mut ZipArchive<File>,
        name: &str,
    ) -> Result<String, SpecFileError> {
        let mut entry = archive
            .by_name(name)
            .map_err(|e| self.derive_format_error(format!("Missing zip part {name}: {e}")))?;
        let mut c_content = String::new();
        entry
            .read_to_string(&mut c_content)
            .map_err(|e| self.derive_format_error(format!("Failed to read zip part {name}: {e}")))?;
        Ok(c_content)
    }

    fn derive_format_error(&self, message: String) -> SpecFileError {
        SpecFileError::new(&self.path_file_in, EnumFileErrorKind::FileFormat, message)
    }
}

/// Explicit font size at an absolute position. Style positions are relative to
/// the style range origin.
fn lookup_font_size(styles: Option<&StyleRange>, n_row_abs: u32, n_col_abs: u32) -> Option<f64> {
    let styles = styles?;
    let (n_row_origin, n_col_origin) = styles.start().unwrap_or((0, 0));
    if n_row_abs < n_row_origin || n_col_abs < n_col_origin {
        return None;
    }
    styles
        .get((
            (n_row_abs - n_row_origin) as usize,
            (n_col_abs - n_col_origin) as usize,
        ))
        .and_then(|style| style.font.as_ref())
        .and_then(|font| font.size)
        .map(f64::from)
}

const N_MS_PER_DAY: f64 = 86_400_000.0;

/// Calendar date from calamine; time of day rounded to the millisecond so that
/// serials like `x.354166666` read back as 08:30:00 rather than 08:29:59.
fn derive_date_time(val: &ExcelDateTime) -> SpecDateTime {
    let (year, month, day, ..) = val.to_ymd_hms_milli();
    let n_ms = ((val.as_f64().fract() * N_MS_PER_DAY).round() as u64)
        .min(N_MS_PER_DAY as u64 - 1);
    SpecDateTime {
        year,
        month,
        day,
        hour: (n_ms / 3_600_000) as u8,
        minute: (n_ms / 60_000 % 60) as u8,
        second: (n_ms / 1_000 % 60) as u8,
        milli: (n_ms % 1_000) as u16,
    }
}

/// Normalize one calamine cell into the writer's value model.
pub fn derive_cell_value_from_data(data: &Data) -> EnumCellValue {
    match data {
        Data::Empty => EnumCellValue::None,
        Data::String(val) => EnumCellValue::String(val.clone()),
        Data::Float(val) => EnumCellValue::Number(*val),
        Data::Int(val) => EnumCellValue::Number(*val as f64),
        Data::Bool(val) => EnumCellValue::Boolean(*val),
        Data::DateTime(val) if val.is_datetime() => {
            EnumCellValue::DateTime(derive_date_time(val))
        }
        Data::DateTime(val) => EnumCellValue::Number(val.as_f64()),
        Data::DateTimeIso(val) | Data::DurationIso(val) => EnumCellValue::String(val.clone()),
        _ => EnumCellValue::String(data.to_string()),
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region OoxmlParts

fn attr_value(e: &BytesStart<'_>, key_local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key_local)
        .and_then(|attr| attr.unescape_value().ok().map(|val| val.into_owned()))
}

fn scan_elements<F>(xml: &str, name_local: &[u8], mut on_element: F) -> Result<(), String>
where
    F: FnMut(&BytesStart<'_>) -> Result<(), String>,
{
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf: Vec<u8> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == name_local {
                    on_element(&e)?;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("Failed to parse OOXML part: {e}")),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

/// `<sheet name=".." r:id=".."/>` pairs from `xl/workbook.xml`.
pub fn parse_workbook_sheet_rids(xml: &str) -> Result<Vec<(String, String)>, String> {
    let mut l_sheets = Vec::new();
    scan_elements(xml, b"sheet", |e| {
        if let (Some(c_name), Some(c_rid)) = (attr_value(e, b"name"), attr_value(e, b"id")) {
            l_sheets.push((c_name, c_rid));
        }
        Ok(())
    })?;
    Ok(l_sheets)
}

/// `Id -> Target` from a relationships part.
pub fn parse_relationship_targets(xml: &str) -> Result<BTreeMap<String, String>, String> {
    let mut dict_targets = BTreeMap::new();
    scan_elements(xml, b"Relationship", |e| {
        if let (Some(c_id), Some(c_target)) = (attr_value(e, b"Id"), attr_value(e, b"Target")) {
            dict_targets.insert(c_id, c_target);
        }
        Ok(())
    })?;
    Ok(dict_targets)
}

/// `<mergeCell ref="A1:B2"/>` regions from a worksheet part.
pub fn parse_merged_ranges(xml: &str) -> Result<Vec<SpecMergeRange>, String> {
    let mut l_merges = Vec::new();
    scan_elements(xml, b"mergeCell", |e| {
        if let Some(c_ref) = attr_value(e, b"ref") {
            l_merges.push(parse_a1_range(&c_ref)?);
        }
        Ok(())
    })?;
    Ok(l_merges)
}

/// Resolve a relationship target against `base_dir`, collapsing `..`.
pub fn join_part_path(base_dir: &str, target: &str) -> String {
    let c_joined = match target.strip_prefix('/') {
        Some(c_abs) => c_abs.to_string(),
        None => format!("{base_dir}{target}"),
    };

    let mut l_parts: Vec<&str> = Vec::new();
    for part in c_joined.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                l_parts.pop();
            }
            _ => l_parts.push(part),
        }
    }
    l_parts.join("/")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
