//! Shared sizing models, options and errors.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::conf::{N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, derive_default_fit_config};

////////////////////////////////////////////////////////////////////////////////
// #region AlignmentModels

/// Horizontal alignment applied to every touched cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumHorizontalAlign {
    /// Align text to the left edge.
    Left,
    /// Center text horizontally (default).
    #[default]
    Center,
    /// Align text to the right edge.
    Right,
}

/// Vertical alignment applied to every touched cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumVerticalAlign {
    /// Align text to the top edge.
    Top,
    /// Center text vertically (default).
    #[default]
    Center,
    /// Align text to the bottom edge.
    Bottom,
}

impl EnumHorizontalAlign {
    /// Lowercase token used on the command line and in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

impl EnumVerticalAlign {
    /// Lowercase token used on the command line and in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Center => "center",
            Self::Bottom => "bottom",
        }
    }
}

impl FromStr for EnumHorizontalAlign {
    type Err = FitConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            _ => Err(FitConfigError::InvalidAlignment(format!(
                "Unrecognized horizontal alignment {s:?}; expected one of left, center, right."
            ))),
        }
    }
}

impl FromStr for EnumVerticalAlign {
    type Err = FitConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "center" => Ok(Self::Center),
            "bottom" => Ok(Self::Bottom),
            _ => Err(FitConfigError::InvalidAlignment(format!(
                "Unrecognized vertical alignment {s:?}; expected one of top, center, bottom."
            ))),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FitConfiguration

/// Immutable sizing configuration, built once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecFitConfig {
    /// Multiplier applied to content-derived column widths.
    pub width_factor: f64,
    /// Multiplier applied to content-derived row heights.
    pub height_factor: f64,
    /// Lower column width bound.
    pub min_width: f64,
    /// Upper column width bound.
    pub max_width: f64,
    /// Lower row height bound.
    pub min_height: f64,
    /// Upper row height bound.
    pub max_height: f64,
    /// Font size assumed for cells without an explicit font size.
    pub default_font_size: f64,
    /// Floor for font autofit shrinking.
    pub min_font_size: f64,
    /// Display units added to a raw column width before scaling (0 = none).
    pub width_padding: f64,
    /// Clamp widths/heights into their bounds.
    pub enable_size_limits: bool,
    /// Shrink fonts of cells that overflow their clamped column.
    pub enable_font_autofit: bool,
    /// Mark touched cells as wrapping text.
    pub enable_cell_wrap: bool,
    /// Apply uniform alignment on touched cells.
    pub enable_cell_alignment: bool,
    /// Horizontal alignment used when alignment is enabled.
    pub horizontal_alignment: EnumHorizontalAlign,
    /// Vertical alignment used when alignment is enabled.
    pub vertical_alignment: EnumVerticalAlign,
}

impl Default for SpecFitConfig {
    fn default() -> Self {
        derive_default_fit_config()
    }
}

impl SpecFitConfig {
    /// Check numeric bounds and pairwise ordering.
    pub fn validate(&self) -> Result<(), FitConfigError> {
        for (c_name, n_value) in [
            ("width_factor", self.width_factor),
            ("height_factor", self.height_factor),
            ("min_width", self.min_width),
            ("max_width", self.max_width),
            ("min_height", self.min_height),
            ("max_height", self.max_height),
            ("default_font_size", self.default_font_size),
            ("min_font_size", self.min_font_size),
        ] {
            if !n_value.is_finite() || n_value <= 0.0 {
                return Err(FitConfigError::InvalidValue(format!(
                    "{c_name} must be a finite number > 0 (got {n_value})."
                )));
            }
        }
        if !self.width_padding.is_finite() || self.width_padding < 0.0 {
            return Err(FitConfigError::InvalidValue(format!(
                "width_padding must be a finite number >= 0 (got {}).",
                self.width_padding
            )));
        }
        if self.min_width > self.max_width {
            return Err(FitConfigError::InvalidRange(format!(
                "min_width ({}) must be <= max_width ({}).",
                self.min_width, self.max_width
            )));
        }
        if self.min_height > self.max_height {
            return Err(FitConfigError::InvalidRange(format!(
                "min_height ({}) must be <= max_height ({}).",
                self.min_height, self.max_height
            )));
        }
        Ok(())
    }
}

/// Invalid configuration; fatal to the whole invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FitConfigError {
    /// Non-positive, non-finite or otherwise unusable number.
    InvalidValue(String),
    /// `min > max` for a bound pair.
    InvalidRange(String),
    /// Unknown alignment token.
    InvalidAlignment(String),
}

impl fmt::Display for FitConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue(msg) => write!(f, "{msg}"),
            Self::InvalidRange(msg) => write!(f, "{msg}"),
            Self::InvalidAlignment(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for FitConfigError {}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region GridModels

/// Calendar date with optional time of day, as shown in the source cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SpecDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub milli: u16,
}

impl SpecDateTime {
    /// Whether any time-of-day component is set.
    pub fn has_time(&self) -> bool {
        self.hour != 0 || self.minute != 0 || self.second != 0 || self.milli != 0
    }

    /// Excel number format that renders like [`fmt::Display`].
    pub fn num_format(&self) -> &'static str {
        if self.has_time() {
            "yyyy-mm-dd hh:mm:ss"
        } else {
            "yyyy-mm-dd"
        }
    }
}

impl fmt::Display for SpecDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)?;
        if self.has_time() {
            write!(f, " {:02}:{:02}:{:02}", self.hour, self.minute, self.second)?;
        }
        Ok(())
    }
}

/// Cell value as read from the source workbook.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    None,
    /// Text value.
    String(String),
    /// Numeric value (durations included, as serial numbers).
    Number(f64),
    /// Boolean value.
    Boolean(bool),
    /// Date or date-time value.
    DateTime(SpecDateTime),
}

impl EnumCellValue {
    /// Display text used for sizing.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Self::None => Cow::Borrowed(""),
            Self::String(s) => Cow::Borrowed(s.as_str()),
            Self::Number(n) => Cow::Owned(n.to_string()),
            Self::Boolean(b) => Cow::Borrowed(if *b { "TRUE" } else { "FALSE" }),
            Self::DateTime(dt) => Cow::Owned(dt.to_string()),
        }
    }

    /// Number format the value needs to display as read.
    pub fn num_format(&self) -> Option<&'static str> {
        match self {
            Self::DateTime(dt) => Some(dt.num_format()),
            _ => None,
        }
    }
}

/// One populated cell. Its position is the key in [`SpecSheetGrid::cells`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecCell {
    /// Cell value; for formula cells, the cached result.
    pub value: EnumCellValue,
    /// Explicit font size in points, if the cell style carries one.
    pub font_size: Option<f64>,
    /// Formula text without the leading `=`.
    pub formula: Option<String>,
}

impl SpecCell {
    /// Text cell without an explicit font.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: EnumCellValue::String(value.into()),
            ..Default::default()
        }
    }

    /// Return a copy with an explicit font size.
    pub fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = Some(font_size);
        self
    }

    /// Return a copy carrying `formula` (a leading `=` is dropped).
    pub fn with_formula(mut self, formula: &str) -> Self {
        self.formula = Some(formula.strip_prefix('=').unwrap_or(formula).to_string());
        self
    }

    /// Font size used for sizing, falling back to `default_font_size`.
    pub fn effective_font_size(&self, default_font_size: f64) -> f64 {
        match self.font_size {
            Some(n) if n.is_finite() && n > 0.0 => n,
            _ => default_font_size,
        }
    }
}

/// Merged region with inclusive zero-based bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SpecMergeRange {
    /// First row (inclusive).
    pub row_start: usize,
    /// First column (inclusive).
    pub col_start: usize,
    /// Last row (inclusive).
    pub row_end: usize,
    /// Last column (inclusive).
    pub col_end: usize,
}

impl SpecMergeRange {
    /// Top-left cell of the region.
    pub fn anchor(&self) -> (usize, usize) {
        (self.row_start, self.col_start)
    }

    /// Whether `(row, col)` lies inside the region.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.row_start..=self.row_end).contains(&row)
            && (self.col_start..=self.col_end).contains(&col)
    }

    /// Whether the region spans exactly one cell.
    pub fn is_single_cell(&self) -> bool {
        self.row_start == self.row_end && self.col_start == self.col_end
    }
}

/// Populated worksheet grid handed to the estimator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSheetGrid {
    /// Worksheet name.
    pub sheet_name: String,
    /// Number of rows in the used range (from row 0).
    pub n_rows: usize,
    /// Number of columns in the used range (from column 0).
    pub n_cols: usize,
    /// Populated cells keyed by `(row, col)`.
    pub cells: BTreeMap<(usize, usize), SpecCell>,
    /// Merged regions.
    pub merges: Vec<SpecMergeRange>,
}

impl SpecSheetGrid {
    /// Empty grid with a fixed extent.
    pub fn with_extent(sheet_name: &str, n_rows: usize, n_cols: usize) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            n_rows,
            n_cols,
            ..Default::default()
        }
    }

    /// Build a grid from row-major text; `""` leaves the slot unpopulated.
    pub fn from_text_rows(sheet_name: &str, rows: &[&[&str]]) -> Self {
        let mut grid = Self::with_extent(sheet_name, 0, 0);
        for (n_row, row) in rows.iter().enumerate() {
            grid.n_rows = usize::max(grid.n_rows, n_row + 1);
            for (n_col, txt) in row.iter().enumerate() {
                grid.n_cols = usize::max(grid.n_cols, n_col + 1);
                if !txt.is_empty() {
                    grid.cells.insert((n_row, n_col), SpecCell::text(*txt));
                }
            }
        }
        grid
    }

    /// Insert a cell, growing the extent when needed.
    pub fn insert(&mut self, row: usize, col: usize, cell: SpecCell) {
        self.n_rows = usize::max(self.n_rows, row + 1);
        self.n_cols = usize::max(self.n_cols, col + 1);
        self.cells.insert((row, col), cell);
    }

    /// Register a merged region, growing the extent when needed.
    pub fn add_merge(&mut self, merge: SpecMergeRange) {
        self.n_rows = usize::max(self.n_rows, merge.row_end + 1);
        self.n_cols = usize::max(self.n_cols, merge.col_end + 1);
        self.merges.push(merge);
    }

    /// Register a merge read from a source sheet.
    ///
    /// Spans running to the last worksheet row or column (whole-row/column
    /// merges) are trimmed to the populated extent, never above the anchor.
    /// Returns `false` when the trimmed region is a single cell and is dropped.
    pub fn add_source_merge(&mut self, mut merge: SpecMergeRange) -> bool {
        if merge.row_end + 1 >= N_NROWS_EXCEL_MAX {
            merge.row_end = usize::max(merge.row_start, self.n_rows.saturating_sub(1));
        }
        if merge.col_end + 1 >= N_NCOLS_EXCEL_MAX {
            merge.col_end = usize::max(merge.col_start, self.n_cols.saturating_sub(1));
        }
        if merge.is_single_cell() {
            return false;
        }
        self.add_merge(merge);
        true
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region EstimateModels

/// Per-sheet sizing result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSheetEstimate {
    /// Target width per column index.
    pub widths_by_col: Vec<f64>,
    /// Target height per row index.
    pub heights_by_row: Vec<f64>,
    /// Autofit font sizes keyed by `(row, col)`.
    pub font_sizes_by_cell: BTreeMap<(usize, usize), f64>,
}

/// Per-sheet write summary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecSheetReport {
    /// Worksheet name.
    pub sheet_name: String,
    /// Rows in the used range.
    pub n_rows: usize,
    /// Columns in the used range.
    pub n_cols: usize,
    /// Cells written (merge members excluded).
    pub n_cells_written: usize,
    /// Merged regions re-applied.
    pub n_merges: usize,
    /// Cells whose font was shrunk by autofit.
    pub n_fonts_adjusted: usize,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecSheetReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FileErrors

/// Category of a per-file failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumFileErrorKind {
    /// File locked/in use, or permission denied.
    FileAccess,
    /// Input file does not exist.
    FileNotFound,
    /// Corrupt or unsupported content.
    FileFormat,
}

impl EnumFileErrorKind {
    /// User-facing category name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileAccess => "FileAccessError",
            Self::FileNotFound => "FileNotFoundError",
            Self::FileFormat => "FileFormatError",
        }
    }
}

impl fmt::Display for EnumFileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One per-file failure with path, category and cause text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFileError {
    /// Offending path (input or output).
    pub path: PathBuf,
    /// Failure category.
    pub kind: EnumFileErrorKind,
    /// User-facing error text.
    pub message: String,
}

impl SpecFileError {
    /// Build an error for `path`.
    pub fn new(path: impl Into<PathBuf>, kind: EnumFileErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for SpecFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.kind, self.path.display(), self.message)
    }
}

impl std::error::Error for SpecFileError {}

// #endregion
////////////////////////////////////////////////////////////////////////////////
