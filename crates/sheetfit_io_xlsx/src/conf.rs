//! Sizing constants and default preset factories.

use crate::spec::{EnumHorizontalAlign, EnumVerticalAlign, SpecFitConfig};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel hard cap on column width (character units).
pub const N_WIDTH_EXCEL_MAX: f64 = 255.0;
/// Excel hard cap on row height (points).
pub const N_HEIGHT_EXCEL_MAX: f64 = 409.0;

/// Row-height points per font point for one line of text.
///
/// Calibrated against real workbooks: a 12 pt line needs 15 points of row.
pub const LINE_PITCH_PER_POINT: f64 = 1.25;

/// Display units of a narrow glyph (digits, Latin, ASCII punctuation, ...).
pub const N_UNITS_NARROW: usize = 1;
/// Display units of a wide glyph (CJK ideographs, fullwidth forms, emoji).
pub const N_UNITS_WIDE: usize = 2;

/// Font size changes below this delta are not written back.
pub const N_FONT_SIZE_EPSILON: f64 = 0.1;

/// Build the default sizing configuration.
pub fn derive_default_fit_config() -> SpecFitConfig {
    SpecFitConfig {
        width_factor: 1.3,
        height_factor: 1.3,
        min_width: 8.0,
        max_width: 120.0,
        min_height: 20.0,
        max_height: N_HEIGHT_EXCEL_MAX,
        default_font_size: 12.0,
        min_font_size: 8.0,
        width_padding: 0.0,
        enable_size_limits: true,
        enable_font_autofit: false,
        enable_cell_wrap: true,
        enable_cell_alignment: true,
        horizontal_alignment: EnumHorizontalAlign::Center,
        vertical_alignment: EnumVerticalAlign::Center,
    }
}
