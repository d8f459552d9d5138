//! Column width / row height estimation over one worksheet grid.
//!
//! Widths come from the widest explicit line of each cell (wide glyphs count
//! double), heights from the number of explicit lines times the font's line
//! pitch. Merge members other than the anchor are never measured.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::conf::{LINE_PITCH_PER_POINT, N_FONT_SIZE_EPSILON};
use crate::spec::{SpecCell, SpecFitConfig, SpecSheetEstimate, SpecSheetGrid};
use crate::util::{
    calculate_text_width, clamp_dimension, count_text_lines, derive_merge_member_tracker,
    is_blank_text,
};

/// Estimate widths, heights and autofit fonts for one sheet.
pub fn estimate_sheet(grid: &SpecSheetGrid, config: &SpecFitConfig) -> SpecSheetEstimate {
    let set_merge_members = derive_merge_member_tracker(&grid.merges, grid.n_rows, grid.n_cols);

    let widths_by_col = estimate_column_widths(grid, config, &set_merge_members);
    let font_sizes_by_cell = if config.enable_font_autofit {
        plan_font_autofit(grid, config, &widths_by_col, &set_merge_members)
    } else {
        BTreeMap::new()
    };
    let heights_by_row =
        estimate_row_heights(grid, config, &set_merge_members, &font_sizes_by_cell);

    debug!(
        sheet = %grid.sheet_name,
        n_cols = widths_by_col.len(),
        n_rows = heights_by_row.len(),
        n_fonts_adjusted = font_sizes_by_cell.len(),
        "estimated sheet dimensions"
    );

    SpecSheetEstimate {
        widths_by_col,
        heights_by_row,
        font_sizes_by_cell,
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region ColumnWidths

/// Raw width contribution of one cell, or `None` for blank cells.
///
/// The widest line's display units, scaled by the cell font relative to the
/// default font.
pub fn calculate_cell_raw_width(cell: &SpecCell, config: &SpecFitConfig) -> Option<f64> {
    let txt = cell.value.text();
    if is_blank_text(&txt) {
        return None;
    }
    let n_font_ratio = cell.effective_font_size(config.default_font_size) / config.default_font_size;
    Some(calculate_text_width(&txt) as f64 * n_font_ratio)
}

/// Final column width from the column's raw width (`None` = empty column).
pub fn calculate_column_width(raw_width: Option<f64>, config: &SpecFitConfig) -> f64 {
    let Some(n_raw) = raw_width else {
        return config.min_width;
    };
    clamp_dimension(
        (n_raw + config.width_padding) * config.width_factor,
        config.min_width,
        config.max_width,
        config.enable_size_limits,
    )
}

fn estimate_column_widths(
    grid: &SpecSheetGrid,
    config: &SpecFitConfig,
    set_merge_members: &BTreeSet<(usize, usize)>,
) -> Vec<f64> {
    let mut l_raw_by_col: Vec<Option<f64>> = vec![None; grid.n_cols];

    for (&(row_idx, col_idx), cell) in &grid.cells {
        if col_idx >= grid.n_cols || set_merge_members.contains(&(row_idx, col_idx)) {
            continue;
        }
        let Some(n_width) = calculate_cell_raw_width(cell, config) else {
            continue;
        };
        let n_raw = &mut l_raw_by_col[col_idx];
        *n_raw = Some(n_raw.map_or(n_width, |n_prev| f64::max(n_prev, n_width)));
    }

    l_raw_by_col
        .into_iter()
        .map(|n_raw| calculate_column_width(n_raw, config))
        .collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RowHeights

/// Raw height of one cell at `font_size`, or `None` when the cell has no
/// content. Whitespace-only text counts only when it carries line breaks.
pub fn calculate_cell_raw_height(cell: &SpecCell, font_size: f64) -> Option<f64> {
    let txt = cell.value.text();
    let n_lines = count_text_lines(&txt);
    if is_blank_text(&txt) && n_lines < 2 {
        return None;
    }
    Some(n_lines as f64 * font_size * LINE_PITCH_PER_POINT)
}

/// Final row height from the row's raw height (`None` = empty row).
pub fn calculate_row_height(raw_height: Option<f64>, config: &SpecFitConfig) -> f64 {
    let Some(n_raw) = raw_height else {
        return config.min_height;
    };
    clamp_dimension(
        n_raw * config.height_factor,
        config.min_height,
        config.max_height,
        config.enable_size_limits,
    )
}

fn estimate_row_heights(
    grid: &SpecSheetGrid,
    config: &SpecFitConfig,
    set_merge_members: &BTreeSet<(usize, usize)>,
    font_sizes_by_cell: &BTreeMap<(usize, usize), f64>,
) -> Vec<f64> {
    let mut l_raw_by_row: Vec<Option<f64>> = vec![None; grid.n_rows];

    for (&(row_idx, col_idx), cell) in &grid.cells {
        if row_idx >= grid.n_rows || set_merge_members.contains(&(row_idx, col_idx)) {
            continue;
        }
        let n_font_size = font_sizes_by_cell
            .get(&(row_idx, col_idx))
            .copied()
            .unwrap_or_else(|| cell.effective_font_size(config.default_font_size));
        let Some(n_height) = calculate_cell_raw_height(cell, n_font_size) else {
            continue;
        };
        let n_raw = &mut l_raw_by_row[row_idx];
        *n_raw = Some(n_raw.map_or(n_height, |n_prev| f64::max(n_prev, n_height)));
    }

    l_raw_by_row
        .into_iter()
        .map(|n_raw| calculate_row_height(n_raw, config))
        .collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FontAutofit

/// Shrink fonts of cells whose text overflows their final column width.
///
/// The column pass is not revisited; cells that still overflow at
/// `min_font_size` keep the floor size.
fn plan_font_autofit(
    grid: &SpecSheetGrid,
    config: &SpecFitConfig,
    widths_by_col: &[f64],
    set_merge_members: &BTreeSet<(usize, usize)>,
) -> BTreeMap<(usize, usize), f64> {
    let mut dict_font_sizes = BTreeMap::new();

    for (&(row_idx, col_idx), cell) in &grid.cells {
        if set_merge_members.contains(&(row_idx, col_idx)) {
            continue;
        }
        let Some(&n_col_width) = widths_by_col.get(col_idx) else {
            continue;
        };
        let Some(n_contribution) = calculate_cell_raw_width(cell, config) else {
            continue;
        };
        if n_contribution <= 0.0 {
            continue;
        }

        let n_required = (n_contribution + config.width_padding) * config.width_factor;
        if n_required <= n_col_width {
            continue;
        }

        let n_font_size = cell.effective_font_size(config.default_font_size);
        let n_scale = (n_col_width / config.width_factor - config.width_padding) / n_contribution;
        let n_font_fit = f64::min(
            n_font_size,
            f64::max(config.min_font_size, n_font_size * n_scale.max(0.0)),
        );
        if n_font_size - n_font_fit > N_FONT_SIZE_EPSILON {
            dict_font_sizes.insert((row_idx, col_idx), n_font_fit);
        }
    }

    dict_font_sizes
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
