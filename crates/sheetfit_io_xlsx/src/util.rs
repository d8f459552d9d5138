//! Stateless helper utilities used by the estimator and the codec.

use std::collections::BTreeSet;
use std::io;

use unicode_width::UnicodeWidthChar;

use crate::conf::{N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, N_UNITS_NARROW, N_UNITS_WIDE};
use crate::spec::{EnumFileErrorKind, SpecMergeRange};

////////////////////////////////////////////////////////////////////////////////
// #region TextMetrics

/// Split text on `\r\n`, `\n` and lone `\r`.
///
/// Text without a break yields exactly one line, so `""` yields `[""]`.
pub fn split_text_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .flat_map(|line| line.strip_suffix('\r').unwrap_or(line).split('\r'))
        .collect()
}

/// Number of visual lines produced by explicit breaks.
pub fn count_text_lines(text: &str) -> usize {
    split_text_lines(text).len()
}

/// Whether a glyph renders at roughly double the width of a Latin letter.
pub fn is_wide_char(chr: char) -> bool {
    chr.width() == Some(2)
}

/// Display units of one line: wide glyphs count 2, everything else 1.
pub fn calculate_line_width(line: &str) -> usize {
    line.chars()
        .map(|chr| {
            if is_wide_char(chr) {
                N_UNITS_WIDE
            } else {
                N_UNITS_NARROW
            }
        })
        .sum()
}

/// Widest line of a possibly multi-line text.
pub fn calculate_text_width(text: &str) -> usize {
    split_text_lines(text)
        .into_iter()
        .map(calculate_line_width)
        .max()
        .unwrap_or(0)
}

/// Empty or whitespace-only text (line breaks count as whitespace).
pub fn is_blank_text(text: &str) -> bool {
    text.trim().is_empty()
}

/// Clamp into `[n_min, n_max]` when limits are on; otherwise only floor at zero.
pub fn clamp_dimension(value: f64, n_min: f64, n_max: f64, if_limit: bool) -> f64 {
    if if_limit {
        value.clamp(n_min, n_max)
    } else {
        value.max(0.0)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MergeUtils

/// Build lookup set of cells covered by a merge (excluding each anchor).
///
/// Members outside `n_rows x n_cols` are not tracked.
pub fn derive_merge_member_tracker(
    merges: &[SpecMergeRange],
    n_rows: usize,
    n_cols: usize,
) -> BTreeSet<(usize, usize)> {
    let mut set_members = BTreeSet::new();

    for merge in merges {
        let n_row_end = usize::min(merge.row_end, n_rows.saturating_sub(1));
        let n_col_end = usize::min(merge.col_end, n_cols.saturating_sub(1));
        for row_idx in merge.row_start..=n_row_end {
            for col_idx in merge.col_start..=n_col_end {
                if (row_idx, col_idx) != merge.anchor() {
                    set_members.insert((row_idx, col_idx));
                }
            }
        }
    }

    set_members
}

/// Parse `B3` / `$B$3` into zero-based `(row, col)`.
pub fn parse_a1_cell(a1: &str) -> Result<(usize, usize), String> {
    let c_clean = a1.trim().replace('$', "").to_ascii_uppercase();
    let n_split = c_clean
        .find(|chr: char| chr.is_ascii_digit())
        .ok_or_else(|| format!("Invalid cell reference: {a1:?}"))?;
    let (c_col, c_row) = c_clean.split_at(n_split);
    if c_col.is_empty() || !c_col.chars().all(|chr| chr.is_ascii_uppercase()) {
        return Err(format!("Invalid cell reference: {a1:?}"));
    }

    let mut n_col = 0usize;
    for chr in c_col.chars() {
        n_col = n_col * 26 + (chr as usize - 'A' as usize + 1);
        if n_col > N_NCOLS_EXCEL_MAX {
            return Err(format!("Column out of range: {a1:?}"));
        }
    }
    let n_row: usize = c_row
        .parse()
        .map_err(|_| format!("Invalid cell reference: {a1:?}"))?;
    if n_row == 0 || n_row > N_NROWS_EXCEL_MAX {
        return Err(format!("Row out of range: {a1:?}"));
    }

    Ok((n_row - 1, n_col - 1))
}

/// Parse `A1:C2` (or a single cell) into a normalized merge range.
pub fn parse_a1_range(range: &str) -> Result<SpecMergeRange, String> {
    let (c_first, c_last) = range.split_once(':').unwrap_or((range, range));
    let (n_row_a, n_col_a) = parse_a1_cell(c_first)?;
    let (n_row_b, n_col_b) = parse_a1_cell(c_last)?;
    Ok(SpecMergeRange {
        row_start: usize::min(n_row_a, n_row_b),
        col_start: usize::min(n_col_a, n_col_b),
        row_end: usize::max(n_row_a, n_row_b),
        col_end: usize::max(n_col_a, n_col_b),
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FileErrorUtils

/// Map an IO error onto the per-file error taxonomy.
pub fn derive_file_error_kind(err: &io::Error) -> EnumFileErrorKind {
    match err.kind() {
        io::ErrorKind::NotFound => EnumFileErrorKind::FileNotFound,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => EnumFileErrorKind::FileFormat,
        _ => EnumFileErrorKind::FileAccess,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
