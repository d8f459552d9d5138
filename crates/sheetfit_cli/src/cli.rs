//! Command-line surface and config resolution.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use sheetfit_io_xlsx::{FitConfigError, SpecFitConfig};

use crate::config::FileConfig;

#[derive(Parser, Debug)]
#[command(
    name = "sheetfit",
    version,
    about = "Resize xlsx columns and rows so wide-glyph and multi-line cell text is fully visible."
)]
pub struct Args {
    /// Workbooks to fit. Each is saved as `<stem>_beautifuler.xlsx` next to it.
    pub files: Vec<PathBuf>,

    /// Output path (only valid with a single input).
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Multiplier applied to content-derived column widths.
    #[arg(long)]
    pub width_factor: Option<f64>,

    /// Multiplier applied to content-derived row heights.
    #[arg(long)]
    pub height_factor: Option<f64>,

    /// Lower column width bound.
    #[arg(long)]
    pub min_width: Option<f64>,

    /// Upper column width bound.
    #[arg(long)]
    pub max_width: Option<f64>,

    /// Lower row height bound (points).
    #[arg(long)]
    pub min_height: Option<f64>,

    /// Upper row height bound (points).
    #[arg(long)]
    pub max_height: Option<f64>,

    /// Font size assumed for cells without one (points).
    #[arg(long = "font-size", value_name = "PT")]
    pub default_font_size: Option<f64>,

    /// Smallest font size font autofit may shrink to (points).
    #[arg(long, value_name = "PT")]
    pub min_font_size: Option<f64>,

    /// Display units added to each measured column before scaling (default 0).
    #[arg(long)]
    pub width_padding: Option<f64>,

    /// Do not clamp widths and heights into their bounds.
    #[arg(long)]
    pub disable_size_limits: bool,

    /// Do not mark cells as wrapping text.
    #[arg(long)]
    pub disable_cell_wrap: bool,

    /// Do not change cell alignment.
    #[arg(long)]
    pub disable_cell_alignment: bool,

    /// Shrink fonts of cells that still overflow their column.
    #[arg(long, conflicts_with = "disable_font_autofit")]
    pub enable_font_autofit: bool,

    /// Keep font sizes unchanged (default).
    #[arg(long)]
    pub disable_font_autofit: bool,

    /// Horizontal alignment of touched cells.
    #[arg(long, value_parser = ["left", "center", "right"])]
    pub horizontal_alignment: Option<String>,

    /// Vertical alignment of touched cells.
    #[arg(long, value_parser = ["top", "center", "bottom"])]
    pub vertical_alignment: Option<String>,

    /// Fit the `default_files` list from the config file instead of FILES.
    #[arg(long, conflicts_with = "files")]
    pub use_defaults: bool,

    /// Config file (default: `<config dir>/sheetfit/config.toml`).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Overlay command-line values onto `config`.
    pub fn apply(&self, config: &mut SpecFitConfig) -> Result<(), FitConfigError> {
        let l_numbers = [
            (self.width_factor, &mut config.width_factor),
            (self.height_factor, &mut config.height_factor),
            (self.min_width, &mut config.min_width),
            (self.max_width, &mut config.max_width),
            (self.min_height, &mut config.min_height),
            (self.max_height, &mut config.max_height),
            (self.default_font_size, &mut config.default_font_size),
            (self.min_font_size, &mut config.min_font_size),
            (self.width_padding, &mut config.width_padding),
        ];
        for (value, slot) in l_numbers {
            if let Some(val) = value {
                *slot = val;
            }
        }

        if self.disable_size_limits {
            config.enable_size_limits = false;
        }
        if self.disable_cell_wrap {
            config.enable_cell_wrap = false;
        }
        if self.disable_cell_alignment {
            config.enable_cell_alignment = false;
        }
        if self.enable_font_autofit {
            config.enable_font_autofit = true;
        }
        if self.disable_font_autofit {
            config.enable_font_autofit = false;
        }

        if let Some(val) = &self.horizontal_alignment {
            config.horizontal_alignment = val.parse()?;
        }
        if let Some(val) = &self.vertical_alignment {
            config.vertical_alignment = val.parse()?;
        }
        Ok(())
    }
}

/// Resolve the run configuration: built-in defaults < config file < flags.
pub fn build_fit_config(
    args: &Args,
    file_cfg: &FileConfig,
) -> Result<SpecFitConfig, FitConfigError> {
    let mut config = SpecFitConfig::default();
    file_cfg.apply(&mut config)?;
    args.apply(&mut config)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use sheetfit_io_xlsx::{EnumVerticalAlign, SpecFitConfig};

    use super::{Args, build_fit_config};
    use crate::config::FileConfig;

    #[test]
    fn flags_override_file_which_overrides_defaults() {
        let args = Args::try_parse_from([
            "sheetfit",
            "a.xlsx",
            "--width-factor",
            "2.0",
            "--vertical-alignment",
            "top",
            "--disable-cell-wrap",
        ])
        .expect("parse args");
        let file_cfg = FileConfig {
            width_factor: Some(1.7),
            height_factor: Some(1.1),
            ..FileConfig::default()
        };

        let config = build_fit_config(&args, &file_cfg).expect("config");
        assert_eq!(config.width_factor, 2.0);
        assert_eq!(config.height_factor, 1.1);
        assert_eq!(config.vertical_alignment, EnumVerticalAlign::Top);
        assert!(!config.enable_cell_wrap);
        assert_eq!(config.min_width, SpecFitConfig::default().min_width);
    }

    #[test]
    fn autofit_flags_conflict() {
        assert!(
            Args::try_parse_from([
                "sheetfit",
                "a.xlsx",
                "--enable-font-autofit",
                "--disable-font-autofit"
            ])
            .is_err()
        );
        let args = Args::try_parse_from(["sheetfit", "a.xlsx", "--enable-font-autofit"])
            .expect("parse args");
        assert!(
            build_fit_config(&args, &FileConfig::default())
                .expect("config")
                .enable_font_autofit
        );
    }

    #[test]
    fn inverted_bounds_fail_validation() {
        let args = Args::try_parse_from([
            "sheetfit",
            "a.xlsx",
            "--min-width",
            "50",
            "--max-width",
            "10",
        ])
        .expect("parse args");
        assert!(build_fit_config(&args, &FileConfig::default()).is_err());
    }

    #[test]
    fn unknown_alignment_is_a_usage_error() {
        assert!(
            Args::try_parse_from(["sheetfit", "a.xlsx", "--horizontal-alignment", "middle"])
                .is_err()
        );
    }
}
