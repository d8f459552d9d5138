//! TOML config file layer.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::Deserialize;
use sheetfit_io_xlsx::{FitConfigError, SpecFitConfig};

/// Config file name under the platform config directory.
pub const C_CONFIG_FILE_NAME: &str = "config.toml";

/// Optional overrides read from `config.toml`.
///
/// Keys mirror [`SpecFitConfig`] fields, plus `default_files` for
/// `--use-defaults`.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub width_factor: Option<f64>,
    pub height_factor: Option<f64>,
    pub min_width: Option<f64>,
    pub max_width: Option<f64>,
    pub min_height: Option<f64>,
    pub max_height: Option<f64>,
    pub default_font_size: Option<f64>,
    pub min_font_size: Option<f64>,
    pub width_padding: Option<f64>,
    pub enable_size_limits: Option<bool>,
    pub enable_font_autofit: Option<bool>,
    pub enable_cell_wrap: Option<bool>,
    pub enable_cell_alignment: Option<bool>,
    pub horizontal_alignment: Option<String>,
    pub vertical_alignment: Option<String>,
    /// Preset inputs; literal paths or glob patterns.
    #[serde(default)]
    pub default_files: Vec<String>,
}

impl FileConfig {
    /// Overlay the values present in this file onto `config`.
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

        let l_switches = [
            (self.enable_size_limits, &mut config.enable_size_limits),
            (self.enable_font_autofit, &mut config.enable_font_autofit),
            (self.enable_cell_wrap, &mut config.enable_cell_wrap),
            (self.enable_cell_alignment, &mut config.enable_cell_alignment),
        ];
        for (value, slot) in l_switches {
            if let Some(val) = value {
                *slot = val;
            }
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

/// `<config dir>/sheetfit/config.toml` for the current platform.
pub fn derive_default_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "sheetfit")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push(C_CONFIG_FILE_NAME);
    Some(path)
}

/// Parse config text.
pub fn parse_file_config(txt: &str) -> Result<FileConfig> {
    toml::from_str(txt).context("invalid config file")
}

/// Load the explicit config file, or the default one when present.
///
/// A missing default file yields an empty config; a missing explicit file is
/// an error.
pub fn load_file_config(path_explicit: Option<&Path>) -> Result<FileConfig> {
    let path_config = match path_explicit {
        Some(path) => {
            if !path.is_file() {
                bail!("config file not found: {}", path.display());
            }
            path.to_path_buf()
        }
        None => match derive_default_config_path() {
            Some(path) if path.is_file() => path,
            _ => return Ok(FileConfig::default()),
        },
    };

    let txt = fs::read_to_string(&path_config)
        .with_context(|| format!("failed to read config file {}", path_config.display()))?;
    parse_file_config(&txt).with_context(|| format!("in {}", path_config.display()))
}
