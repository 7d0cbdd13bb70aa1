//! Configuration loading and parsing

use anyhow::{Context, Result};
use can_capture::{DisplayOptions, StoreConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration (loaded from config.toml)
///
/// Every section is optional; command-line flags are applied on top.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub display: DisplayOptions,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    /// DBC files used to interpret payloads
    #[serde(default)]
    pub dbc_files: Vec<PathBuf>,
    /// Filter table applied after loading a capture
    pub filter_file: Option<PathBuf>,
    /// Rebase capture time so the first frame sits at 0
    #[serde(default)]
    pub normalize_time: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Directory for per-identifier report files
    pub report_dir: Option<PathBuf>,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    for dbc in &config.input.dbc_files {
        if !dbc.exists() {
            log::warn!("Configured DBC file does not exist: {:?}", dbc);
        }
    }

    Ok(config)
}
