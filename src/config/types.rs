//! Configuration data types.

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::validation;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory of user filter definitions (`*.toml`)
    pub filters_dir: PathBuf,

    /// Enable debug logging to file
    pub debug: bool,

    /// Path to log directory
    pub log_path: PathBuf,

    /// Record token savings after each filtered run
    pub track_savings: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filters_dir: default_config_dir().join("filters"),
            debug: false,
            log_path: default_log_path(),
            track_savings: true,
        }
    }
}

impl Config {
    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

/// `~/.config/snip`, or `./.config/snip` without a home directory.
pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("snip")
}

/// Get default log path (relative to config directory).
/// This returns a placeholder; the actual path is set by ConfigService based on config file location.
pub fn default_log_path() -> PathBuf {
    default_log_path_for_config_dir(None)
}

/// Get log path based on config directory.
pub fn default_log_path_for_config_dir(config_dir: Option<&Path>) -> PathBuf {
    config_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_dir)
        .join("logs")
}
