//! Configuration service for loading and generating config files.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::types::{default_config_dir, default_log_path_for_config_dir};
use super::Config;

/// Configuration service.
pub struct ConfigService;

impl ConfigService {
    /// Get the default configuration file path.
    /// Always uses ~/.config/snip/config.toml for cross-platform consistency.
    pub fn default_path() -> PathBuf {
        default_config_dir().join("config.toml")
    }

    /// Load configuration from file.
    ///
    /// If `path` is `None`, uses the default path.
    /// A missing file yields the default configuration.
    /// Log path defaults to the `logs` directory beside the config file.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = path.map(PathBuf::from).unwrap_or_else(Self::default_path);
        let config_dir = path.parent();

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Config::default()
        };

        config.filters_dir = expand_home(&config.filters_dir);
        config.log_path = expand_home(&config.log_path);

        // log_path left at the general default follows the config file's directory
        let general_default = default_log_path_for_config_dir(None);
        if config.log_path == general_default {
            config.log_path = default_log_path_for_config_dir(config_dir);
        }

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        Ok(config)
    }

    /// Generate default configuration file at the default path.
    pub fn generate_default() -> Result<()> {
        Self::generate_at(&Self::default_path())
    }

    /// Generate default configuration file at the specified path.
    pub fn generate_at(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, Self::default_config_content())
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Generate default configuration content with comments.
    fn default_config_content() -> String {
        r#"# snip configuration file

# Directory holding your own filter definitions (one *.toml file per filter).
# A user filter with the same name as a bundled one replaces it.
# filters_dir = "~/.config/snip/filters"

# Log token savings (input vs output estimate) after each filtered run (default: true)
track_savings = true

# Enable debug logging to file (default: false)
debug = false

# Path to log directory (default: same directory as config.toml/logs)
# log_path = "~/.config/snip/logs"

# Example filter definition (save as ~/.config/snip/filters/make.toml):
#
# name = "make"
# version = 1
# on_error = "passthrough"
#
# [match]
# command = "make"
# exclude_flags = ["-n"]
#
# [[pipeline]]
# action = "remove_lines"
# pattern = '^make\[\d+\]: (Entering|Leaving) directory'
#
# [[pipeline]]
# action = "head"
# n = 50
"#
        .to_string()
    }
}

/// Replace a leading `~/` with the home directory.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
