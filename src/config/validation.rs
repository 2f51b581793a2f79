//! Configuration validation.

use anyhow::{bail, Result};
use std::path::Path;

use super::Config;

/// Validate configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.filters_dir.as_os_str().is_empty() {
        bail!("filters_dir cannot be empty");
    }
    check_path("filters_dir", &config.filters_dir)?;
    check_path("log_path", &config.log_path)?;
    Ok(())
}

fn check_path(field: &str, path: &Path) -> Result<()> {
    // Path will be created if it doesn't exist, so just check it's valid
    if path.to_string_lossy().contains('\0') {
        bail!("Invalid {}: contains null character", field);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_filters_dir_rejected() {
        let config = Config {
            filters_dir: PathBuf::new(),
            ..Config::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("filters_dir"));
    }

    #[test]
    fn test_null_character_rejected() {
        let config = Config {
            log_path: PathBuf::from("logs\0dir"),
            ..Config::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("log_path"));
    }
}
