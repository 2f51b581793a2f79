//! Debug logging to a daily rolling file.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use time::macros::format_description;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// File name prefix of rotated log files.
const LOG_PREFIX: &str = "snip";

/// Overrides the default `debug` level, e.g. `SNIP_LOG=snip=info`.
const FILTER_ENV: &str = "SNIP_LOG";

/// Log files older than this are removed on startup.
const RETENTION: Duration = Duration::from_secs(2 * 24 * 60 * 60);

/// Install the file subscriber under `config.log_path`.
pub fn init(config: &Config) -> Result<()> {
    fs::create_dir_all(&config.log_path)
        .with_context(|| format!("Failed to create log directory: {}", config.log_path.display()))?;
    cleanup_old_logs(&config.log_path)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.log_path, LOG_PREFIX);

    // Local timezone, UTC when the offset cannot be determined
    let time_format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let local_offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    let timer = OffsetTime::new(local_offset, time_format);

    let filter = EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .with_target(true)
            .with_timer(timer),
    );

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Failed to set global subscriber: {}", e))?;

    Ok(())
}

/// Remove snip log files past the retention window.
pub fn cleanup_old_logs(log_path: &Path) -> Result<()> {
    let Some(cutoff) = SystemTime::now().checked_sub(RETENTION) else {
        return Ok(());
    };
    for path in expired_logs(log_path, cutoff)? {
        let _ = fs::remove_file(&path);
    }
    Ok(())
}

/// Log files in `log_path` last modified before `cutoff`.
fn expired_logs(log_path: &Path, cutoff: SystemTime) -> Result<Vec<PathBuf>> {
    if !log_path.exists() {
        return Ok(Vec::new());
    }

    let mut expired = Vec::new();
    for entry in fs::read_dir(log_path)? {
        let entry = entry?;
        let path = entry.path();

        let is_log = path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(LOG_PREFIX));
        if !is_log {
            continue;
        }

        let modified = entry.metadata().and_then(|m| m.modified());
        if modified.is_ok_and(|m| m < cutoff) {
            expired.push(path);
        }
    }
    expired.sort();
    Ok(expired)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_keeps_fresh_and_foreign_files() {
        let tmp = tempfile::tempdir().unwrap();
        let fresh = tmp.path().join("snip.2026-01-01");
        let foreign = tmp.path().join("other.log");
        fs::write(&fresh, "x").unwrap();
        fs::write(&foreign, "x").unwrap();

        cleanup_old_logs(tmp.path()).unwrap();

        assert!(fresh.exists());
        assert!(foreign.exists());
    }

    #[test]
    fn test_expired_logs_only_matches_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("snip.2026-01-01"), "x").unwrap();
        fs::write(tmp.path().join("snip.2026-01-02"), "x").unwrap();
        fs::write(tmp.path().join("other.log"), "x").unwrap();
        fs::create_dir(tmp.path().join("snip.dir")).unwrap();

        // Everything written so far is older than a cutoff in the future
        let cutoff = SystemTime::now() + Duration::from_secs(60);
        let expired = expired_logs(tmp.path(), cutoff).unwrap();
        assert_eq!(
            expired,
            vec![
                tmp.path().join("snip.2026-01-01"),
                tmp.path().join("snip.2026-01-02"),
            ]
        );
    }

    #[test]
    fn test_cleanup_missing_dir_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(cleanup_old_logs(&tmp.path().join("absent")).is_ok());
    }
}
