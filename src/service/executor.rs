//! Child process execution.

use anyhow::{Context, Result};
use std::process::{Command, Stdio};

/// Output of a captured command.
#[derive(Debug, Clone)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Exit code reported when the child was terminated by a signal.
const SIGNALED_EXIT_CODE: i32 = 1;

/// Run `command` with stdin detached, capturing stdout and stderr.
pub fn capture(command: &str, args: &[String]) -> Result<Captured> {
    let output = Command::new(command)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to start command: {}", command))?;

    Ok(Captured {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code().unwrap_or(SIGNALED_EXIT_CODE),
    })
}

/// Run `command` with inherited stdio and return its exit code.
pub fn passthrough(command: &str, args: &[String]) -> Result<i32> {
    let status = Command::new(command)
        .args(args)
        .status()
        .with_context(|| format!("Failed to start command: {}", command))?;
    Ok(status.code().unwrap_or(SIGNALED_EXIT_CODE))
}
