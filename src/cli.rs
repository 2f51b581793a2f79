//! CLI argument parsing and command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Shrink verbose command output with declarative filters
#[derive(Parser)]
#[command(
    name = "snip",
    version,
    about = "Shrink verbose command output with declarative filters",
    long_about = "Runs a command, rewrites its arguments and filters its output through \
                  a per-command pipeline so that AI coding agents spend fewer tokens reading it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "SNIP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a command through its filter (alias: exec)
    #[command(alias = "exec")]
    Run {
        /// Command to execute, followed by its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        argv: Vec<String>,
    },
    /// Run a command without filtering
    Proxy {
        /// Command to execute, followed by its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        argv: Vec<String>,
    },
    /// Apply a named filter's pipeline to stdin or a file
    Apply {
        /// Filter name
        filter: String,
        /// Read input from this file instead of stdin
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,
    },
    /// List loaded filters
    List,
    /// Validate configuration and filter definitions
    Check,
    /// Show the effective configuration
    Config,
    /// Generate default configuration file
    Init {
        /// Path where to create the configuration file
        #[arg(long, short = 'p')]
        path: Option<PathBuf>,
    },
    /// Display version information
    Version,
}

impl Commands {
    /// Commands that run the child with default settings when the
    /// configuration file cannot be loaded.
    pub fn tolerates_config_errors(&self) -> bool {
        matches!(self, Commands::Run { .. } | Commands::Proxy { .. })
    }
}
