//! snip: output filter for AI coding agents
//!
//! A CLI tool that runs shell commands, rewrites their arguments and shrinks their
//! output through declarative per-command pipelines before an agent reads it.

mod cli;
mod config;
mod domain;
mod service;

use std::fs;
use std::io::{self, Read, Write};
use std::process;

use anyhow::{bail, Context, Result};
use clap::Parser;

use cli::{Cli, Commands};
use config::{Config, ConfigService};
use domain::filter::{loader, LoadedFilters, Source};
use domain::Registry;
use service::RunService;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration; run and proxy fall back to defaults
    let config = match ConfigService::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) if cli.command.tolerates_config_errors() => {
            if !cli.quiet {
                eprintln!("snip: config error: {:#}, using defaults", e);
            }
            Config::default()
        }
        Err(e) => return Err(e),
    };

    // Initialize logging if debug mode
    if cli.debug || config.debug {
        domain::logger::init(&config)?;
    }

    // Execute command
    match cli.command {
        Commands::Run { argv } => {
            let (command, args) = split_argv(&argv)?;
            let service = build_service(&config, cli.quiet)?;
            let code = service.run(command, args)?;
            process::exit(code);
        }
        Commands::Proxy { argv } => {
            let (command, args) = split_argv(&argv)?;
            let service = RunService::new(&config, Registry::default());
            let code = service.proxy(command, args)?;
            process::exit(code);
        }
        Commands::Apply { filter, input } => {
            let service = build_service(&config, cli.quiet)?;
            let raw = match input {
                Some(path) => fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read input: {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let output = service.apply(&filter, &raw)?;
            io::stdout().write_all(output.as_bytes())?;
        }
        Commands::List => {
            let loaded = load_filters(&config, cli.quiet)?;
            for (def, source) in &loaded.definitions {
                let source = match source {
                    Source::User => "user",
                    Source::Bundled => "bundled",
                };
                println!(
                    "{:<20} v{:<3} {:<20} {:<8} {:>2} steps  {}",
                    def.name,
                    def.version,
                    def.key(),
                    source,
                    def.pipeline.len(),
                    def.description.as_deref().unwrap_or("")
                );
            }
        }
        Commands::Check => {
            config::validate(&config)?;
            let loaded = loader::load_all(&config.filters_dir)?;
            for (path, e) in &loaded.skipped {
                eprintln!("{}: {}", path.display(), e);
            }
            let broken = report_broken_steps(&loaded);
            if !loaded.skipped.is_empty() {
                bail!("{} invalid filter file(s)", loaded.skipped.len());
            }
            if !cli.quiet {
                eprintln!(
                    "Configuration is valid. {} filter(s) loaded, {} broken step(s).",
                    loaded.definitions.len(),
                    broken
                );
            }
        }
        Commands::Config => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(ConfigService::default_path);
            println!("config_file   = {}", path.display());
            println!("filters_dir   = {}", config.filters_dir.display());
            println!("log_path      = {}", config.log_path.display());
            println!("debug         = {}", config.debug);
            println!("track_savings = {}", config.track_savings);
        }
        Commands::Init { path } => {
            let config_path = if let Some(p) = path {
                ConfigService::generate_at(&p)?;
                p
            } else {
                ConfigService::generate_default()?;
                ConfigService::default_path()
            };
            if !cli.quiet {
                eprintln!("Configuration file created at: {}", config_path.display());
            }
        }
        Commands::Version => {
            println!("snip {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn split_argv(argv: &[String]) -> Result<(&str, &[String])> {
    match argv.split_first() {
        Some((command, args)) => Ok((command.as_str(), args)),
        None => bail!("No command given"),
    }
}

/// Load user and bundled filters, warning about skipped files.
fn load_filters(config: &Config, quiet: bool) -> Result<LoadedFilters> {
    let loaded = loader::load_all(&config.filters_dir)?;
    if !quiet {
        for (path, e) in &loaded.skipped {
            eprintln!("snip: skipping {}: {}", path.display(), e);
        }
    }
    Ok(loaded)
}

fn build_service(config: &Config, quiet: bool) -> Result<RunService> {
    let loaded = load_filters(config, quiet)?;
    Ok(RunService::new(config, Registry::new(loaded.into_definitions())))
}

/// Print steps whose parameters failed to compile. They fail at run time.
fn report_broken_steps(loaded: &LoadedFilters) -> usize {
    let mut count = 0;
    for (def, _) in &loaded.definitions {
        for (index, step) in def.pipeline.steps().iter().enumerate() {
            if let Some(e) = step.error() {
                eprintln!("{}: pipeline[{}] {}: {}", def.name, index, step.kind(), e);
                count += 1;
            }
        }
    }
    count
}
