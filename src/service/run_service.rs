//! Command execution and output filtering.

use std::io::{self, Write};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::filter::{final_args, pipeline};
use crate::domain::{FilterDefinition, OnError, Registry};
use crate::service::executor::{self, Captured};
use crate::service::savings::{
    command_line, estimate_tokens, LogRecorder, SavingsRecord, SavingsRecorder,
};

/// Result of a filtered run, ready to be written out.
#[derive(Debug)]
pub struct Outcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Service for running commands through their filters.
pub struct RunService {
    registry: Registry,
    recorder: Option<Box<dyn SavingsRecorder>>,
}

impl RunService {
    /// Create a new RunService over a loaded registry.
    pub fn new(config: &Config, registry: Registry) -> Self {
        let recorder: Option<Box<dyn SavingsRecorder>> = if config.track_savings {
            Some(Box::new(LogRecorder))
        } else {
            None
        };
        debug!(filters = registry.len(), track_savings = config.track_savings, "Registry ready");
        Self { registry, recorder }
    }

    /// Replace the savings recorder.
    #[cfg(test)]
    pub fn with_recorder(mut self, recorder: Box<dyn SavingsRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Run `command` and write its filtered output.
    ///
    /// Commands without a matching filter inherit stdio and run unchanged.
    /// Returns the child's exit code.
    pub fn run(&self, command: &str, args: &[String]) -> Result<i32> {
        let Some(outcome) = self.execute(command, args)? else {
            return self.proxy(command, args);
        };

        let mut stdout = io::stdout().lock();
        stdout.write_all(outcome.stdout.as_bytes())?;
        stdout.flush()?;

        let mut stderr = io::stderr().lock();
        stderr.write_all(outcome.stderr.as_bytes())?;
        stderr.flush()?;

        Ok(outcome.exit_code)
    }

    /// Run `command` unfiltered with inherited stdio.
    pub fn proxy(&self, command: &str, args: &[String]) -> Result<i32> {
        debug!(command = %command_line(command, args), "Passing through");
        executor::passthrough(command, args)
    }

    /// Capture and filter `command`, or `None` when no filter matches.
    pub fn execute(&self, command: &str, args: &[String]) -> Result<Option<Outcome>> {
        let Some(definition) = self.select(command, args) else {
            debug!(command = %command, "No filter matched");
            return Ok(None);
        };

        let (exec_args, injected) = final_args(definition, args);
        info!(
            filter = %definition.name,
            injected,
            command = %command_line(command, &exec_args),
            "Running filtered command"
        );

        let Captured {
            stdout,
            stderr,
            exit_code,
        } = executor::capture(command, &exec_args)?;

        let filtered = filter_output(definition, &stdout);
        if !stdout.is_empty() {
            self.record(SavingsRecord {
                original: command_line(command, args),
                rewritten: command_line(command, &exec_args),
                input_tokens: estimate_tokens(&stdout),
                output_tokens: estimate_tokens(&filtered),
            });
        }

        Ok(Some(Outcome {
            stdout: filtered,
            stderr,
            exit_code,
        }))
    }

    /// Run the named filter's pipeline over `input`.
    ///
    /// Unlike [`RunService::run`], a failing step is an error here.
    pub fn apply(&self, name: &str, input: &str) -> Result<String> {
        let definition = self
            .registry
            .get(name)
            .ok_or_else(|| anyhow!("Unknown filter: {}", name))?;
        let output = pipeline::run(definition, input)
            .with_context(|| format!("Filter {} failed", definition.name))?;
        Ok(output)
    }

    /// The first argument is treated as the subcommand; the rest are the
    /// flags matched against exclude/require constraints.
    fn select(&self, command: &str, args: &[String]) -> Option<&FilterDefinition> {
        let (subcommand, flag_args) = match args.split_first() {
            Some((first, rest)) => (Some(first.as_str()), rest),
            None => (None, args),
        };
        self.registry.find(command, subcommand, flag_args)
    }

    fn record(&self, record: SavingsRecord) {
        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.record(&record) {
                warn!(error = %e, "Failed to record savings");
            }
        }
    }
}

/// Run the pipeline, degrading per `on_error` when a step fails.
fn filter_output(definition: &FilterDefinition, raw: &str) -> String {
    match pipeline::run(definition, raw) {
        Ok(filtered) => filtered,
        Err(e) => {
            warn!(
                filter = %definition.name,
                error = %e,
                on_error = ?definition.on_error,
                "Filter failed"
            );
            match definition.on_error {
                OnError::Passthrough | OnError::Template => raw.to_string(),
                OnError::Empty => String::new(),
            }
        }
    }
}
