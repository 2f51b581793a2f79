//! Token savings reporting.

use anyhow::Result;
use tracing::info;

/// One filtered run, as seen by a savings recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavingsRecord {
    /// Command line as typed
    pub original: String,
    /// Command line after injection
    pub rewritten: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl SavingsRecord {
    /// Percentage of input tokens removed.
    pub fn saved_percent(&self) -> f64 {
        if self.input_tokens == 0 {
            return 0.0;
        }
        let saved = self.input_tokens.saturating_sub(self.output_tokens);
        saved as f64 * 100.0 / self.input_tokens as f64
    }
}

/// Sink for savings records. Write-only; the engine never reads it back.
pub trait SavingsRecorder: Send + Sync {
    fn record(&self, record: &SavingsRecord) -> Result<()>;
}

/// Recorder that emits each record as a log event.
pub struct LogRecorder;

impl SavingsRecorder for LogRecorder {
    fn record(&self, record: &SavingsRecord) -> Result<()> {
        info!(
            original = %record.original,
            rewritten = %record.rewritten,
            input_tokens = record.input_tokens,
            output_tokens = record.output_tokens,
            saved_percent = format_args!("{:.1}", record.saved_percent()),
            "Filtered output"
        );
        Ok(())
    }
}

/// Rough token count: one token per four bytes, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Join a command and its arguments for display.
pub fn command_line(command: &str, args: &[String]) -> String {
    if args.is_empty() {
        return command.to_string();
    }
    format!("{} {}", command, args.join(" "))
}
