//! Error types for snip.

use std::path::PathBuf;

use thiserror::Error;

/// Load-time rejection of a filter definition.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// Document is not valid TOML or has the wrong shape
    #[error("parse filter: {0}")]
    Parse(#[from] toml::de::Error),

    /// File content is not UTF-8
    #[error("decode filter: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// `name` is missing or empty
    #[error("validate filter: missing 'name'")]
    MissingName,

    /// `match.command` is missing or empty
    #[error("validate filter {name:?}: missing 'match.command'")]
    MissingCommand { name: String },

    /// A pipeline entry has no `action` key
    #[error("validate filter {name:?}: pipeline[{index}] missing 'action'")]
    MissingAction { name: String, index: usize },

    /// A pipeline entry names an action outside the library
    #[error("validate filter {name:?}: pipeline[{index}] unknown action {action:?}")]
    UnknownAction {
        name: String,
        index: usize,
        action: String,
    },
}

/// Failure inside a single pipeline step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// Required parameter is absent
    #[error("missing {0:?} param")]
    MissingParam(&'static str),

    /// Parameter present but of the wrong shape
    #[error("invalid {param:?} param: {reason}")]
    InvalidParam { param: &'static str, reason: String },

    /// Regex parameter does not compile
    #[error("compile {pattern:?}: {reason}")]
    Regex { pattern: String, reason: String },

    /// Template parameter does not parse
    #[error("{param:?} template: {source}")]
    Template {
        param: &'static str,
        source: TemplateError,
    },

    /// The buffer cannot be interpreted by the action
    #[error("malformed input: {0}")]
    Input(String),
}

impl ActionError {
    pub(crate) fn invalid(param: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            param,
            reason: reason.into(),
        }
    }
}

/// Pipeline aborted at a step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("pipeline[{step}] {action}: {source}")]
pub struct PipelineError {
    /// Zero-based step index
    pub step: usize,
    /// Action name of the failing step
    pub action: &'static str,
    #[source]
    pub source: ActionError,
}

/// Template syntax error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unclosed placeholder at byte {0}")]
    Unclosed(usize),

    #[error("empty placeholder at byte {0}")]
    Empty(usize),

    #[error("unsupported expression {0:?}")]
    Unsupported(String),
}

/// Failure while assembling the definition set.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Filter directory or file could not be read
    #[error("read filter {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A definition shipped with the binary is invalid
    #[error("bundled filter {file}: {source}")]
    Bundled {
        file: &'static str,
        #[source]
        source: DefinitionError,
    },
}
