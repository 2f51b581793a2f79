//! Filter definitions and load-time validation.

use std::collections::BTreeMap;

use serde::Deserialize;
use toml::Table;

use super::action::{Action, ActionKind};
use super::pipeline::{Pipeline, Step};
use crate::domain::error::DefinitionError;

/// One declarative filter: which command it applies to, how to rewrite its
/// arguments, and how to transform its output.
#[derive(Debug, Clone)]
pub struct FilterDefinition {
    pub name: String,
    pub version: i64,
    pub description: Option<String>,
    pub match_spec: MatchSpec,
    pub inject: Option<InjectSpec>,
    pub pipeline: Pipeline,
    pub on_error: OnError,
}

/// Command selector with flag-prefix constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MatchSpec {
    pub command: String,
    pub subcommand: Option<String>,
    pub exclude_flags: Vec<String>,
    pub require_flags: Vec<String>,
}

impl MatchSpec {
    /// Registry key: `command` or `command:subcommand`.
    pub fn key(&self) -> String {
        match self.subcommand.as_deref().filter(|s| !s.is_empty()) {
            Some(sub) => format!("{}:{}", self.command, sub),
            None => self.command.clone(),
        }
    }

    /// Check exclude/require flag prefixes against the supplied args.
    pub fn accepts(&self, args: &[String]) -> bool {
        let has_prefix = |prefix: &String| args.iter().any(|a| a.starts_with(prefix.as_str()));

        !self.exclude_flags.iter().any(has_prefix) && self.require_flags.iter().all(has_prefix)
    }
}

/// Arguments to add before execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InjectSpec {
    pub args: Vec<String>,
    /// Flag prefix to value, applied in sorted flag order
    pub defaults: BTreeMap<String, String>,
    pub skip_if_present: Vec<String>,
}

/// How the caller should degrade when the pipeline fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Print the raw output (default)
    #[default]
    Passthrough,
    /// Print nothing
    Empty,
    /// Reserved for a rendered fallback; degrades like passthrough
    Template,
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: i64,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "match")]
    match_spec: MatchSpec,
    #[serde(default)]
    inject: Option<InjectSpec>,
    #[serde(default)]
    pipeline: Vec<StepDocument>,
    #[serde(default)]
    on_error: OnError,
}

#[derive(Deserialize)]
struct StepDocument {
    #[serde(default)]
    action: String,
    #[serde(flatten)]
    params: Table,
}

impl FilterDefinition {
    /// Parse and validate a TOML definition document.
    ///
    /// # Errors
    ///
    /// Returns error if the document is malformed, `name` or `match.command`
    /// is empty, or a pipeline step names no action or an unknown one.
    /// Invalid step parameters do not reject the definition; they surface
    /// when the step runs.
    pub fn parse(source: &str) -> Result<Self, DefinitionError> {
        let doc: Document = toml::from_str(source)?;

        if doc.name.is_empty() {
            return Err(DefinitionError::MissingName);
        }
        if doc.match_spec.command.is_empty() {
            return Err(DefinitionError::MissingCommand { name: doc.name });
        }

        let mut steps = Vec::with_capacity(doc.pipeline.len());
        for (index, step) in doc.pipeline.into_iter().enumerate() {
            if step.action.is_empty() {
                return Err(DefinitionError::MissingAction {
                    name: doc.name,
                    index,
                });
            }
            let Ok(kind) = step.action.parse::<ActionKind>() else {
                return Err(DefinitionError::UnknownAction {
                    name: doc.name,
                    index,
                    action: step.action,
                });
            };
            steps.push(Step::new(kind, Action::compile(kind, &step.params)));
        }

        Ok(Self {
            name: doc.name,
            version: doc.version,
            description: doc.description,
            match_spec: doc.match_spec,
            inject: doc.inject,
            pipeline: Pipeline::new(steps),
            on_error: doc.on_error,
        })
    }

    pub fn key(&self) -> String {
        self.match_spec.key()
    }
}
