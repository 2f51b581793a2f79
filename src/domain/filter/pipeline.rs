//! Sequential execution of a definition's steps over captured text.

use tracing::debug;

use super::action::{Action, ActionKind, ActionResult};
use super::definition::FilterDefinition;
use crate::domain::error::{ActionError, PipelineError};

/// One pipeline entry with its parameters compiled at load time.
///
/// A step whose parameters failed to compile keeps the error and reports
/// it when the pipeline reaches it.
#[derive(Debug, Clone)]
pub struct Step {
    kind: ActionKind,
    action: Result<Action, ActionError>,
}

impl Step {
    pub fn new(kind: ActionKind, action: Result<Action, ActionError>) -> Self {
        Self { kind, action }
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Parameter error recorded at load time, if any.
    pub fn error(&self) -> Option<&ActionError> {
        self.action.as_ref().err()
    }

    fn apply(&self, input: ActionResult) -> Result<ActionResult, ActionError> {
        match &self.action {
            Ok(action) => action.apply(input),
            Err(e) => Err(e.clone()),
        }
    }
}

/// Ordered steps of a filter.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Transform `raw` through every step.
    ///
    /// Zero-line input yields an empty string without running any step.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's index, action name, and cause. No
    /// partial output is produced.
    pub fn run(&self, raw: &str) -> Result<String, PipelineError> {
        let lines = split_lines(raw);
        if lines.is_empty() {
            return Ok(String::new());
        }

        let mut result = ActionResult::new(lines);
        for (index, step) in self.steps.iter().enumerate() {
            result = step.apply(result).map_err(|source| PipelineError {
                step: index,
                action: step.kind.name(),
                source,
            })?;
            debug!(step = index, action = %step.kind, lines = result.lines.len(), "Applied step");
        }

        Ok(join_lines(&result.lines))
    }
}

/// Run a definition's pipeline over captured text.
pub fn run(definition: &FilterDefinition, raw: &str) -> Result<String, PipelineError> {
    definition.pipeline.run(raw)
}

/// Split on `\n`, dropping exactly one trailing empty element.
fn split_lines(raw: &str) -> Vec<String> {
    let mut lines: Vec<String> = raw.split('\n').map(str::to_string).collect();
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

fn join_lines(lines: &[String]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn definition(pipeline: &str) -> FilterDefinition {
        let doc = format!("name = \"t\"\n[match]\ncommand = \"t\"\n{pipeline}");
        FilterDefinition::parse(&doc).unwrap()
    }

    #[test]
    fn test_split_drops_one_trailing_empty() {
        assert_eq!(split_lines("a\nb\n"), vec!["a", "b"]);
        assert_eq!(split_lines("a\n\n"), vec!["a", ""]);
        assert_eq!(split_lines("a"), vec!["a"]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn test_run_chains_steps() {
        let def = definition(
            r#"
[[pipeline]]
action = "remove_lines"
pattern = '^\s*$'

[[pipeline]]
action = "head"
n = 2
"#,
        );
        let out = run(&def, "one\n\ntwo\nthree\nfour\n").unwrap();
        assert_eq!(out, "one\ntwo\n+2 more lines\n");
    }

    #[test]
    fn test_empty_pipeline_normalizes_trailing_newline() {
        let def = definition("");
        assert_eq!(run(&def, "a\nb").unwrap(), "a\nb\n");
        assert_eq!(run(&def, "a\nb\n").unwrap(), "a\nb\n");
    }

    #[test]
    fn test_all_lines_removed_yields_empty_string() {
        let def = definition("[[pipeline]]\naction = \"keep_lines\"\npattern = 'nomatch'");
        assert_eq!(run(&def, "a\nb\n").unwrap(), "");
    }

    #[test]
    fn test_zero_line_input_is_empty_regardless_of_steps() {
        let def = definition(
            r#"
[[pipeline]]
action = "format_template"
template = "total: {{count}}"

[[pipeline]]
action = "json_extract"
fields = ["a"]
"#,
        );
        assert_eq!(run(&def, "").unwrap(), "");
    }

    #[test]
    fn test_failure_reports_step_and_action() {
        let def = definition(
            r#"
[[pipeline]]
action = "strip_ansi"

[[pipeline]]
action = "keep_lines"
pattern = "("
"#,
        );
        assert!(def.pipeline.steps()[1].error().is_some());
        let err = run(&def, "a\n").unwrap_err();
        assert_eq!(err.step, 1);
        assert_eq!(err.action, "keep_lines");
        assert!(matches!(err.source, ActionError::Regex { .. }));
        assert!(err.to_string().starts_with("pipeline[1] keep_lines: "));
    }

    #[test]
    fn test_runtime_input_error() {
        let def = definition("[[pipeline]]\naction = \"json_schema\"");
        let err = run(&def, "not json\n").unwrap_err();
        assert_eq!(err.step, 0);
        assert!(matches!(err.source, ActionError::Input(_)));
    }
}
