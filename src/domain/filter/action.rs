//! The closed library of pipeline actions.
//!
//! Each action is compiled once from its step parameters into an [`Action`]
//! and then applied as a pure transformation of an [`ActionResult`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde_json::{json, Map, Value};
use toml::Table;

use super::params::{compile, Params};
use super::template::{display_value, Template};
use crate::domain::error::ActionError;

/// ANSI CSI escape sequences.
const ANSI_PATTERN: &str = r"\x1b\[[0-9;]*[a-zA-Z]";

/// Leading directories removed by `compact_path`, first match wins.
const PATH_PREFIXES: &[&str] = &["src/", "lib/", "internal/", "pkg/", "vendor/"];

const DEFAULT_GROUP_FORMAT: &str = "{{Key}}: {{Count}}";

/// Lines plus side-channel data threaded through a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionResult {
    pub lines: Vec<String>,
    pub metadata: Metadata,
}

impl ActionResult {
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines,
            metadata: Metadata::default(),
        }
    }

    fn with_lines(self, lines: Vec<String>) -> Self {
        Self {
            lines,
            metadata: self.metadata,
        }
    }
}

/// Aggregates published by earlier actions for later formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Full `group_by` counts, in output order
    pub groups: Option<Vec<(String, usize)>>,
    /// `aggregate` counts by pattern name
    pub stats: Option<BTreeMap<String, usize>>,
}

/// Names of every action in the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    KeepLines,
    RemoveLines,
    TruncateLines,
    StripAnsi,
    Head,
    Tail,
    GroupBy,
    Dedup,
    JsonExtract,
    JsonSchema,
    NdjsonStream,
    RegexExtract,
    StateMachine,
    Aggregate,
    FormatTemplate,
    CompactPath,
}

impl ActionKind {
    pub const ALL: [ActionKind; 16] = [
        ActionKind::KeepLines,
        ActionKind::RemoveLines,
        ActionKind::TruncateLines,
        ActionKind::StripAnsi,
        ActionKind::Head,
        ActionKind::Tail,
        ActionKind::GroupBy,
        ActionKind::Dedup,
        ActionKind::JsonExtract,
        ActionKind::JsonSchema,
        ActionKind::NdjsonStream,
        ActionKind::RegexExtract,
        ActionKind::StateMachine,
        ActionKind::Aggregate,
        ActionKind::FormatTemplate,
        ActionKind::CompactPath,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::KeepLines => "keep_lines",
            ActionKind::RemoveLines => "remove_lines",
            ActionKind::TruncateLines => "truncate_lines",
            ActionKind::StripAnsi => "strip_ansi",
            ActionKind::Head => "head",
            ActionKind::Tail => "tail",
            ActionKind::GroupBy => "group_by",
            ActionKind::Dedup => "dedup",
            ActionKind::JsonExtract => "json_extract",
            ActionKind::JsonSchema => "json_schema",
            ActionKind::NdjsonStream => "ndjson_stream",
            ActionKind::RegexExtract => "regex_extract",
            ActionKind::StateMachine => "state_machine",
            ActionKind::Aggregate => "aggregate",
            ActionKind::FormatTemplate => "format_template",
            ActionKind::CompactPath => "compact_path",
        }
    }
}

impl FromStr for ActionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|k| k.name() == s).ok_or(())
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An action with its parameters compiled.
#[derive(Debug, Clone)]
pub enum Action {
    KeepLines {
        pattern: Regex,
    },
    RemoveLines {
        pattern: Regex,
    },
    TruncateLines {
        max: usize,
        ellipsis: String,
    },
    StripAnsi {
        pattern: Regex,
    },
    Head {
        n: usize,
        overflow_msg: Option<String>,
    },
    Tail {
        n: usize,
    },
    GroupBy {
        pattern: Regex,
        top: Option<usize>,
        format: Template,
    },
    Dedup {
        normalize: Vec<Regex>,
        top: Option<usize>,
    },
    JsonExtract {
        fields: Vec<String>,
        format: Option<Template>,
    },
    JsonSchema {
        max_depth: usize,
    },
    NdjsonStream {
        group_by: Option<String>,
        format: Option<Template>,
    },
    RegexExtract {
        pattern: Regex,
        format: Option<String>,
    },
    StateMachine(StateMachine),
    Aggregate {
        patterns: Vec<(String, Regex)>,
        format: Option<Template>,
    },
    FormatTemplate {
        template: Template,
    },
    CompactPath,
}

impl Action {
    /// Compile the parameters of a step into an action.
    ///
    /// # Errors
    ///
    /// Returns error if a required parameter is missing or any parameter has
    /// the wrong shape, fails to compile as a regex, or fails to parse as a
    /// template.
    pub fn compile(kind: ActionKind, table: &Table) -> Result<Self, ActionError> {
        let p = Params::new(table);
        let action = match kind {
            ActionKind::KeepLines => Action::KeepLines {
                pattern: p.regex("pattern")?,
            },
            ActionKind::RemoveLines => Action::RemoveLines {
                pattern: p.regex("pattern")?,
            },
            ActionKind::TruncateLines => {
                let ellipsis = p.opt_str("ellipsis")?.unwrap_or("...").to_string();
                let ellipsis_len = ellipsis.chars().count();
                let max = p.usize_or("max", 80)?.max(ellipsis_len + 1);
                Action::TruncateLines { max, ellipsis }
            }
            ActionKind::StripAnsi => Action::StripAnsi {
                pattern: compile(ANSI_PATTERN)?,
            },
            ActionKind::Head => Action::Head {
                n: p.usize_or("n", 10)?,
                overflow_msg: p.opt_str("overflow_msg")?.map(str::to_string),
            },
            ActionKind::Tail => Action::Tail {
                n: p.usize_or("n", 10)?,
            },
            ActionKind::GroupBy => {
                let pattern = p.regex("pattern")?;
                if pattern.captures_len() < 2 {
                    return Err(ActionError::invalid(
                        "pattern",
                        "must contain a capture group",
                    ));
                }
                let format = match p.opt_template("format")? {
                    Some(t) => t,
                    None => Template::parse(DEFAULT_GROUP_FORMAT).map_err(|source| {
                        ActionError::Template {
                            param: "format",
                            source,
                        }
                    })?,
                };
                Action::GroupBy {
                    pattern,
                    top: p.top()?,
                    format,
                }
            }
            ActionKind::Dedup => {
                let normalize = p
                    .opt_str_list("normalize")?
                    .unwrap_or_default()
                    .iter()
                    .map(|s| compile(s))
                    .collect::<Result<Vec<_>, _>>()?;
                Action::Dedup {
                    normalize,
                    top: p.top()?,
                }
            }
            ActionKind::JsonExtract => Action::JsonExtract {
                fields: p
                    .opt_str_list("fields")?
                    .ok_or(ActionError::MissingParam("fields"))?,
                format: p.opt_template("format")?,
            },
            ActionKind::JsonSchema => Action::JsonSchema {
                max_depth: p.usize_or("max_depth", 3)?,
            },
            ActionKind::NdjsonStream => Action::NdjsonStream {
                group_by: p.opt_str("group_by")?.map(str::to_string),
                format: p.opt_template("format")?,
            },
            ActionKind::RegexExtract => Action::RegexExtract {
                pattern: p.regex("pattern")?,
                format: p.opt_str("format")?.map(str::to_string),
            },
            ActionKind::StateMachine => Action::StateMachine(StateMachine::compile(p.table("states")?)?),
            ActionKind::Aggregate => {
                let patterns = p
                    .table("patterns")?
                    .iter()
                    .map(|(name, value)| -> Result<(String, Regex), ActionError> {
                        let source = value.as_str().ok_or_else(|| {
                            ActionError::invalid("patterns", format!("{name:?} must be a string"))
                        })?;
                        Ok((name.clone(), compile(source)?))
                    })
                    .collect::<Result<BTreeMap<_, _>, _>>()?
                    .into_iter()
                    .collect();
                Action::Aggregate {
                    patterns,
                    format: p.opt_template("format")?,
                }
            }
            ActionKind::FormatTemplate => Action::FormatTemplate {
                template: p
                    .opt_template("template")?
                    .ok_or(ActionError::MissingParam("template"))?,
            },
            ActionKind::CompactPath => Action::CompactPath,
        };
        Ok(action)
    }

    /// Apply the action to `input`.
    pub fn apply(&self, input: ActionResult) -> Result<ActionResult, ActionError> {
        match self {
            Action::KeepLines { pattern } => Ok(retain(input, |l| pattern.is_match(l))),
            Action::RemoveLines { pattern } => Ok(retain(input, |l| !pattern.is_match(l))),
            Action::TruncateLines { max, ellipsis } => Ok(map_lines(input, |line| {
                truncate(line, *max, ellipsis)
            })),
            Action::StripAnsi { pattern } => Ok(map_lines(input, |line| {
                pattern.replace_all(&line, "").into_owned()
            })),
            Action::Head { n, overflow_msg } => Ok(head(input, *n, overflow_msg.as_deref())),
            Action::Tail { n } => {
                let skip = input.lines.len().saturating_sub(*n);
                let lines = input.lines[skip..].to_vec();
                Ok(input.with_lines(lines))
            }
            Action::GroupBy {
                pattern,
                top,
                format,
            } => Ok(group_by(input, pattern, *top, format)),
            Action::Dedup { normalize, top } => Ok(dedup(input, normalize, *top)),
            Action::JsonExtract { fields, format } => json_extract(input, fields, format.as_ref()),
            Action::JsonSchema { max_depth } => json_schema(input, *max_depth),
            Action::NdjsonStream { group_by, format } => {
                Ok(ndjson_stream(input, group_by.as_deref(), format.as_ref()))
            }
            Action::RegexExtract { pattern, format } => {
                Ok(regex_extract(input, pattern, format.as_deref()))
            }
            Action::StateMachine(machine) => {
                let lines = machine.run(&input.lines);
                Ok(input.with_lines(lines))
            }
            Action::Aggregate { patterns, format } => Ok(aggregate(input, patterns, format.as_ref())),
            Action::FormatTemplate { template } => Ok(format_template(input, template)),
            Action::CompactPath => Ok(map_lines(input, |line| compact_path(&line).to_string())),
        }
    }
}

fn retain(input: ActionResult, keep: impl Fn(&str) -> bool) -> ActionResult {
    let lines = input.lines.iter().filter(|l| keep(l)).cloned().collect();
    input.with_lines(lines)
}

fn map_lines(mut input: ActionResult, f: impl Fn(String) -> String) -> ActionResult {
    input.lines = std::mem::take(&mut input.lines).into_iter().map(f).collect();
    input
}

fn truncate(line: String, max: usize, ellipsis: &str) -> String {
    if line.chars().count() <= max {
        return line;
    }
    let keep = max - ellipsis.chars().count();
    let mut out: String = line.chars().take(keep).collect();
    out.push_str(ellipsis);
    out
}

fn head(mut input: ActionResult, n: usize, overflow_msg: Option<&str>) -> ActionResult {
    let total = input.lines.len();
    if total <= n {
        return input;
    }
    input.lines.truncate(n);
    let msg = match overflow_msg {
        Some(m) => m.to_string(),
        None => format!("+{} more lines", total - n),
    };
    input.lines.push(msg);
    input
}

/// Count occurrences keeping first-seen order, then sort by count descending.
///
/// The sort is stable, so equal counts keep first-seen order.
fn ranked(keys: impl Iterator<Item = String>) -> Vec<(String, usize)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for key in keys {
        match index.get(&key) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

fn group_by(
    input: ActionResult,
    pattern: &Regex,
    top: Option<usize>,
    format: &Template,
) -> ActionResult {
    let groups = ranked(input.lines.iter().filter_map(|line| {
        pattern
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }));

    let shown = top.unwrap_or(groups.len()).min(groups.len());
    let lines = groups[..shown]
        .iter()
        .map(|(key, count)| format.render(&json!({"Key": key, "Count": count})))
        .collect();

    let mut out = input.with_lines(lines);
    out.metadata.groups = Some(groups);
    out
}

fn dedup(input: ActionResult, normalize: &[Regex], top: Option<usize>) -> ActionResult {
    let normalized = input.lines.iter().map(|line| {
        let mut value = line.clone();
        for re in normalize {
            value = re.replace_all(&value, "").into_owned();
        }
        value.trim().to_string()
    });
    let mut counts = ranked(normalized);
    if let Some(top) = top {
        counts.truncate(top);
    }

    let lines = counts
        .into_iter()
        .map(|(value, count)| {
            if count > 1 {
                format!("{value} (x{count})")
            } else {
                value
            }
        })
        .collect();
    input.with_lines(lines)
}

fn parse_buffer(lines: &[String]) -> Result<Value, ActionError> {
    serde_json::from_str(&lines.join("\n")).map_err(|e| ActionError::Input(format!("parse: {e}")))
}

fn split_rendered(rendered: &str) -> Vec<String> {
    rendered.split('\n').map(str::to_string).collect()
}

fn json_extract(
    input: ActionResult,
    fields: &[String],
    format: Option<&Template>,
) -> Result<ActionResult, ActionError> {
    let Value::Object(data) = parse_buffer(&input.lines)? else {
        return Err(ActionError::Input("expected a JSON object".to_string()));
    };

    let lines = match format {
        Some(template) => {
            let extracted: Map<String, Value> = fields
                .iter()
                .map(|f| (f.clone(), data.get(f).cloned().unwrap_or(Value::Null)))
                .collect();
            split_rendered(&template.render(&Value::Object(extracted)))
        }
        None => fields
            .iter()
            .filter_map(|f| data.get(f).map(|v| format!("{f}: {}", display_value(v))))
            .collect(),
    };
    Ok(input.with_lines(lines))
}

fn json_schema(input: ActionResult, max_depth: usize) -> Result<ActionResult, ActionError> {
    let data = parse_buffer(&input.lines)?;
    let schema = describe(&data, 0, max_depth);
    Ok(input.with_lines(split_rendered(&schema)))
}

fn describe(value: &Value, depth: usize, max_depth: usize) -> String {
    if depth >= max_depth {
        return "...".to_string();
    }
    match value {
        Value::Object(map) if map.is_empty() => "{}".to_string(),
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let indent = "  ".repeat(depth + 1);
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{indent}{k}: {}", describe(&map[k], depth + 1, max_depth)))
                .collect();
            format!("{{\n{}\n{}}}", fields.join("\n"), "  ".repeat(depth))
        }
        Value::Array(items) => match items.first() {
            None => "[]".to_string(),
            Some(first) => format!("[{}]", describe(first, depth, max_depth)),
        },
        Value::String(_) => "string".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Null => "null".to_string(),
    }
}

fn ndjson_stream(
    input: ActionResult,
    group_field: Option<&str>,
    format: Option<&Template>,
) -> ActionResult {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<Value>)> = Vec::new();

    for line in &input.lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(Value::Object(event)) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let key = group_field
            .and_then(|field| event.get(field))
            .map(display_value)
            .unwrap_or_default();

        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(Value::Object(event));
    }

    let lines = groups
        .into_iter()
        .map(|(key, events)| match format {
            Some(template) => template.render(&json!({
                "Key": key,
                "Count": events.len(),
                "Events": events,
            })),
            None => format!("{key}: {} events", events.len()),
        })
        .collect();
    input.with_lines(lines)
}

fn regex_extract(input: ActionResult, pattern: &Regex, format: Option<&str>) -> ActionResult {
    let lines = input
        .lines
        .iter()
        .filter_map(|line| {
            let caps = pattern.captures(line)?;
            let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());
            let out = match format {
                // Highest index first so `$1` never eats the prefix of `$10`.
                Some(fmt) => (0..caps.len())
                    .rev()
                    .fold(fmt.to_string(), |acc, i| acc.replace(&format!("${i}"), group(i))),
                None if caps.len() > 1 => (1..caps.len()).map(group).collect::<Vec<_>>().join(" "),
                None => group(0).to_string(),
            };
            Some(out)
        })
        .collect();
    input.with_lines(lines)
}

fn aggregate(
    input: ActionResult,
    patterns: &[(String, Regex)],
    format: Option<&Template>,
) -> ActionResult {
    let stats: BTreeMap<String, usize> = patterns
        .iter()
        .map(|(name, re)| {
            let count = input.lines.iter().filter(|l| re.is_match(l)).count();
            (name.clone(), count)
        })
        .collect();

    let lines = match format {
        Some(template) => {
            let data: Map<String, Value> =
                stats.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
            split_rendered(&template.render(&Value::Object(data)))
        }
        None => stats.iter().map(|(k, v)| format!("{k}: {v}")).collect(),
    };

    let mut out = input.with_lines(lines);
    out.metadata.stats = Some(stats);
    out
}

fn format_template(input: ActionResult, template: &Template) -> ActionResult {
    let groups = input.metadata.groups.as_ref().map(|g| {
        Value::Object(g.iter().map(|(k, v)| (k.clone(), json!(v))).collect())
    });
    let stats = input.metadata.stats.as_ref().map(|s| json!(s));
    let data = json!({
        "lines": input.lines.join("\n"),
        "count": input.lines.len(),
        "groups": groups,
        "stats": stats,
    });

    let rendered = template.render(&data);
    let lines = split_rendered(rendered.trim_end_matches('\n'));
    input.with_lines(lines)
}

fn compact_path(line: &str) -> &str {
    PATH_PREFIXES
        .iter()
        .find_map(|prefix| line.strip_prefix(prefix))
        .unwrap_or(line)
}

/// Regex-driven line filter with named states.
#[derive(Debug, Clone)]
pub struct StateMachine {
    start: String,
    states: BTreeMap<String, State>,
}

#[derive(Debug, Clone, Default)]
struct State {
    until: Option<Regex>,
    keep: Option<Regex>,
    next: String,
}

impl StateMachine {
    fn compile(table: &Table) -> Result<Self, ActionError> {
        let mut states = BTreeMap::new();
        for (name, raw) in table {
            let rule = raw
                .as_table()
                .ok_or_else(|| ActionError::invalid("states", format!("{name:?} must be a map")))?;
            let p = Params::new(rule);
            let state = State {
                until: p.opt_str("until")?.map(compile).transpose()?,
                keep: p.opt_str("keep")?.map(compile).transpose()?,
                next: p.opt_str("next")?.unwrap_or_default().to_string(),
            };
            states.insert(name.clone(), state);
        }

        let start = if states.contains_key("start") {
            "start".to_string()
        } else {
            states
                .keys()
                .next()
                .cloned()
                .unwrap_or_else(|| "start".to_string())
        };
        Ok(Self { start, states })
    }

    fn run(&self, lines: &[String]) -> Vec<String> {
        let mut current = self.start.as_str();
        let mut out = Vec::new();
        for line in lines {
            // Undefined state absorbs the rest of the input.
            let Some(state) = self.states.get(current) else {
                break;
            };
            if state.until.as_ref().is_some_and(|re| re.is_match(line)) {
                if !state.next.is_empty() {
                    current = state.next.as_str();
                }
                continue;
            }
            if state.keep.as_ref().map_or(true, |re| re.is_match(line)) {
                out.push(line.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(items: &[&str]) -> ActionResult {
        ActionResult::new(items.iter().map(|s| s.to_string()).collect())
    }

    fn run(kind: ActionKind, params: &str, input: &[&str]) -> Result<Vec<String>, ActionError> {
        let table: Table = toml::from_str(params).unwrap();
        let action = Action::compile(kind, &table)?;
        action.apply(lines(input)).map(|r| r.lines)
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.name().parse::<ActionKind>(), Ok(kind));
        }
        assert!("explode".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_keep_lines_non_blank() {
        let out = run(ActionKind::KeepLines, r"pattern = '\S'", &["hello", "", "world", ""]).unwrap();
        assert_eq!(out, vec!["hello", "world"]);
    }

    #[test]
    fn test_keep_and_remove_partition_input() {
        let input = ["Compiling foo", "Running test", "Compiling bar", "test result: ok"];
        let kept = run(ActionKind::KeepLines, "pattern = '^Compiling'", &input).unwrap();
        let removed = run(ActionKind::RemoveLines, "pattern = '^Compiling'", &input).unwrap();
        assert_eq!(kept, vec!["Compiling foo", "Compiling bar"]);
        assert_eq!(removed, vec!["Running test", "test result: ok"]);
        let mut all: Vec<String> = kept.into_iter().chain(removed).collect();
        all.sort();
        let mut expected: Vec<String> = input.iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_missing_pattern_is_error() {
        let err = run(ActionKind::KeepLines, "", &["a"]).unwrap_err();
        assert_eq!(err, ActionError::MissingParam("pattern"));
        let err = run(ActionKind::RemoveLines, "pattern = '[a-'", &["a"]).unwrap_err();
        assert!(matches!(err, ActionError::Regex { .. }));
    }

    #[test]
    fn test_truncate_lines() {
        let long = "this is a very long line that should be truncated at some point";
        let out = run(ActionKind::TruncateLines, "max = 20", &["short", long]).unwrap();
        assert_eq!(out[0], "short");
        assert_eq!(out[1], "this is a very lo...");
        assert_eq!(out[1].chars().count(), 20);
    }

    #[test]
    fn test_truncate_counts_code_points() {
        let out = run(ActionKind::TruncateLines, "max = 8", &["héllo wörld"]).unwrap();
        assert_eq!(out, vec!["héllo..."]);
    }

    #[test]
    fn test_truncate_budget_smaller_than_ellipsis() {
        let out = run(
            ActionKind::TruncateLines,
            "max = 1\nellipsis = '..'",
            &["abcdef"],
        )
        .unwrap();
        assert_eq!(out, vec!["a.."]);
    }

    #[test]
    fn test_strip_ansi() {
        let out = run(
            ActionKind::StripAnsi,
            "",
            &["\x1b[31mred\x1b[0m", "normal \x1b[1;32mgreen\x1b[0m"],
        )
        .unwrap();
        assert_eq!(out, vec!["red", "normal green"]);
    }

    #[test]
    fn test_head_with_overflow() {
        let input: Vec<String> = (1..=11).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = input.iter().map(String::as_str).collect();
        let out = run(ActionKind::Head, "n = 5", &refs).unwrap();
        assert_eq!(out, vec!["1", "2", "3", "4", "5", "+6 more lines"]);
    }

    #[test]
    fn test_head_short_input_unchanged() {
        let out = run(ActionKind::Head, "n = 3", &["a", "b", "c"]).unwrap();
        assert_eq!(out, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_head_custom_overflow_message() {
        let out = run(
            ActionKind::Head,
            "n = 1\noverflow_msg = '(truncated)'",
            &["a", "b", "c"],
        )
        .unwrap();
        assert_eq!(out, vec!["a", "(truncated)"]);
    }

    #[test]
    fn test_head_rejects_negative() {
        let err = run(ActionKind::Head, "n = -2", &["a"]).unwrap_err();
        assert!(matches!(err, ActionError::InvalidParam { param: "n", .. }));
    }

    #[test]
    fn test_tail() {
        let out = run(ActionKind::Tail, "n = 2", &["a", "b", "c", "d"]).unwrap();
        assert_eq!(out, vec!["c", "d"]);
        let out = run(ActionKind::Tail, "", &["a", "b"]).unwrap();
        assert_eq!(out, vec!["a", "b"]);
    }

    #[test]
    fn test_group_by_default_format() {
        let input = ["ERR a", "WARN b", "ERR c", "ERR d", "WARN e"];
        let table: Table = toml::from_str(r"pattern = '^(\w+)'").unwrap();
        let action = Action::compile(ActionKind::GroupBy, &table).unwrap();
        let result = action.apply(lines(&input)).unwrap();
        assert_eq!(result.lines, vec!["ERR: 3", "WARN: 2"]);
        assert_eq!(
            result.metadata.groups,
            Some(vec![("ERR".to_string(), 3), ("WARN".to_string(), 2)])
        );
    }

    #[test]
    fn test_group_by_ties_keep_first_seen_order_and_top() {
        let input = ["b 1", "a 1", "c 1", "a 2", "b 2", "c 2"];
        let out = run(ActionKind::GroupBy, r"pattern = '^(\w) '", &input).unwrap();
        assert_eq!(out, vec!["b: 2", "a: 2", "c: 2"]);
        let out = run(
            ActionKind::GroupBy,
            "pattern = '^(\\w) '\ntop = 1\nformat = '{{.Count}}x {{.Key}}'",
            &input,
        )
        .unwrap();
        assert_eq!(out, vec!["2x b"]);
    }

    #[test]
    fn test_group_by_requires_capture_group() {
        let err = run(ActionKind::GroupBy, r"pattern = '^\w+'", &["a"]).unwrap_err();
        assert!(matches!(err, ActionError::InvalidParam { param: "pattern", .. }));
    }

    #[test]
    fn test_dedup_counts() {
        let input = [
            "error: foo",
            "error: foo",
            "error: foo",
            "warn: bar",
            "warn: bar",
        ];
        let out = run(ActionKind::Dedup, "", &input).unwrap();
        assert_eq!(out, vec!["error: foo (x3)", "warn: bar (x2)"]);
    }

    #[test]
    fn test_dedup_normalize_and_top() {
        let input = [
            "12:00:01 connection reset",
            "single",
            "12:00:02 connection reset",
            "  single  ",
            "other",
        ];
        let out = run(
            ActionKind::Dedup,
            r"normalize = ['^\d+:\d+:\d+']
top = 2",
            &input,
        )
        .unwrap();
        assert_eq!(out, vec!["connection reset (x2)", "single (x2)"]);
    }

    #[test]
    fn test_json_extract_plain() {
        let input = [r#"{"name": "snip", "version": 3,"#, r#""private": false, "x": 1}"#];
        let out = run(
            ActionKind::JsonExtract,
            "fields = ['name', 'version', 'missing', 'private']",
            &input,
        )
        .unwrap();
        assert_eq!(out, vec!["name: snip", "version: 3", "private: false"]);
    }

    #[test]
    fn test_json_extract_template() {
        let out = run(
            ActionKind::JsonExtract,
            "fields = ['name', 'version']\nformat = '{{.name}}@{{.version}}'",
            &[r#"{"name": "snip", "version": "1.2"}"#],
        )
        .unwrap();
        assert_eq!(out, vec!["snip@1.2"]);
    }

    #[test]
    fn test_json_extract_rejects_bad_input() {
        let err = run(ActionKind::JsonExtract, "fields = ['a']", &["not json"]).unwrap_err();
        assert!(matches!(err, ActionError::Input(_)));
        let err = run(ActionKind::JsonExtract, "fields = ['a']", &["[1, 2]"]).unwrap_err();
        assert!(matches!(err, ActionError::Input(_)));
        let err = run(ActionKind::JsonExtract, "", &["{}"]).unwrap_err();
        assert_eq!(err, ActionError::MissingParam("fields"));
    }

    #[test]
    fn test_json_schema() {
        let input = [r#"{"name": "x", "tags": ["a"], "meta": {"n": 1, "ok": true}, "none": null}"#];
        let out = run(ActionKind::JsonSchema, "", &input).unwrap();
        assert_eq!(
            out,
            vec![
                "{",
                "  meta: {",
                "    n: number",
                "    ok: bool",
                "  }",
                "  name: string",
                "  none: null",
                "  tags: [string]",
                "}",
            ]
        );
    }

    #[test]
    fn test_json_schema_depth_limit() {
        let out = run(
            ActionKind::JsonSchema,
            "max_depth = 1",
            &[r#"{"a": {"b": 1}, "c": []}"#],
        )
        .unwrap();
        assert_eq!(out, vec!["{", "  a: ...", "  c: ...", "}"]);
    }

    #[test]
    fn test_ndjson_stream_grouping() {
        let input = [
            r#"{"Action": "run", "Test": "A"}"#,
            "garbage",
            "",
            r#"{"Action": "pass", "Test": "A"}"#,
            r#"{"Action": "run", "Test": "B"}"#,
        ];
        let out = run(ActionKind::NdjsonStream, "group_by = 'Action'", &input).unwrap();
        assert_eq!(out, vec!["run: 2 events", "pass: 1 events"]);

        let out = run(
            ActionKind::NdjsonStream,
            "format = '{{.Count}} total, first {{.Events.0.Test}}'",
            &input,
        )
        .unwrap();
        assert_eq!(out, vec!["3 total, first A"]);
    }

    #[test]
    fn test_regex_extract() {
        let input = ["ok  pkg/a  0.1s", "FAIL pkg/b 0.3s", "noise"];
        let out = run(ActionKind::RegexExtract, r"pattern = '^(\w+)\s+(\S+)'", &input).unwrap();
        assert_eq!(out, vec!["ok pkg/a", "FAIL pkg/b"]);

        let out = run(
            ActionKind::RegexExtract,
            "pattern = '^(\\w+)\\s+(\\S+)\\s'\nformat = '$2=$1'",
            &input,
        )
        .unwrap();
        assert_eq!(out, vec!["pkg/a=ok", "pkg/b=FAIL"]);

        let out = run(ActionKind::RegexExtract, r"pattern = '\d+\.\d+s'", &input).unwrap();
        assert_eq!(out, vec!["0.1s", "0.3s"]);
    }

    #[test]
    fn test_state_machine_failures_section() {
        let params = r#"
[states.start]
keep = "^test"
until = "^--- failures"
next = "failures"

[states.failures]
keep = "."
until = "^--- end"
next = "done"
"#;
        let input = [
            "running tests...",
            "test foo: ok",
            "test bar: FAILED",
            "--- failures ---",
            "bar: assertion error",
            "--- end ---",
            "trailing",
        ];
        let out = run(ActionKind::StateMachine, params, &input).unwrap();
        assert_eq!(out, vec!["test foo: ok", "test bar: FAILED", "bar: assertion error"]);
    }

    #[test]
    fn test_state_machine_starts_at_smallest_name() {
        let params = r#"
[states.zeta]
keep = "z"

[states.alpha]
keep = "a"
until = "^switch"
next = "zeta"
"#;
        let out = run(
            ActionKind::StateMachine,
            params,
            &["a1", "z1", "switch", "a2", "z2"],
        )
        .unwrap();
        assert_eq!(out, vec!["a1", "z2"]);
    }

    #[test]
    fn test_state_machine_until_without_next_stays() {
        let params = "[states.start]\nuntil = '^#'";
        let out = run(ActionKind::StateMachine, params, &["a", "# c", "b"]).unwrap();
        assert_eq!(out, vec!["a", "b"]);
    }

    #[test]
    fn test_state_machine_requires_states() {
        let err = run(ActionKind::StateMachine, "", &["a"]).unwrap_err();
        assert_eq!(err, ActionError::MissingParam("states"));
    }

    #[test]
    fn test_aggregate() {
        let params = r#"
[patterns]
warnings = "^warning"
errors = "^error"
"#;
        let input = ["error: a", "warning: b", "error: c", "note"];
        let table: Table = toml::from_str(params).unwrap();
        let action = Action::compile(ActionKind::Aggregate, &table).unwrap();
        let result = action.apply(lines(&input)).unwrap();
        assert_eq!(result.lines, vec!["errors: 2", "warnings: 1"]);
        let stats = result.metadata.stats.unwrap();
        assert_eq!(stats["errors"], 2);
        assert_eq!(stats["warnings"], 1);
    }

    #[test]
    fn test_aggregate_with_format() {
        let params = r#"
format = "{{.errors}} errors, {{.warnings}} warnings"
[patterns]
warnings = "^warning"
errors = "^error"
"#;
        let out = run(ActionKind::Aggregate, params, &["error: a", "note"]).unwrap();
        assert_eq!(out, vec!["1 errors, 0 warnings"]);
    }

    #[test]
    fn test_format_template_reads_metadata() {
        let table: Table = toml::from_str(r"pattern = '^(\w+)'").unwrap();
        let grouped = Action::compile(ActionKind::GroupBy, &table)
            .unwrap()
            .apply(lines(&["ERR a", "ERR b", "WARN c"]))
            .unwrap();

        let table: Table =
            toml::from_str("template = \"{{count}} groups\\nERR={{.groups.ERR}}\\n\\n\"").unwrap();
        let out = Action::compile(ActionKind::FormatTemplate, &table)
            .unwrap()
            .apply(grouped)
            .unwrap();
        assert_eq!(out.lines, vec!["2 groups", "ERR=2"]);
    }

    #[test]
    fn test_format_template_lines_field() {
        let table: Table = toml::from_str("template = \"summary:\\n{{.lines}}\"").unwrap();
        let out = Action::compile(ActionKind::FormatTemplate, &table)
            .unwrap()
            .apply(lines(&["a", "b"]))
            .unwrap();
        assert_eq!(out.lines, vec!["summary:", "a", "b"]);
    }

    #[test]
    fn test_compact_path() {
        let out = run(
            ActionKind::CompactPath,
            "",
            &["src/main.rs", "internal/foo/bar.go", "main.go", "vendor/pkg/mod.go"],
        )
        .unwrap();
        assert_eq!(out, vec!["main.rs", "foo/bar.go", "main.go", "pkg/mod.go"]);
    }
}
