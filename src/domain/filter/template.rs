//! Minimal substitution templates.
//!
//! A template is literal text with `{{ path }}` placeholders. A path is an
//! optional leading `.` followed by `.`-separated segments, so `{{Key}}`,
//! `{{ .Key }}` and `{{.stats.errors}}` are all accepted. `{{.}}` renders the
//! whole data value.

use serde_json::Value;

use crate::domain::error::TemplateError;

/// A parsed template, ready to render against JSON data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(Vec<String>),
}

impl Template {
    /// Parse template source.
    ///
    /// # Errors
    ///
    /// Returns error on an unclosed `{{`, an empty placeholder, or a
    /// placeholder that is not a field path.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }
            let after = &rest[open + 2..];
            let close = after
                .find("}}")
                .ok_or(TemplateError::Unclosed(offset + open))?;
            let expr = after[..close].trim();
            if expr.is_empty() {
                return Err(TemplateError::Empty(offset + open));
            }
            segments.push(Segment::Field(parse_path(expr)?));

            let consumed = open + 2 + close + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Render against `data`. Missing fields render as the empty string.
    pub fn render(&self, data: &Value) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field(path) => {
                    if let Some(value) = lookup(data, path) {
                        out.push_str(&display_value(value));
                    }
                }
            }
        }
        out
    }
}

fn parse_path(expr: &str) -> Result<Vec<String>, TemplateError> {
    if expr == "." {
        return Ok(Vec::new());
    }
    let body = expr.strip_prefix('.').unwrap_or(expr);
    let parts: Vec<&str> = body.split('.').collect();
    let valid = parts.iter().all(|p| {
        !p.is_empty()
            && p
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    });
    if !valid {
        return Err(TemplateError::Unsupported(expr.to_string()));
    }
    Ok(parts.into_iter().map(str::to_string).collect())
}

fn lookup<'a>(data: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(data, |current, key| match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Textual form of a JSON value used in rendered output.
///
/// Strings are verbatim, null is empty, composites are compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
