//! Typed access to a pipeline step's inline parameters.

use regex::Regex;
use toml::{Table, Value};

use super::template::Template;
use crate::domain::error::ActionError;

/// Borrowed view of one step's parameter table.
pub struct Params<'a> {
    table: &'a Table,
}

impl<'a> Params<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self { table }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.table.get(key)
    }

    /// Optional string. An empty string counts as absent.
    pub fn opt_str(&self, key: &'static str) -> Result<Option<&'a str>, ActionError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(ActionError::invalid(
                key,
                format!("expected string, got {}", other.type_str()),
            )),
        }
    }

    pub fn str(&self, key: &'static str) -> Result<&'a str, ActionError> {
        self.opt_str(key)?.ok_or(ActionError::MissingParam(key))
    }

    /// Non-negative integer with a default. Floats are truncated.
    pub fn usize_or(&self, key: &'static str, default: usize) -> Result<usize, ActionError> {
        let n = match self.get(key) {
            None => return Ok(default),
            Some(Value::Integer(n)) => *n,
            Some(Value::Float(f)) => *f as i64,
            Some(other) => {
                return Err(ActionError::invalid(
                    key,
                    format!("expected integer, got {}", other.type_str()),
                ))
            }
        };
        usize::try_from(n).map_err(|_| ActionError::invalid(key, format!("negative value {n}")))
    }

    /// Optional cap where 0 means "no cap".
    pub fn top(&self) -> Result<Option<usize>, ActionError> {
        Ok(Some(self.usize_or("top", 0)?).filter(|n| *n > 0))
    }

    pub fn opt_str_list(&self, key: &'static str) -> Result<Option<Vec<String>>, ActionError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let Value::Array(items) = value else {
            return Err(ActionError::invalid(key, "must be a list of strings"));
        };
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(ActionError::invalid(key, "must be a list of strings")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    pub fn opt_table(&self, key: &'static str) -> Result<Option<&'a Table>, ActionError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Table(t)) => Ok(Some(t)),
            Some(_) => Err(ActionError::invalid(key, "must be a map")),
        }
    }

    pub fn table(&self, key: &'static str) -> Result<&'a Table, ActionError> {
        self.opt_table(key)?.ok_or(ActionError::MissingParam(key))
    }

    pub fn regex(&self, key: &'static str) -> Result<Regex, ActionError> {
        compile(self.str(key)?)
    }

    pub fn opt_template(&self, key: &'static str) -> Result<Option<Template>, ActionError> {
        self.opt_str(key)?
            .map(|source| {
                Template::parse(source).map_err(|source| ActionError::Template { param: key, source })
            })
            .transpose()
    }
}

pub fn compile(pattern: &str) -> Result<Regex, ActionError> {
    Regex::new(pattern).map_err(|e| ActionError::Regex {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}
