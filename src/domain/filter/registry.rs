//! Definition index used to select a filter for an invocation.

use std::collections::HashMap;

use super::definition::FilterDefinition;

/// Immutable index of filter definitions.
///
/// Candidates under one key keep load order, so a flag-gated definition
/// listed first is tried before a general fallback.
#[derive(Debug, Default)]
pub struct Registry {
    definitions: Vec<FilterDefinition>,
    by_key: HashMap<String, Vec<usize>>,
}

impl Registry {
    /// Build the index from the merged, ordered definition list.
    pub fn new(definitions: Vec<FilterDefinition>) -> Self {
        let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, def) in definitions.iter().enumerate() {
            by_key.entry(def.key()).or_default().push(i);
        }
        Self {
            definitions,
            by_key,
        }
    }

    /// Find the first definition for `command` whose flag constraints accept
    /// `args`, trying `command:subcommand` before `command` alone.
    ///
    /// `None` means the command should run unfiltered.
    pub fn find(
        &self,
        command: &str,
        subcommand: Option<&str>,
        args: &[String],
    ) -> Option<&FilterDefinition> {
        subcommand
            .filter(|s| !s.is_empty())
            .and_then(|sub| self.first_accepting(&format!("{command}:{sub}"), args))
            .or_else(|| self.first_accepting(command, args))
    }

    fn first_accepting(&self, key: &str, args: &[String]) -> Option<&FilterDefinition> {
        self.by_key
            .get(key)?
            .iter()
            .map(|&i| &self.definitions[i])
            .find(|def| def.match_spec.accepts(args))
    }

    /// Look up a definition by name.
    pub fn get(&self, name: &str) -> Option<&FilterDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }
}
