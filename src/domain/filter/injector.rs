//! Argument rewriting before execution.

use super::definition::{FilterDefinition, InjectSpec};

/// Compute the arguments to execute for a matched definition.
///
/// Returns the final arguments and whether anything was injected.
pub fn final_args(definition: &FilterDefinition, args: &[String]) -> (Vec<String>, bool) {
    match definition.inject.as_ref().and_then(|spec| spec.apply(args)) {
        Some(injected) => (injected, true),
        None => (args.to_vec(), false),
    }
}

impl InjectSpec {
    /// Rewrite `args`, or `None` when a `skip_if_present` prefix is found.
    ///
    /// Injected args go before the first `--` separator, or at the end.
    /// Defaults are appended in sorted flag order when their flag prefix is
    /// not already present.
    pub fn apply(&self, args: &[String]) -> Option<Vec<String>> {
        let skip = self
            .skip_if_present
            .iter()
            .any(|prefix| args.iter().any(|a| a.starts_with(prefix.as_str())));
        if skip {
            return None;
        }

        let split = args.iter().position(|a| a == "--").unwrap_or(args.len());
        let mut result = Vec::with_capacity(args.len() + self.args.len() + 2 * self.defaults.len());
        result.extend_from_slice(&args[..split]);
        result.extend(self.args.iter().cloned());
        result.extend_from_slice(&args[split..]);

        for (flag, value) in &self.defaults {
            if !result.iter().any(|a| a.starts_with(flag.as_str())) {
                result.push(flag.clone());
                result.push(value.clone());
            }
        }

        Some(result)
    }
}
