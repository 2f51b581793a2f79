//! Loading and merging of user and bundled filter definitions.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::definition::FilterDefinition;
use crate::domain::error::{DefinitionError, LoadError};

/// Definitions compiled into the binary.
const BUNDLED: &[(&str, &str)] = &[
    ("git-log.toml", include_str!("../../../filters/git-log.toml")),
    ("git-status.toml", include_str!("../../../filters/git-status.toml")),
    ("cargo-test.toml", include_str!("../../../filters/cargo-test.toml")),
    ("go-test.toml", include_str!("../../../filters/go-test.toml")),
    ("npm-install.toml", include_str!("../../../filters/npm-install.toml")),
];

const EXTENSION: &str = "toml";

/// Where a definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    User,
    Bundled,
}

/// User definitions that loaded, plus the files that were skipped.
#[derive(Debug, Default)]
pub struct UserFilters {
    pub definitions: Vec<FilterDefinition>,
    pub skipped: Vec<(PathBuf, DefinitionError)>,
}

/// Merged definitions in registry order, with their origin.
#[derive(Debug, Default)]
pub struct LoadedFilters {
    pub definitions: Vec<(FilterDefinition, Source)>,
    pub skipped: Vec<(PathBuf, DefinitionError)>,
}

impl LoadedFilters {
    pub fn into_definitions(self) -> Vec<FilterDefinition> {
        self.definitions.into_iter().map(|(d, _)| d).collect()
    }
}

/// Parse every bundled definition.
///
/// # Errors
///
/// Any invalid bundled definition is a packaging defect and fails the load.
pub fn load_bundled() -> Result<Vec<FilterDefinition>, LoadError> {
    BUNDLED
        .iter()
        .map(|&(file, content)| {
            FilterDefinition::parse(content).map_err(|source| LoadError::Bundled { file, source })
        })
        .collect()
}

/// Load `*.toml` definitions from `dir` in file-name order.
///
/// A missing directory yields no definitions. Files that are not UTF-8 or
/// fail validation are skipped with a warning and reported in
/// [`UserFilters::skipped`].
///
/// # Errors
///
/// Returns error if the directory or a file cannot be read.
pub fn load_user_dir(dir: &Path) -> Result<UserFilters, LoadError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| LoadError::Io { path, source }
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "Filter directory not found");
            return Ok(UserFilters::default());
        }
        Err(e) => return Err(io_err(dir)(e)),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(io_err(dir))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut loaded = UserFilters::default();
    for path in paths {
        let bytes = fs::read(&path).map_err(io_err(&path))?;
        let parsed = String::from_utf8(bytes)
            .map_err(DefinitionError::from)
            .and_then(|content| FilterDefinition::parse(&content));
        match parsed {
            Ok(def) => loaded.definitions.push(def),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Skipping invalid filter");
                loaded.skipped.push((path, e));
            }
        }
    }
    Ok(loaded)
}

/// Merge by name: user definitions first, then bundled ones not overridden.
pub fn merge(
    user: Vec<FilterDefinition>,
    bundled: Vec<FilterDefinition>,
) -> Vec<(FilterDefinition, Source)> {
    let names: HashSet<String> = user.iter().map(|d| d.name.clone()).collect();
    let overridden = |d: &FilterDefinition| names.contains(&d.name);

    user.into_iter()
        .map(|d| (d, Source::User))
        .chain(
            bundled
                .into_iter()
                .filter(|d| !overridden(d))
                .map(|d| (d, Source::Bundled)),
        )
        .collect()
}

/// Load user definitions from `user_dir` and merge them over the bundled set.
pub fn load_all(user_dir: &Path) -> Result<LoadedFilters, LoadError> {
    let user = load_user_dir(user_dir)?;
    let bundled = load_bundled()?;
    debug!(
        user = user.definitions.len(),
        skipped = user.skipped.len(),
        bundled = bundled.len(),
        "Loaded filter definitions"
    );
    Ok(LoadedFilters {
        definitions: merge(user.definitions, bundled),
        skipped: user.skipped,
    })
}
