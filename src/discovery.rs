use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::definition::{self, SuiteDefinition, SUITE_EXTENSIONS};
use crate::errors::{RestSuiteError, Result};
use crate::metadata;
use crate::sorter;
use crate::suite::TestSuite;

/// Separator between namespace segments of a suite name.
pub const NAMESPACE_SEPARATOR: &str = ".";

/// Suffix (before the extension) that marks a file as a suite.
const SUITE_SUFFIX: &str = "test";

/// Discovers test suites within a directory tree.
///
/// The discovery process follows this flow:
/// 1. Scan the directory for suite files (`*Test.yaml`, `*Test.yml`, `*Test.json`)
/// 2. Map each path to a fully-qualified suite name under the root namespace
/// 3. Load every candidate and extract its metadata
/// 4. Drop ignored suites and order the rest by their dependencies
#[derive(Debug, Clone)]
pub struct SuiteDiscoverer {
    namespace: String,
    directory: PathBuf,
}

impl SuiteDiscoverer {
    pub fn new(namespace: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            namespace: namespace.into(),
            directory: directory.into(),
        }
    }

    /// Eligible suites in dependency order.
    pub fn discover(&self) -> Result<Vec<TestSuite>> {
        let files = self.discover_suite_files()?;

        let mut candidates: BTreeMap<String, PathBuf> = BTreeMap::new();
        for path in &files {
            let name = self.suite_name(path);
            if let Some(previous) = candidates.insert(name.clone(), path.clone()) {
                return Err(RestSuiteError::config(format!(
                    "Test suite \"{name}\" is defined twice (\"{}\" and \"{}\")",
                    previous.display(),
                    path.display()
                )));
            }
        }

        let mut loaded: Vec<(String, PathBuf, SuiteDefinition)> = Vec::with_capacity(files.len());
        for path in files {
            let name = self.suite_name(&path);
            let definition = definition::load_suite(&path)?;
            loaded.push((name, path, definition));
        }

        let mut suites = Vec::new();
        for (name, path, definition) in loaded {
            let suite = metadata::extract_suite(&name, &path, definition, |dep| {
                candidates.contains_key(dep)
            })?;
            if !suite.eligible {
                continue;
            }
            debug!(suite = %suite.name, cases = suite.cases.len(), "discovered test suite");
            suites.push(suite);
        }

        if suites.is_empty() {
            return Ok(suites);
        }
        sorter::sort(suites, None)
    }

    /// Recursively scans the directory for suite files.
    ///
    /// The returned list is sorted to keep discovery deterministic; execution
    /// order is decided by dependencies, not by this order.
    pub fn discover_suite_files(&self) -> Result<Vec<PathBuf>> {
        if !self.directory.is_dir() {
            return Err(RestSuiteError::DirectoryNotFound {
                path: self.directory.clone(),
            });
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.directory) {
            let entry = entry.map_err(|e| {
                RestSuiteError::load(&self.directory, format!("Failed to walk directory: {e}"))
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !is_suite_file(path) {
                continue;
            }

            files.push(path.to_path_buf());
        }
        files.sort();
        Ok(files)
    }

    /// `<root>/Users/UserTest.yaml` under namespace `Api` is `Api.Users.UserTest`.
    pub fn suite_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.directory).unwrap_or(path);
        let relative = relative.with_extension("");
        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        let namespace = self.namespace.trim_matches('.');
        let local = segments.join(NAMESPACE_SEPARATOR);
        if namespace.is_empty() {
            local
        } else {
            format!("{namespace}{NAMESPACE_SEPARATOR}{local}")
        }
    }
}

/// Returns true for `*test.<ext>` files (suffix matched case-insensitively).
pub fn is_suite_file(path: &Path) -> bool {
    let has_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUITE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)));
    if !has_extension {
        return false;
    }

    path.file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem.to_ascii_lowercase().ends_with(SUITE_SUFFIX))
}
