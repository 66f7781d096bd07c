//! Turns a parsed suite definition into suite/case metadata.
//!
//! - `ignore: true` makes the suite ineligible; nothing else is extracted.
//! - every suite dependency must name a known, loadable suite.
//! - a case is eligible only when marked `test: true`, and never when it uses
//!   the reserved initializer name [`INITIALIZER`].
//! - the first non-blank line of a case's `doc` is its description.
//! - case dependencies are checked later, by the suite's own sort.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::definition::{CaseDefinition, SuiteDefinition};
use crate::errors::{RestSuiteError, Result};
use crate::sorter;
use crate::suite::{TestCase, TestSuite};

/// Case name reserved for the suite initializer.
pub const INITIALIZER: &str = "setup";

/// Builds the metadata for one suite. `known_suite` answers whether a
/// fully-qualified suite name resolves to a loadable suite.
pub fn extract_suite<F>(
    name: &str,
    path: &Path,
    definition: SuiteDefinition,
    known_suite: F,
) -> Result<TestSuite>
where
    F: Fn(&str) -> bool,
{
    let mut suite = TestSuite {
        name: name.to_string(),
        path: path.to_path_buf(),
        eligible: !definition.ignore,
        depends_on: Vec::new(),
        client: None,
        setup: Vec::new(),
        cases: Vec::new(),
    };

    if definition.ignore {
        debug!(suite = %name, "suite is ignored");
        return Ok(suite);
    }

    for dependency in &definition.depends {
        let dependency = normalize_suite_name(dependency);
        if !known_suite(&dependency) {
            return Err(RestSuiteError::config_with(
                format!(
                    "Dependency suite \"{dependency}\" not found for test suite \"{name}\" (depends {dependency})"
                ),
                serde_json::json!({
                    "testSuite": name,
                    "dependencySuite": dependency,
                    "path": path.display().to_string(),
                }),
            ));
        }
        suite.depends_on.push(dependency);
    }

    suite.client = definition.client;
    suite.setup = definition.setup;

    let mut seen = HashSet::new();
    for case in &definition.cases {
        if !seen.insert(case.name.as_str()) {
            return Err(RestSuiteError::config(format!(
                "Test case \"{name}::{}\" is defined twice",
                case.name
            )));
        }
    }

    let cases: Vec<TestCase> = definition
        .cases
        .into_iter()
        .map(extract_case)
        .filter(|case| case.eligible)
        .collect();

    if !cases.is_empty() {
        suite.cases = sorter::sort(cases, Some(name))?;
    }

    Ok(suite)
}

pub fn extract_case(definition: CaseDefinition) -> TestCase {
    let eligible = definition.test && definition.name != INITIALIZER;
    if !eligible {
        return TestCase {
            name: definition.name,
            description: None,
            eligible: false,
            depends_on: Vec::new(),
            steps: Vec::new(),
        };
    }

    TestCase {
        description: definition.doc.as_deref().and_then(first_line),
        name: definition.name,
        eligible,
        depends_on: definition.depends,
        steps: definition.steps,
    }
}

fn first_line(doc: &str) -> Option<String> {
    doc.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Suite names are written without a leading separator.
pub fn normalize_suite_name(name: &str) -> String {
    name.trim().trim_start_matches('.').to_string()
}
