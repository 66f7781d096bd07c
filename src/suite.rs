//! Discovered suites and their test cases.

use std::path::PathBuf;

use crate::definition::{ClientDefinition, StepDefinition};
use crate::sorter::Dependent;

/// One discovered suite file, with its eligible cases in run order.
#[derive(Debug, Clone)]
pub struct TestSuite {
    /// Fully-qualified name, e.g. `Api.Users.UserTest`.
    pub name: String,
    pub path: PathBuf,
    pub eligible: bool,
    pub depends_on: Vec<String>,
    pub client: Option<ClientDefinition>,
    pub setup: Vec<StepDefinition>,
    pub cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn has_cases(&self) -> bool {
        !self.cases.is_empty()
    }
}

impl Dependent for TestSuite {
    fn name(&self) -> &str {
        &self.name
    }

    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }
}

#[derive(Debug, Clone)]
pub struct TestCase {
    pub name: String,
    pub description: Option<String>,
    pub eligible: bool,
    /// Sibling case names.
    pub depends_on: Vec<String>,
    pub steps: Vec<StepDefinition>,
}

impl Dependent for TestCase {
    fn name(&self) -> &str {
        &self.name
    }

    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }
}
