//! On-disk suite definitions.
//!
//! A suite is a YAML (or JSON) document:
//!
//! ```yaml
//! ignore: false
//! depends: [Api.Auth.LoginTest]
//! client:
//!   base_url: http://localhost:8080
//!   headers: { x-api-key: secret }
//! setup:
//!   - { method: POST, path: /reset }
//! cases:
//!   - name: create_user
//!     test: true
//!     doc: Creates a user
//!     depends: [list_users]
//!     steps:
//!       - method: POST
//!         path: /users
//!         body: { name: Bob }
//!         expect: { status: 201, body: { id: "$$VAR", name: Bob } }
//!         capture: users
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::errors::{RestSuiteError, Result};
use crate::http::HttpMethod;

/// Suite file extensions the discoverer picks up.
pub const SUITE_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteDefinition {
    #[serde(default)]
    pub ignore: bool,
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub client: Option<ClientDefinition>,
    /// Initializer steps, run once when the suite is instantiated.
    #[serde(default)]
    pub setup: Vec<StepDefinition>,
    #[serde(default)]
    pub cases: Vec<CaseDefinition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientDefinition {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseDefinition {
    pub name: String,
    #[serde(default)]
    pub test: bool,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepDefinition {
    #[serde(default)]
    pub method: HttpMethod,
    pub path: String,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub expect: ExpectDefinition,
    /// Capture every `id` of the decoded body under this name.
    #[serde(default)]
    pub capture: Option<String>,
}

/// Expectations on a step's response, checked in field order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectDefinition {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub object: bool,
    #[serde(default)]
    pub objects: bool,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub body: Option<Value>,
    /// Sort expected and actual sequences by this field before comparing.
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Reads and parses a suite file, choosing the format by extension.
pub fn load_suite(path: &Path) -> Result<SuiteDefinition> {
    let content = fs::read_to_string(path).map_err(|e| RestSuiteError::load(path, e))?;
    parse_suite(path, &content)
}

pub fn parse_suite(path: &Path, content: &str) -> Result<SuiteDefinition> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        return serde_json::from_str(content).map_err(|e| RestSuiteError::load(path, e));
    }
    // an empty YAML document is an empty suite
    if content.trim().is_empty() {
        return Ok(SuiteDefinition::default());
    }
    serde_yaml::from_str(content).map_err(|e| RestSuiteError::load(path, e))
}
