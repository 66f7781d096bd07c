//! Restsuite error handling.
//!
//! Every failure the engine can produce is a [`RestSuiteError`]. All of them are
//! fatal for the run: the orchestrator stops at the first one, prints the partial
//! summary and the failure dump, and exits non-zero.
//!
//! Variants carry a `miette` diagnostic code so the CLI can render them as
//! diagnostics, and an optional JSON `context` that the failure dump prints
//! verbatim (the diff of a failed comparison, the body that failed a shape check).

use std::path::PathBuf;

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = RestSuiteError> = std::result::Result<T, E>;

/// Unified error type for discovery, ordering, comparison and execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RestSuiteError {
    /// Malformed dependency graph, unknown dependency, invalid capture-store
    /// access, missing client configuration and similar setup mistakes.
    #[error("{message}")]
    #[diagnostic(code(restsuite::configuration))]
    Configuration {
        message: String,
        context: Option<Value>,
    },

    #[error("Directory \"{}\" does not exist", path.display())]
    #[diagnostic(
        code(restsuite::directory_not_found),
        help("pass an existing directory of test suites")
    )]
    DirectoryNotFound { path: PathBuf },

    /// An expectation on the last response was not met.
    #[error("Assert failed: {message}")]
    #[diagnostic(code(restsuite::assertion_failed))]
    AssertionFailed {
        message: String,
        context: Option<Value>,
    },

    /// The structural comparator was handed values it cannot compare.
    #[error("{message}")]
    #[diagnostic(code(restsuite::comparison_type))]
    ComparisonType { message: String, context: Value },

    /// A suite definition or config file could not be read or parsed.
    #[error("Failed to load \"{}\": {reason}", path.display())]
    #[diagnostic(code(restsuite::load))]
    Load { path: PathBuf, reason: String },

    #[error("Request {method} {url} failed")]
    #[diagnostic(code(restsuite::transport))]
    Transport {
        method: String,
        url: String,
        #[source]
        cause: reqwest::Error,
    },
}

impl RestSuiteError {
    pub fn config(message: impl Into<String>) -> Self {
        RestSuiteError::Configuration {
            message: message.into(),
            context: None,
        }
    }

    pub fn config_with(message: impl Into<String>, context: Value) -> Self {
        RestSuiteError::Configuration {
            message: message.into(),
            context: Some(context),
        }
    }

    pub fn assertion(message: impl Into<String>, context: Option<Value>) -> Self {
        RestSuiteError::AssertionFailed {
            message: message.into(),
            context,
        }
    }

    pub fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        RestSuiteError::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Short failure-kind name shown in the failure dump.
    pub fn kind(&self) -> &'static str {
        match self {
            RestSuiteError::Configuration { .. } => "ConfigurationError",
            RestSuiteError::DirectoryNotFound { .. } => "DirectoryNotFoundError",
            RestSuiteError::AssertionFailed { .. } => "AssertionFailedError",
            RestSuiteError::ComparisonType { .. } => "ComparisonTypeError",
            RestSuiteError::Load { .. } => "LoadError",
            RestSuiteError::Transport { .. } => "TransportError",
        }
    }

    /// Diagnostic context attached to the error, if any.
    pub fn context(&self) -> Option<&Value> {
        match self {
            RestSuiteError::Configuration { context, .. }
            | RestSuiteError::AssertionFailed { context, .. } => context.as_ref(),
            RestSuiteError::ComparisonType { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self, RestSuiteError::AssertionFailed { .. })
    }
}
