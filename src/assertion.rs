//! Countable expectations on the last HTTP exchange.
//!
//! Each assertion exposes a side-effect free [`Assertion::test`] and a default
//! [`Assertion::assert`] that turns a failed test into
//! [`RestSuiteError::AssertionFailed`]. The run-wide assertion counter is bumped
//! by [`check`], once per call, whatever the outcome.

use serde_json::Value;
use tracing::debug;

use crate::compare::{self, Diff, WILDCARD};
use crate::errors::{RestSuiteError, Result};

/// An expectation over a subject of type `S`.
pub trait Assertion<S: ?Sized> {
    /// Evaluates the expectation. Implementations may remember details of the
    /// last evaluation (actual count, diff) for the failure message.
    fn test(&mut self, subject: &S) -> bool;

    /// Message and diagnostic context used when [`Assertion::test`] fails.
    fn failure(&self, subject: &S) -> (String, Option<Value>);

    fn assert(&mut self, subject: &S, message: Option<&str>) -> Result<()> {
        if self.test(subject) {
            return Ok(());
        }
        let (default, context) = self.failure(subject);
        Err(RestSuiteError::assertion(
            message.map(str::to_string).unwrap_or(default),
            context,
        ))
    }
}

/// Counts the assertion, then asserts.
pub fn check<S: ?Sized, A: Assertion<S>>(
    counter: &mut u64,
    assertion: &mut A,
    subject: &S,
    message: Option<&str>,
) -> Result<()> {
    *counter += 1;
    assertion.assert(subject, message)
}

/// Decoded response body, absent when empty or not valid JSON.
pub type Body = Option<Value>;

fn body_context(body: &Body) -> Option<Value> {
    Some(serde_json::json!({ "responseBody": body }))
}

/// Body is a sequence with exactly `count` elements.
#[derive(Debug, Clone)]
pub struct ResponseBodyCount {
    count: usize,
    actual: usize,
}

impl ResponseBodyCount {
    pub fn new(count: usize) -> Self {
        Self { count, actual: 0 }
    }
}

impl Assertion<Body> for ResponseBodyCount {
    fn test(&mut self, body: &Body) -> bool {
        self.actual = match body {
            Some(Value::Array(items)) => items.len(),
            _ => return false,
        };
        self.actual == self.count
    }

    fn failure(&self, body: &Body) -> (String, Option<Value>) {
        (
            format!(
                "Response body count {} is not expected count {}",
                self.actual, self.count
            ),
            body_context(body),
        )
    }
}

/// Body is a single record.
#[derive(Debug, Clone, Default)]
pub struct ResponseBodyObject;

impl Assertion<Body> for ResponseBodyObject {
    fn test(&mut self, body: &Body) -> bool {
        matches!(body, Some(Value::Object(_)))
    }

    fn failure(&self, body: &Body) -> (String, Option<Value>) {
        ("Response body is not an object".to_string(), body_context(body))
    }
}

/// Body is a non-empty sequence whose first element is a record.
#[derive(Debug, Clone, Default)]
pub struct ResponseBodyObjects;

impl Assertion<Body> for ResponseBodyObjects {
    fn test(&mut self, body: &Body) -> bool {
        match body {
            Some(Value::Array(items)) => matches!(items.first(), Some(Value::Object(_))),
            _ => false,
        }
    }

    fn failure(&self, body: &Body) -> (String, Option<Value>) {
        (
            "Response body is not an array of objects".to_string(),
            body_context(body),
        )
    }
}

/// Body structurally equals an expected value, `$$VAR` matching anything.
#[derive(Debug, Clone)]
pub struct ResponseBodySame {
    expected: Value,
    diff: Diff,
}

impl ResponseBodySame {
    pub fn new(expected: Value) -> Self {
        Self {
            expected,
            diff: Diff::new(),
        }
    }

    pub fn diff(&self) -> &Diff {
        &self.diff
    }

    fn whole_expected(&self) -> Diff {
        match &self.expected {
            Value::Object(map) => map.clone(),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.clone()))
                .collect(),
            other => {
                let mut diff = Diff::new();
                diff.insert("expected".to_string(), other.clone());
                diff
            }
        }
    }
}

impl Assertion<Body> for ResponseBodySame {
    fn test(&mut self, body: &Body) -> bool {
        // bodies of another shape (absent, scalar, other structure kind)
        // differ entirely; the comparator only sees same-kind structures
        let comparable = match (&self.expected, body) {
            (Value::Object(_), Some(actual @ Value::Object(_)))
            | (Value::Array(_), Some(actual @ Value::Array(_))) => Some(actual),
            _ => None,
        };

        self.diff = match comparable {
            Some(actual) => match compare::diff(&self.expected, actual, Some(WILDCARD)) {
                Ok(diff) => diff,
                Err(err) => {
                    // unreachable while the shape check above holds
                    debug!(error = %err, "comparator rejected same-kind bodies");
                    self.whole_expected()
                }
            },
            None => self.whole_expected(),
        };
        self.diff.is_empty()
    }

    fn failure(&self, _body: &Body) -> (String, Option<Value>) {
        (
            "Response body is not the same as expected".to_string(),
            Some(serde_json::json!({ "diff": self.diff, "expected": self.expected })),
        )
    }
}

/// Last response status code equals `expected`.
#[derive(Debug, Clone)]
pub struct ResponseCode {
    expected: u16,
}

impl ResponseCode {
    pub fn new(expected: u16) -> Self {
        Self { expected }
    }
}

impl Assertion<Option<u16>> for ResponseCode {
    fn test(&mut self, code: &Option<u16>) -> bool {
        *code == Some(self.expected)
    }

    fn failure(&self, code: &Option<u16>) -> (String, Option<Value>) {
        let actual = code.map_or_else(|| "[NULL]".to_string(), |c| c.to_string());
        (
            format!(
                "Response code {actual} is not the same as expected response code {}",
                self.expected
            ),
            None,
        )
    }
}
