//! Structural diff of decoded JSON bodies.
//!
//! [`diff`] walks two records (JSON objects) or two sequences (JSON arrays) key
//! by key and collects the leaves that differ. Sequences are compared by
//! position, the index becoming the key of the difference. The walk runs twice:
//! once from expected to actual, then, only if that produced nothing, from
//! actual to expected so that keys missing from the expected side are caught.
//!
//! A wildcard sentinel (see [`WILDCARD`]) on the expected side suppresses a leaf
//! mismatch at that position. It never hides a missing key.

use serde_json::{Map, Value};

use crate::errors::{RestSuiteError, Result};

/// Sentinel accepted by body expectations for values that cannot be known in
/// advance (generated ids, timestamps).
pub const WILDCARD: &str = "$$VAR";

/// Differences between two structures. Empty means equal.
pub type Diff = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Flipped,
}

/// Compares `expected` against `actual`.
///
/// Both sides must be structures of the same kind; anything else is a
/// [`RestSuiteError::ComparisonType`].
pub fn diff(expected: &Value, actual: &Value, wildcard: Option<&str>) -> Result<Diff> {
    match (expected, actual) {
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_)) => {}
        _ => {
            return Err(RestSuiteError::ComparisonType {
                message: "Compared values must both be objects or both be arrays".to_string(),
                context: serde_json::json!({
                    "expected": type_name(expected),
                    "actual": type_name(actual),
                }),
            })
        }
    }

    let forward = walk(expected, actual, wildcard, Direction::Forward);
    if !forward.is_empty() {
        return Ok(forward);
    }
    Ok(walk(actual, expected, wildcard, Direction::Flipped))
}

/// Equality under [`diff`]'s rules with the default wildcard.
pub fn same(expected: &Value, actual: &Value) -> Result<bool> {
    Ok(diff(expected, actual, Some(WILDCARD))?.is_empty())
}

fn walk(first: &Value, second: &Value, wildcard: Option<&str>, direction: Direction) -> Diff {
    let mut out = Diff::new();
    for (key, value) in entries(first) {
        let Some(other) = lookup(second, &key) else {
            out.insert(key, value.clone());
            continue;
        };

        match (value, other) {
            (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_)) => {
                let nested = walk(value, other, wildcard, direction);
                if !nested.is_empty() {
                    out.insert(key, Value::Object(nested));
                }
            }
            (Value::Object(_), _) | (Value::Array(_), _) => {
                out.insert(key, value.clone());
            }
            _ => {
                if value == other || suppressed(value, other, wildcard, direction) {
                    continue;
                }
                out.insert(key, value.clone());
            }
        }
    }
    out
}

/// The wildcard always lives on the expected side: the first argument on the
/// forward walk, the second one on the flipped walk.
fn suppressed(first: &Value, second: &Value, wildcard: Option<&str>, direction: Direction) -> bool {
    let Some(wildcard) = wildcard else {
        return false;
    };
    let expected = match direction {
        Direction::Forward => first,
        Direction::Flipped => second,
    };
    expected.as_str() == Some(wildcard)
}

fn entries(value: &Value) -> Vec<(String, &Value)> {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    }
}

fn lookup<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
