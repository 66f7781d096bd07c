//! Identifiers captured from response bodies for reuse by later test cases.

use std::collections::HashMap;

use serde_json::Value;

use crate::errors::{RestSuiteError, Result};

#[derive(Debug, Default, Clone)]
struct Entry {
    ids: Vec<String>,
    cursor: usize,
}

/// Named, ordered lists of captured identifiers.
///
/// Lives for a whole run; entries only shrink through consuming retrieval.
#[derive(Debug, Default, Clone)]
pub struct IdentifierStore {
    entries: HashMap<String, Entry>,
}

impl IdentifierStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends identifiers under `name`.
    pub fn capture<I, S>(&mut self, name: &str, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.entries.entry(name.to_string()).or_default();
        entry.ids.extend(ids.into_iter().map(Into::into));
    }

    /// Captures the `id` field of a record, or of every record in a sequence.
    pub fn capture_from_body(&mut self, name: &str, body: Option<&Value>) -> Result<usize> {
        let records: Vec<&Value> = match body {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(record @ Value::Object(_)) => vec![record],
            other => {
                return Err(RestSuiteError::config_with(
                    "Cannot extract IDs from response body that is not an array of objects or an object",
                    serde_json::json!({ "responseBody": other }),
                ))
            }
        };

        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(Self::record_id(record)?);
        }
        let count = ids.len();
        self.capture(name, ids);
        Ok(count)
    }

    fn record_id(record: &Value) -> Result<String> {
        let Value::Object(map) = record else {
            return Err(RestSuiteError::config_with(
                "Cannot extract ID from value that is not an object",
                serde_json::json!({ "object": record }),
            ));
        };
        match map.get("id") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(RestSuiteError::config_with(
                "Cannot extract ID from object, object must have field \"id\"",
                serde_json::json!({ "object": record }),
            )),
        }
    }

    /// Number of identifiers currently held under `name`.
    pub fn count(&self, name: &str) -> usize {
        self.entries.get(name).map_or(0, |e| e.ids.len())
    }

    /// Retrieves one identifier for `name`.
    ///
    /// Without `index` the identifiers are handed out in rotation, wrapping to
    /// the first one when exhausted; with `consume` the first one is removed
    /// instead. With a 1-based `index` that exact entry is returned, and
    /// removed when `consume` is set.
    pub fn get(&mut self, name: &str, index: Option<usize>, consume: bool) -> Result<String> {
        let Some(entry) = self.entries.get_mut(name) else {
            return Err(RestSuiteError::config(format!(
                "Cannot get ID for name \"{name}\", name does not exist in IDs"
            )));
        };

        if entry.ids.is_empty() {
            return Err(RestSuiteError::config(format!(
                "Cannot get ID for name \"{name}\", there are zero IDs for name"
            )));
        }

        if let Some(index) = index {
            if index < 1 {
                return Err(RestSuiteError::config("ID index must be greater than 0"));
            }
            let pos = index - 1;
            if pos >= entry.ids.len() {
                return Err(RestSuiteError::config(format!(
                    "ID index {index} does not exist"
                )));
            }
            if !consume {
                return Ok(entry.ids[pos].clone());
            }
            if pos < entry.cursor {
                entry.cursor -= 1;
            }
            return Ok(entry.ids.remove(pos));
        }

        if consume {
            entry.cursor = 0;
            return Ok(entry.ids.remove(0));
        }

        if entry.cursor >= entry.ids.len() {
            entry.cursor = 0;
        }
        let id = entry.ids[entry.cursor].clone();
        entry.cursor += 1;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rotation_wraps_without_consuming() {
        let mut store = IdentifierStore::new();
        store.capture("n", ["x", "y"]);
        assert_eq!(store.get("n", None, false).unwrap(), "x");
        assert_eq!(store.get("n", None, false).unwrap(), "y");
        assert_eq!(store.get("n", None, false).unwrap(), "x");
        assert_eq!(store.count("n"), 2);
    }

    #[test]
    fn indexed_consume_removes_entry() {
        let mut store = IdentifierStore::new();
        store.capture("n", ["x", "y"]);
        assert_eq!(store.get("n", Some(1), true).unwrap(), "x");
        assert_eq!(store.count("n"), 1);
        assert_eq!(store.get("n", Some(1), false).unwrap(), "y");
    }

    #[test]
    fn consume_without_index_takes_first() {
        let mut store = IdentifierStore::new();
        store.capture("n", ["a", "b", "c"]);
        assert_eq!(store.get("n", None, false).unwrap(), "a");
        assert_eq!(store.get("n", None, true).unwrap(), "a");
        assert_eq!(store.get("n", None, false).unwrap(), "b");
        assert_eq!(store.count("n"), 2);
    }

    #[test]
    fn retrieval_errors() {
        let mut store = IdentifierStore::new();
        let err = store.get("missing", None, false).unwrap_err();
        assert!(err.to_string().contains("name does not exist"));

        store.capture("n", ["only"]);
        assert!(store.get("n", Some(0), false).unwrap_err().to_string().contains("greater than 0"));
        assert_eq!(
            store.get("n", Some(2), false).unwrap_err().to_string(),
            "ID index 2 does not exist"
        );

        store.get("n", None, true).unwrap();
        let err = store.get("n", None, false).unwrap_err();
        assert!(err.to_string().contains("zero IDs"));
        assert_eq!(err.kind(), "ConfigurationError");
    }

    #[test]
    fn captures_from_records_and_sequences() {
        let mut store = IdentifierStore::new();
        let body = json!([{"id": "1"}, {"id": 2}]);
        assert_eq!(store.capture_from_body("users", Some(&body)).unwrap(), 2);
        let body = json!({"id": "3", "name": "c"});
        assert_eq!(store.capture_from_body("users", Some(&body)).unwrap(), 1);
        assert_eq!(store.get("users", Some(2), false).unwrap(), "2");
        assert_eq!(store.count("users"), 3);
    }

    #[test]
    fn capture_requires_id_field() {
        let mut store = IdentifierStore::new();
        let err = store
            .capture_from_body("users", Some(&json!([{"name": "x"}])))
            .unwrap_err();
        assert!(err.to_string().contains("must have field \"id\""));
        assert!(store.capture_from_body("users", None).is_err());
        assert!(store.capture_from_body("users", Some(&json!("text"))).is_err());
        assert_eq!(store.count("users"), 0);
    }
}
