//! `{{ id:NAME }}` style placeholders resolved against the identifier store.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::errors::{RestSuiteError, Result};
use crate::ids::IdentifierStore;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*(id|take):([A-Za-z0-9_.\-]+)(?::(\d+))?\s*\}\}")
        .expect("placeholder pattern is valid")
});

/// Replaces every placeholder in `input`.
pub fn render(input: &str, ids: &mut IdentifierStore) -> Result<String> {
    if !input.contains("{{") {
        return Ok(input.to_string());
    }

    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(input) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&input[last..whole.start()]);
        out.push_str(&resolve(&caps, ids)?);
        last = whole.end();
    }
    out.push_str(&input[last..]);
    Ok(out)
}

/// Renders every string leaf of a JSON value in document order.
pub fn render_value(value: &Value, ids: &mut IdentifierStore) -> Result<Value> {
    Ok(match value {
        Value::String(s) => Value::String(render(s, ids)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| render_value(v, ids))
                .collect::<Result<_>>()?,
        ),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), render_value(v, ids)?);
            }
            Value::Object(out)
        }
        other => other.clone(),
    })
}

fn resolve(caps: &Captures<'_>, ids: &mut IdentifierStore) -> Result<String> {
    let consume = &caps[1] == "take";
    let name = &caps[2];
    let index = match caps.get(3) {
        Some(m) => Some(m.as_str().parse::<usize>().map_err(|_| {
            RestSuiteError::config(format!("ID index {} does not exist", m.as_str()))
        })?),
        None => None,
    };
    ids.get(name, index, consume)
}
