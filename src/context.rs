//! Run-wide state owned by the orchestrator.
//!
//! [`RunContext`] replaces process globals: it holds the counters, the captured
//! identifiers and the last HTTP exchange, and exposes the client calls and
//! expectations a test step is made of.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::assertion::{
    self, Body, ResponseBodyCount, ResponseBodyObject, ResponseBodyObjects, ResponseBodySame,
    ResponseCode,
};
use crate::errors::{RestSuiteError, Result};
use crate::http::{merge_headers, ClientConfig, HttpMethod, HttpRequest, HttpTransport};
use crate::ids::IdentifierStore;

/// Monotonic run counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Id of the most recently started test; also the number of tests run.
    pub tests: u64,
    pub assertions: u64,
    pub passed: u64,
    pub warnings: u64,
    pub errors: u64,
}

impl RunCounters {
    /// Starts a test and returns its id.
    pub fn begin_test(&mut self) -> u64 {
        self.tests += 1;
        self.tests
    }
}

/// The request as it was sent, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseInfo {
    pub status: u16,
    pub body: String,
}

/// Last HTTP exchange of the current test case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    pub request: Option<RequestInfo>,
    pub response: Option<ResponseInfo>,
}

impl RunState {
    pub fn is_empty(&self) -> bool {
        self.request.is_none() && self.response.is_none()
    }
}

pub struct RunContext {
    pub counters: RunCounters,
    pub ids: IdentifierStore,
    state: RunState,
    client: Option<ClientConfig>,
    transport: Box<dyn HttpTransport>,
}

impl RunContext {
    pub fn new(transport: Box<dyn HttpTransport>) -> Self {
        Self {
            counters: RunCounters::default(),
            ids: IdentifierStore::new(),
            state: RunState::default(),
            client: None,
            transport,
        }
    }

    /// Configures the client used by subsequent requests.
    pub fn set_client(&mut self, client: Option<ClientConfig>) {
        self.client = client;
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Clears the last exchange. Called at every test case boundary.
    pub fn reset_state(&mut self) {
        self.state = RunState::default();
    }

    /// Takes the last exchange out of the context, leaving it empty.
    pub fn take_state(&mut self) -> RunState {
        std::mem::take(&mut self.state)
    }

    /// Issues one request against the configured client.
    ///
    /// GET parameters go in the query string; for other verbs `body` is sent
    /// JSON-encoded.
    pub fn fetch(
        &mut self,
        method: HttpMethod,
        path: &str,
        query: &BTreeMap<String, String>,
        body: Option<&Value>,
        headers: &BTreeMap<String, String>,
    ) -> Result<u16> {
        let Some(client) = &self.client else {
            return Err(RestSuiteError::config(
                "No client found, a base URL must be configured before running client tests",
            ));
        };

        let mut url = reqwest::Url::parse(&client.url(path)).map_err(|e| {
            RestSuiteError::config(format!("Invalid URL \"{}\": {e}", client.url(path)))
        })?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        let mut request_headers = client.headers.clone();
        merge_headers(&mut request_headers, headers);

        let body = match body {
            Some(body) if method.sends_body() => Some(serde_json::to_string(body).map_err(|e| {
                RestSuiteError::config(format!("Failed to encode request body: {e}"))
            })?),
            _ => None,
        };

        let request = HttpRequest {
            method,
            url: url.to_string(),
            headers: request_headers,
            body,
        };

        self.state.request = Some(RequestInfo {
            method,
            url: request.url.clone(),
            headers: request.headers.clone(),
        });
        self.state.response = None;

        debug!(method = %method, url = %request.url, "sending request");
        let response = self.transport.send(&request)?;
        let status = response.status;
        self.state.response = Some(ResponseInfo {
            status: response.status,
            body: response.body,
        });
        Ok(status)
    }

    pub fn response_body(&self) -> Option<&str> {
        self.state.response.as_ref().map(|r| r.body.as_str())
    }

    pub fn response_code(&self) -> Option<u16> {
        self.state.response.as_ref().map(|r| r.status)
    }

    /// Decoded body; empty and undecodable bodies are absent, not errors.
    pub fn decoded_body(&self) -> Body {
        let body = self.response_body()?;
        if body.is_empty() {
            return None;
        }
        serde_json::from_str(body).ok()
    }

    fn require_response(&self) -> Result<()> {
        if self.state.response.is_none() {
            return Err(RestSuiteError::config(
                "Client request must be made before using client checks",
            ));
        }
        Ok(())
    }

    // =====================
    // Expectations
    // =====================

    pub fn expect_body_count(&mut self, count: usize, message: Option<&str>) -> Result<()> {
        let body = self.decoded_body();
        assertion::check(
            &mut self.counters.assertions,
            &mut ResponseBodyCount::new(count),
            &body,
            message,
        )
    }

    pub fn expect_body_object(&mut self, message: Option<&str>) -> Result<()> {
        let body = self.decoded_body();
        assertion::check(
            &mut self.counters.assertions,
            &mut ResponseBodyObject,
            &body,
            message,
        )
    }

    pub fn expect_body_objects(&mut self, message: Option<&str>) -> Result<()> {
        let body = self.decoded_body();
        assertion::check(
            &mut self.counters.assertions,
            &mut ResponseBodyObjects,
            &body,
            message,
        )
    }

    pub fn expect_body_same(&mut self, expected: &Value, message: Option<&str>) -> Result<()> {
        let body = self.decoded_body();
        assertion::check(
            &mut self.counters.assertions,
            &mut ResponseBodySame::new(expected.clone()),
            &body,
            message,
        )
    }

    /// Like [`RunContext::expect_body_same`], after sorting both sequences of
    /// records by `sort_field`.
    pub fn expect_body_same_sorted(
        &mut self,
        expected: &Value,
        sort_field: &str,
        message: Option<&str>,
    ) -> Result<()> {
        let Value::Array(expected) = expected else {
            return Err(RestSuiteError::config(
                "Cannot auto sort expected body, must be array",
            ));
        };
        let Some(Value::Array(actual)) = self.decoded_body() else {
            return Err(RestSuiteError::config(
                "Cannot auto sort response body, must be array",
            ));
        };

        let expected = Value::Array(sorted_by(expected.clone(), sort_field, "expected")?);
        let actual = Some(Value::Array(sorted_by(actual, sort_field, "response")?));
        assertion::check(
            &mut self.counters.assertions,
            &mut ResponseBodySame::new(expected),
            &actual,
            message,
        )
    }

    pub fn expect_code(&mut self, code: u16, message: Option<&str>) -> Result<()> {
        self.require_response()?;
        let actual = self.response_code();
        assertion::check(
            &mut self.counters.assertions,
            &mut ResponseCode::new(code),
            &actual,
            message,
        )
    }

    pub fn expect_code_ok(&mut self, message: Option<&str>) -> Result<()> {
        self.expect_code(200, message)
    }

    // =====================
    // Identifiers
    // =====================

    /// Captures every `id` of the current body under `name`.
    pub fn capture_ids(&mut self, name: &str) -> Result<usize> {
        let body = self.decoded_body();
        let count = self.ids.capture_from_body(name, body.as_ref())?;
        debug!(name, count, "captured ids");
        Ok(count)
    }

    pub fn id(&mut self, name: &str, index: Option<usize>, consume: bool) -> Result<String> {
        self.ids.get(name, index, consume)
    }
}

/// Sorts records by the text of `field`; every item must be a record holding it.
fn sorted_by(items: Vec<Value>, field: &str, side: &str) -> Result<Vec<Value>> {
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let key = match item.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(other) if item.is_object() => other.to_string(),
            _ => {
                return Err(RestSuiteError::config_with(
                    format!(
                        "Cannot auto sort {side} body, every item must be an object with field \"{field}\""
                    ),
                    serde_json::json!({ "item": item }),
                ))
            }
        };
        keyed.push((key, item));
    }
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use serde_json::json;
    use std::collections::VecDeque;

    struct Canned(VecDeque<HttpResponse>);

    impl HttpTransport for Canned {
        fn send(&mut self, _request: &HttpRequest) -> Result<HttpResponse> {
            Ok(self.0.pop_front().unwrap_or(HttpResponse {
                status: 500,
                body: String::new(),
            }))
        }
    }

    fn context(responses: &[(u16, &str)]) -> RunContext {
        let canned = responses
            .iter()
            .map(|(status, body)| HttpResponse {
                status: *status,
                body: body.to_string(),
            })
            .collect();
        let mut ctx = RunContext::new(Box::new(Canned(canned)));
        ctx.set_client(Some(ClientConfig::new("http://api.test", [])));
        ctx
    }

    fn get(ctx: &mut RunContext, path: &str) -> Result<u16> {
        ctx.fetch(HttpMethod::Get, path, &BTreeMap::new(), None, &BTreeMap::new())
    }

    #[test]
    fn fetch_without_client_fails() {
        let mut ctx = context(&[]);
        ctx.set_client(None);
        let err = get(&mut ctx, "/x").unwrap_err();
        assert!(err.to_string().contains("No client found"));
    }

    #[test]
    fn fetch_records_request_and_response() {
        let mut ctx = context(&[(200, r#"[{"id":"1"}]"#)]);
        let query: BTreeMap<_, _> = [("page".to_string(), "2".to_string())].into_iter().collect();
        ctx.fetch(HttpMethod::Get, "/users", &query, Some(&json!({"ignored": true})), &BTreeMap::new())
            .unwrap();
        let request = ctx.state().request.clone().unwrap();
        assert_eq!(request.url, "http://api.test/users?page=2");
        assert_eq!(request.headers["content-type"], "application/json");
        assert_eq!(ctx.response_code(), Some(200));
        ctx.reset_state();
        assert!(ctx.state().is_empty());
    }

    #[test]
    fn undecodable_body_is_absent() {
        let mut ctx = context(&[(502, "<html>bad gateway</html>")]);
        get(&mut ctx, "/").unwrap();
        assert_eq!(ctx.decoded_body(), None);
        ctx.expect_code(502, None).unwrap();
        assert!(ctx.expect_body_object(None).is_err());
        assert_eq!(ctx.counters.assertions, 2);
    }

    #[test]
    fn code_check_requires_a_response() {
        let mut ctx = context(&[]);
        assert!(ctx.expect_code_ok(None).is_err());
        assert_eq!(ctx.counters.assertions, 0);
    }

    #[test]
    fn sorted_comparison_ignores_order() {
        let mut ctx = context(&[(200, r#"[{"id":"b","n":2},{"id":"a","n":1}]"#)]);
        get(&mut ctx, "/items").unwrap();
        ctx.expect_body_same_sorted(&json!([{"id": "a", "n": 1}, {"id": "b", "n": 2}]), "id", None)
            .unwrap();
        assert!(ctx.expect_body_same(&json!([{"id": "a", "n": 1}, {"id": "b", "n": 2}]), None).is_err());
        assert!(ctx.expect_body_same_sorted(&json!({"id": "a"}), "id", None).is_err());
    }

    #[test]
    fn sorted_comparison_requires_records_with_the_field() {
        let mut ctx = context(&[(200, r#"[{"id":"a"},"b"]"#), (200, r#"[{"id":"a"},{"n":1}]"#)]);
        get(&mut ctx, "/items").unwrap();
        let err = ctx
            .expect_body_same_sorted(&json!([{"id": "a"}, {"id": "b"}]), "id", None)
            .unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
        assert!(err.to_string().contains("auto sort response body"), "{err}");

        get(&mut ctx, "/items").unwrap();
        let err = ctx
            .expect_body_same_sorted(&json!([{"id": "a"}, {"id": "b"}]), "id", None)
            .unwrap_err();
        assert!(err.to_string().contains("field \"id\""), "{err}");

        let err = ctx
            .expect_body_same_sorted(&json!([{"id": "a"}, 3]), "id", None)
            .unwrap_err();
        assert!(err.to_string().contains("auto sort expected body"), "{err}");
        assert_eq!(ctx.counters.assertions, 0);
    }

    #[test]
    fn captures_ids_from_body() {
        let mut ctx = context(&[(200, r#"[{"id":"x"},{"id":"y"}]"#)]);
        get(&mut ctx, "/users").unwrap();
        assert_eq!(ctx.capture_ids("users").unwrap(), 2);
        assert_eq!(ctx.id("users", None, false).unwrap(), "x");
        assert_eq!(ctx.id("users", None, false).unwrap(), "y");
        assert_eq!(ctx.id("users", None, false).unwrap(), "x");
    }
}
