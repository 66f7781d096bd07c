use std::time::{Duration, Instant};

use reqwest::header::{HeaderName, HeaderValue};
use tracing::debug;

use super::{HttpRequest, HttpResponse, HttpTransport};
use crate::errors::{RestSuiteError, Result};

/// `reqwest` blocking client. Timeouts belong to the transport, the engine
/// itself never gives up on a request.
#[derive(Debug, Clone)]
pub struct BlockingTransport {
    client: reqwest::blocking::Client,
}

impl BlockingTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RestSuiteError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpTransport for BlockingTransport {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse> {
        let transport_err = |cause| RestSuiteError::Transport {
            method: request.method.to_string(),
            url: request.url.clone(),
            cause,
        };

        let mut req_builder = self.client.request(request.method.into(), &request.url);
        req_builder = apply_headers(req_builder, request)?;
        if let Some(body) = &request.body {
            req_builder = req_builder.body(body.clone());
        }

        let started = Instant::now();
        let response = req_builder.send().map_err(transport_err)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(transport_err)?;
        debug!(
            method = %request.method,
            url = %request.url,
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );

        Ok(HttpResponse { status, body })
    }
}

fn apply_headers(
    mut req_builder: reqwest::blocking::RequestBuilder,
    request: &HttpRequest,
) -> Result<reqwest::blocking::RequestBuilder> {
    for (key, value) in &request.headers {
        let header_name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| RestSuiteError::config(format!("Invalid header key `{key}`: {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| RestSuiteError::config(format!("Invalid header value `{value}`: {e}")))?;
        req_builder = req_builder.header(header_name, header_value);
    }
    Ok(req_builder)
}
