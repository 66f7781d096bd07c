//! HTTP collaborator: request/response records and the transport seam.

use std::collections::BTreeMap;

use crate::errors::Result;

pub mod client;
pub mod method;

pub use client::BlockingTransport;
pub use method::HttpMethod;

/// Header always sent unless overridden.
pub const DEFAULT_CONTENT_TYPE: (&str, &str) = ("content-type", "application/json");

/// A fully resolved request, as it goes over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Sends requests. Blocks until a response or a transport failure.
pub trait HttpTransport {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for Box<T> {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).send(request)
    }
}

/// Where requests go and which headers they carry by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub headers: BTreeMap<String, String>,
}

impl ClientConfig {
    /// A client for `base_url` with the default content type; `headers` are
    /// layered on top, later layers winning.
    pub fn new<'a, I>(base_url: impl Into<String>, layers: I) -> Self
    where
        I: IntoIterator<Item = &'a BTreeMap<String, String>>,
    {
        let mut headers = BTreeMap::new();
        headers.insert(
            DEFAULT_CONTENT_TYPE.0.to_string(),
            DEFAULT_CONTENT_TYPE.1.to_string(),
        );
        for layer in layers {
            merge_headers(&mut headers, layer);
        }
        Self {
            base_url: base_url.into(),
            headers,
        }
    }

    /// `base_url/path`, with exactly one slash between them.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Header names are case-insensitive; they are stored lowercased.
pub fn merge_headers(into: &mut BTreeMap<String, String>, layer: &BTreeMap<String, String>) {
    for (name, value) in layer {
        into.insert(name.to_ascii_lowercase(), value.clone());
    }
}
