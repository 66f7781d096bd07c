//! Shared fixtures for the integration tests: suite files on disk, a scripted
//! transport, and a throwaway HTTP server for the CLI.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::thread;

use restsuite::config::RunConfig;
use restsuite::http::{HttpRequest, HttpResponse, HttpTransport};
use restsuite::runner::{RunOutcome, Runner};
use restsuite::Result;
use tempfile::TempDir;
use termcolor::Buffer;

/// Writes `content` to `root/relative`, creating parent directories.
pub fn write_suite(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// A temp directory populated with `(relative path, content)` suites.
pub fn suite_dir(suites: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (relative, content) in suites {
        write_suite(dir.path(), relative, content);
    }
    dir
}

/// Answers requests from a queue and keeps every request it saw.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    responses: Rc<RefCell<VecDeque<HttpResponse>>>,
    pub requests: Rc<RefCell<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub fn new(responses: &[(u16, &str)]) -> Self {
        let transport = Self::default();
        transport.responses.borrow_mut().extend(
            responses
                .iter()
                .map(|(status, body)| HttpResponse {
                    status: *status,
                    body: body.to_string(),
                }),
        );
        transport
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests.borrow().iter().map(|r| r.url.clone()).collect()
    }
}

impl HttpTransport for ScriptedTransport {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse> {
        self.requests.borrow_mut().push(request.clone());
        Ok(self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or(HttpResponse {
                status: 404,
                body: String::new(),
            }))
    }
}

pub fn config(dir: &Path) -> RunConfig {
    RunConfig {
        namespace: "Api".to_string(),
        directory: dir.to_path_buf(),
        base_url: Some("http://api.test".to_string()),
        use_colors: false,
        ..RunConfig::default()
    }
}

/// Runs every suite under `dir` against `transport`; returns the outcome and
/// everything the reporter printed.
pub fn run(dir: &Path, transport: &ScriptedTransport) -> (RunOutcome, String) {
    let mut runner = Runner::new(config(dir), Box::new(transport.clone()), Buffer::no_color());
    let outcome = runner.run();
    let output = String::from_utf8(runner.into_output().into_inner()).unwrap();
    (outcome, output)
}

/// Serves `responses` in order, one per connection, on a local port.
/// Returns the base URL.
pub fn serve(responses: Vec<(u16, &'static str)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        for (status, body) in responses {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            let mut reader = BufReader::new(stream);

            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if let Some(value) = lower.strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
            let mut request_body = vec![0; content_length];
            let _ = reader.read_exact(&mut request_body);

            let mut stream = reader.into_inner();
            let response = format!(
                "HTTP/1.1 {status} OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    format!("http://{addr}")
}
