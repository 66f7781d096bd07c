//! Human-readable run output.
//!
//! Everything the runner prints goes through [`Reporter`], which writes to any
//! `termcolor::WriteColor` (a colored stdout stream in the CLI, an in-memory
//! buffer in tests). Write errors on the terminal are not worth aborting a
//! run for and are ignored, as with the CLI's other colored output.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use difference::{Changeset, Difference};
use serde_json::Value;
use termcolor::{Color, ColorSpec, WriteColor};

use crate::context::{RunCounters, RunState};
use crate::errors::RestSuiteError;
use crate::suite::{TestCase, TestSuite};

const SEPARATOR_WIDTH: usize = 90;

/// Where in the run a failure happened, plus what was on the wire.
#[derive(Debug)]
pub struct FailureReport<'a> {
    pub error: &'a RestSuiteError,
    pub suite: Option<(&'a str, &'a Path)>,
    pub case: Option<&'a str>,
    pub exchange: &'a RunState,
}

/// The label printed for one test: id, status, qualified name, description.
#[derive(Debug, Clone, Copy)]
pub struct TestLabel<'a> {
    pub id: Option<u64>,
    pub status: Option<u16>,
    pub suite: &'a str,
    pub case: Option<&'a TestCase>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Ok,
    Warn,
    Error,
}

impl Level {
    fn color(self) -> ColorSpec {
        let mut spec = ColorSpec::new();
        match self {
            Level::Ok => spec.set_fg(Some(Color::White)),
            Level::Warn => spec.set_fg(Some(Color::Yellow)),
            Level::Error => spec.set_fg(Some(Color::Red)),
        };
        spec
    }
}

pub struct Reporter<W> {
    out: W,
}

impl<W: WriteColor> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    // =====================
    // Low-level painting
    // =====================

    fn paint(&mut self, spec: &ColorSpec, text: &str) {
        let _ = self.out.set_color(spec);
        let _ = write!(self.out, "{text}");
        let _ = self.out.reset();
    }

    fn plain(&mut self, text: &str) {
        let _ = write!(self.out, "{text}");
    }

    fn dim(&mut self, text: &str) {
        self.paint(ColorSpec::new().set_dimmed(true), text);
    }

    fn bold(&mut self, text: &str) {
        self.paint(ColorSpec::new().set_bold(true), text);
    }

    fn newline(&mut self) {
        let _ = writeln!(self.out);
    }

    fn field(&mut self, indent: &str, name: &str, value: &str) {
        self.dim(&format!("{indent}{name}: "));
        self.plain(value);
        self.newline();
    }

    pub fn separator(&mut self) {
        self.paint(
            ColorSpec::new().set_fg(Some(Color::Black)).set_intense(true),
            &"-".repeat(SEPARATOR_WIDTH),
        );
        self.newline();
    }

    // =====================
    // Run output
    // =====================

    pub fn banner(&mut self, namespace: &str, directory: &Path, debug: bool) {
        self.plain("Running tests...");
        self.newline();
        self.separator();
        self.field("  ", "Base namespace", namespace);
        self.field("  ", "Base directory", &directory.display().to_string());
        if debug {
            self.field("  ", "Debug mode", "on");
        }
    }

    pub fn suites_found(&mut self, count: usize) {
        self.field("  ", "Test suites", &count.to_string());
        self.separator();
    }

    fn label(&mut self, level: Level, label: TestLabel<'_>, elapsed: Option<Duration>) {
        let color = level.color();
        if let Some(id) = label.id {
            self.paint(&color, &format!("{id:03}) "));
        }
        if let Some(status) = label.status {
            self.paint(
                ColorSpec::new().set_fg(Some(Color::Magenta)),
                &format!("{status} "),
            );
        }

        let name = match label.case {
            Some(case) => format!("{}::{}", label.suite, case.name),
            None => label.suite.to_string(),
        };
        self.paint(&color, &name);
        self.plain("  ");

        if let Some(description) = label.case.and_then(|c| c.description.as_deref()) {
            self.dim(&format!(" # {description}"));
        }
        if let Some(elapsed) = elapsed {
            self.dim(&format!(" [{}]", format_elapsed(elapsed)));
        }
        self.newline();
    }

    pub fn test_ok(&mut self, label: TestLabel<'_>, elapsed: Duration) {
        self.label(Level::Ok, label, Some(elapsed));
    }

    pub fn test_error(&mut self, label: TestLabel<'_>) {
        self.label(Level::Error, label, None);
    }

    pub fn warn(&mut self, suite: &str, text: &str) {
        let label = TestLabel {
            id: None,
            status: None,
            suite,
            case: None,
        };
        self.label(Level::Warn, label, None);
        self.paint(&Level::Warn.color(), &format!("  [WARN] {text}"));
        self.newline();
    }

    pub fn summary(&mut self, counters: &RunCounters, elapsed: Duration) {
        let time = format_elapsed(elapsed);
        let text = if counters.errors > 0 || counters.warnings > 0 {
            format!(
                " (Tests: {}, Assertions: {}, Errors: {}, Warnings: {}) in {time}",
                counters.tests, counters.assertions, counters.errors, counters.warnings
            )
        } else {
            format!(
                " (Tests: {}, Assertions: {}) in {time}",
                counters.tests, counters.assertions
            )
        };

        self.separator();
        if counters.errors > 0 {
            self.paint(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true), "Error!");
            self.paint(ColorSpec::new().set_fg(Some(Color::Red)), &text);
        } else if counters.warnings > 0 {
            self.paint(
                ColorSpec::new().set_bg(Some(Color::Yellow)).set_fg(Some(Color::Black)),
                "Warning",
            );
            self.paint(ColorSpec::new().set_fg(Some(Color::Yellow)), &text);
        } else {
            self.paint(
                ColorSpec::new().set_bg(Some(Color::Green)).set_fg(Some(Color::Black)),
                "OK",
            );
            self.paint(ColorSpec::new().set_fg(Some(Color::Green)).set_intense(true), &text);
        }
        self.newline();
    }

    /// Last request and response, if any.
    pub fn exchange(&mut self, state: &RunState, indent: &str) {
        if let Some(request) = &state.request {
            self.separator();
            self.bold(&format!("{indent}REQUEST"));
            self.newline();
            self.field(indent, "URL", &request.url);
            self.field(indent, "Method", &request.method.to_string());
            if !request.headers.is_empty() {
                let headers = request
                    .headers
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join("; ");
                self.field(indent, "Headers", &headers);
            }
        }

        if let Some(response) = &state.response {
            self.separator();
            self.bold(&format!("{indent}RESPONSE"));
            self.newline();
            self.field(indent, "Status Code", &response.status.to_string());
            self.dim(&format!("{indent}Response:"));
            self.newline();
            self.plain(&format!("{indent}{}", response.body));
            self.newline();
        }
    }

    /// Full diagnostics for the failure that ended the run.
    pub fn failure(&mut self, report: &FailureReport<'_>, debug: bool) {
        let error = report.error;
        self.paint(
            ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true),
            &error.to_string(),
        );
        self.newline();
        self.newline();

        let kind = match miette::Diagnostic::code(error) {
            Some(code) => format!("{} ({code})", error.kind()),
            None => error.kind().to_string(),
        };
        self.field("", "Type", &kind);

        if let Some((suite, path)) = report.suite {
            self.field("", "Test Suite Path", &path.display().to_string());
            match report.case {
                Some(case) => self.field("", "Suite Test", &format!("{suite}::{case}")),
                None => self.field("", "Test Suite", suite),
            }
        }

        self.exchange(report.exchange, "");

        if debug {
            let mut cause = std::error::Error::source(error);
            if cause.is_some() {
                self.separator();
                self.bold("ERROR SOURCE CHAIN");
                self.newline();
            }
            while let Some(err) = cause {
                self.plain(&format!("  caused by: {err}"));
                self.newline();
                cause = err.source();
            }
        }

        if let Some(context) = error.context() {
            self.separator();
            self.bold("ERROR CONTEXT");
            self.newline();
            let pretty = serde_json::to_string_pretty(context).unwrap_or_else(|_| context.to_string());
            self.plain(&pretty);
            self.newline();
        }

        let expected = error.context().and_then(|c| c.get("expected"));
        let actual = report
            .exchange
            .response
            .as_ref()
            .and_then(|r| serde_json::from_str::<Value>(&r.body).ok());
        if let (Some(expected), Some(actual)) = (expected, actual) {
            self.separator();
            self.bold("EXPECTED (-) / ACTUAL (+)");
            self.newline();
            self.body_diff(expected, &actual);
        }
        self.newline();
    }

    /// Line diff of two pretty-printed JSON values.
    fn body_diff(&mut self, expected: &Value, actual: &Value) {
        let pretty = |v: &Value| serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string());
        let changeset = Changeset::new(&pretty(expected), &pretty(actual), "\n");
        for diff in &changeset.diffs {
            let (sign, color, text) = match diff {
                Difference::Same(x) => (' ', None, x),
                Difference::Add(x) => ('+', Some(Color::Green), x),
                Difference::Rem(x) => ('-', Some(Color::Red), x),
            };
            for line in text.lines() {
                self.paint(ColorSpec::new().set_fg(color), &format!("{sign}{line}"));
                self.newline();
            }
        }
    }

    /// Resolved order of suites and cases, for `restsuite list`.
    pub fn suite_listing(&mut self, suites: &[TestSuite]) {
        for suite in suites {
            self.bold(&suite.name);
            if !suite.depends_on.is_empty() {
                self.dim(&format!("  (depends: {})", suite.depends_on.join(", ")));
            }
            self.newline();
            self.dim(&format!("  {}", suite.path.display()));
            self.newline();
            if !suite.has_cases() {
                self.paint(&Level::Warn.color(), "  [WARN] no test cases");
                self.newline();
            }
            for case in &suite.cases {
                self.plain(&format!("  - {}", case.name));
                if let Some(description) = &case.description {
                    self.dim(&format!(" # {description}"));
                }
                if !case.depends_on.is_empty() {
                    self.dim(&format!("  (depends: {})", case.depends_on.join(", ")));
                }
                self.newline();
            }
        }
    }
}

/// `0.0123s` below a minute, `2m 3.50s` above.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 60.0 {
        return format!("{secs:.4}s");
    }
    let minutes = (secs / 60.0).floor();
    format!("{}m {:.2}s", minutes as u64, secs - minutes * 60.0)
}
