//! The run orchestrator.
//!
//! A run moves through `Discovering -> Running -> Reporting -> Done`. Any error
//! raised while discovering or running moves it to `Failed` instead: the
//! partial summary and the failure dump are printed and the run ends with a
//! non-zero exit code. There is no continue-on-failure.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use termcolor::WriteColor;
use tracing::{debug, info_span};

use crate::config::RunConfig;
use crate::context::{RunContext, RunCounters, RunState};
use crate::definition::StepDefinition;
use crate::discovery::SuiteDiscoverer;
use crate::errors::{RestSuiteError, Result};
use crate::http::{ClientConfig, HttpTransport};
use crate::ids::IdentifierStore;
use crate::report::{FailureReport, Reporter, TestLabel};
use crate::suite::{TestCase, TestSuite};
use crate::template;

const NO_CASES_WARNING: &str = "Test suite has no test cases (mark cases with test: true)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    Discovering,
    Running { suite: String, case: Option<String> },
    Reporting,
    Done,
    Failed,
}

/// The error that ended a run, with where it happened and the exchange in
/// flight at the time.
#[derive(Debug)]
pub struct RunFailure {
    pub error: RestSuiteError,
    pub suite: Option<(String, PathBuf)>,
    pub case: Option<String>,
    pub exchange: RunState,
}

#[derive(Debug)]
pub enum RunOutcome {
    Passed(RunCounters),
    Failed(RunCounters, Box<RunFailure>),
}

impl RunOutcome {
    pub fn counters(&self) -> &RunCounters {
        match self {
            RunOutcome::Passed(counters) | RunOutcome::Failed(counters, _) => counters,
        }
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        match self {
            RunOutcome::Passed(_) => None,
            RunOutcome::Failed(_, failure) => Some(failure),
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            RunOutcome::Passed(_) => ExitCode::SUCCESS,
            RunOutcome::Failed(..) => ExitCode::FAILURE,
        }
    }
}

/// What is executing right now, for the failure dump.
#[derive(Debug, Default)]
struct Cursor {
    suite: Option<(String, PathBuf)>,
    case: Option<(u64, TestCase)>,
}

pub struct Runner<W> {
    config: RunConfig,
    ctx: RunContext,
    reporter: Reporter<W>,
    phase: RunPhase,
    cursor: Cursor,
}

impl<W: WriteColor> Runner<W> {
    pub fn new(config: RunConfig, transport: Box<dyn HttpTransport>, out: W) -> Self {
        Self {
            config,
            ctx: RunContext::new(transport),
            reporter: Reporter::new(out),
            phase: RunPhase::Discovering,
            cursor: Cursor::default(),
        }
    }

    pub fn phase(&self) -> &RunPhase {
        &self.phase
    }

    pub fn into_output(self) -> W {
        self.reporter.into_inner()
    }

    /// Runs every discovered suite and reports the result.
    pub fn run(&mut self) -> RunOutcome {
        let timer = Instant::now();
        self.reporter.banner(
            &self.config.namespace,
            &self.config.directory,
            self.config.debug,
        );

        match self.execute() {
            Ok(()) => {
                self.phase = RunPhase::Reporting;
                self.reporter.summary(&self.ctx.counters, timer.elapsed());
                self.phase = RunPhase::Done;
                RunOutcome::Passed(self.ctx.counters.clone())
            }
            Err(error) => {
                self.phase = RunPhase::Failed;
                self.ctx.counters.errors += 1;
                debug!(error = %error, "run failed");
                let failure = self.failure(error);

                if let Some((suite, _)) = &self.cursor.suite {
                    let (id, case) = match &self.cursor.case {
                        Some((id, case)) => (Some(*id), Some(case)),
                        None => (None, None),
                    };
                    self.reporter.test_error(TestLabel {
                        id,
                        status: failure.exchange.response.as_ref().map(|r| r.status),
                        suite,
                        case,
                    });
                }
                self.reporter.summary(&self.ctx.counters, timer.elapsed());
                self.reporter.failure(
                    &FailureReport {
                        error: &failure.error,
                        suite: failure
                            .suite
                            .as_ref()
                            .map(|(name, path)| (name.as_str(), path.as_path())),
                        case: failure.case.as_deref(),
                        exchange: &failure.exchange,
                    },
                    self.config.debug,
                );
                RunOutcome::Failed(self.ctx.counters.clone(), Box::new(failure))
            }
        }
    }

    fn failure(&mut self, error: RestSuiteError) -> RunFailure {
        RunFailure {
            error,
            suite: self.cursor.suite.clone(),
            case: self.cursor.case.as_ref().map(|(_, case)| case.name.clone()),
            exchange: self.ctx.take_state(),
        }
    }

    fn execute(&mut self) -> Result<()> {
        self.phase = RunPhase::Discovering;
        let discoverer = SuiteDiscoverer::new(&self.config.namespace, &self.config.directory);
        let suites = discoverer.discover()?;
        if suites.is_empty() {
            return Err(RestSuiteError::config(format!(
                "No test suites found in directory \"{}\"",
                self.config.directory.display()
            )));
        }
        self.reporter.suites_found(suites.len());

        for suite in &suites {
            self.cursor = Cursor {
                suite: Some((suite.name.clone(), suite.path.clone())),
                case: None,
            };

            if !suite.has_cases() {
                self.ctx.counters.warnings += 1;
                self.reporter.warn(&suite.name, NO_CASES_WARNING);
                continue;
            }

            self.run_suite(suite)?;
        }
        Ok(())
    }

    fn run_suite(&mut self, suite: &TestSuite) -> Result<()> {
        let _span = info_span!("suite", name = %suite.name).entered();
        self.phase = RunPhase::Running {
            suite: suite.name.clone(),
            case: None,
        };
        self.instantiate(suite)?;

        for case in &suite.cases {
            let id = self.ctx.counters.begin_test();
            self.cursor.case = Some((id, case.clone()));
            self.phase = RunPhase::Running {
                suite: suite.name.clone(),
                case: Some(case.name.clone()),
            };

            let timer = Instant::now();
            debug!(case = %case.name, id, "running test case");
            for step in &case.steps {
                self.run_step(step)?;
            }
            self.ctx.counters.passed += 1;

            self.reporter.test_ok(
                TestLabel {
                    id: Some(id),
                    status: self.ctx.response_code(),
                    suite: &suite.name,
                    case: Some(case),
                },
                timer.elapsed(),
            );
            if self.config.debug {
                self.reporter.exchange(self.ctx.state(), "    ");
                self.reporter.separator();
            }
            self.ctx.reset_state();
        }
        self.cursor.case = None;
        Ok(())
    }

    /// Configures the suite's client and runs its setup steps.
    fn instantiate(&mut self, suite: &TestSuite) -> Result<()> {
        let suite_client = suite.client.as_ref();
        let base_url = suite_client
            .and_then(|c| c.base_url.clone())
            .or_else(|| self.config.base_url.clone());

        let client = base_url.map(|base_url| {
            let empty = BTreeMap::new();
            let suite_headers = suite_client.map(|c| &c.headers).unwrap_or(&empty);
            ClientConfig::new(base_url, [&self.config.headers, suite_headers])
        });
        self.ctx.set_client(client);

        for step in &suite.setup {
            self.run_step(step)?;
        }
        self.ctx.reset_state();
        Ok(())
    }

    /// Sends one request and checks its expectations in a fixed order:
    /// status, object, objects, count, body. Captures run last.
    fn run_step(&mut self, step: &StepDefinition) -> Result<()> {
        let ids = &mut self.ctx.ids;
        let path = template::render(&step.path, ids)?;
        let query = render_map(&step.query, ids)?;
        let headers = render_map(&step.headers, ids)?;
        let body = step
            .body
            .as_ref()
            .map(|body| template::render_value(body, ids))
            .transpose()?;

        self.ctx
            .fetch(step.method, &path, &query, body.as_ref(), &headers)?;

        let expect = &step.expect;
        let message = expect.message.as_deref();
        if let Some(status) = expect.status {
            self.ctx.expect_code(status, message)?;
        }
        if expect.object {
            self.ctx.expect_body_object(message)?;
        }
        if expect.objects {
            self.ctx.expect_body_objects(message)?;
        }
        if let Some(count) = expect.count {
            self.ctx.expect_body_count(count, message)?;
        }
        if let Some(expected) = &expect.body {
            let expected = template::render_value(expected, &mut self.ctx.ids)?;
            match &expect.sort_by {
                Some(field) => self.ctx.expect_body_same_sorted(&expected, field, message)?,
                None => self.ctx.expect_body_same(&expected, message)?,
            }
        }

        if let Some(name) = &step.capture {
            self.ctx.capture_ids(name)?;
        }
        Ok(())
    }
}

fn render_map(
    map: &BTreeMap<String, String>,
    ids: &mut IdentifierStore,
) -> Result<BTreeMap<String, String>> {
    map.iter()
        .map(|(key, value)| Ok((key.clone(), template::render(value, ids)?)))
        .collect()
}

/// Discovery only, printing the resolved order.
pub fn list<W: WriteColor>(config: &RunConfig, out: W) -> Result<W> {
    let suites = SuiteDiscoverer::new(&config.namespace, &config.directory).discover()?;
    let mut reporter = Reporter::new(out);
    reporter.suite_listing(&suites);
    Ok(reporter.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpRequest, HttpResponse};
    use std::fs;
    use termcolor::Buffer;

    struct Echo;

    impl HttpTransport for Echo {
        fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse> {
            Ok(HttpResponse {
                status: 200,
                body: serde_json::json!({"url": request.url}).to_string(),
            })
        }
    }

    fn config(dir: &std::path::Path) -> RunConfig {
        RunConfig {
            namespace: "Api".to_string(),
            directory: dir.to_path_buf(),
            base_url: Some("http://api.test".to_string()),
            use_colors: false,
            ..RunConfig::default()
        }
    }

    #[test]
    fn empty_directory_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = Runner::new(config(dir.path()), Box::new(Echo), Buffer::no_color());
        let outcome = runner.run();
        assert_eq!(runner.phase(), &RunPhase::Failed);
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.error.kind(), "ConfigurationError");
        assert!(failure.suite.is_none());
        assert_eq!(outcome.counters().errors, 1);
    }

    #[test]
    fn passing_run_reaches_done() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("PingTest.yaml"),
            "cases:\n  - name: ping\n    test: true\n    steps:\n      - path: /ping\n        expect: { status: 200, object: true, body: { url: \"$$VAR\" } }\n",
        )
        .unwrap();

        let mut runner = Runner::new(config(dir.path()), Box::new(Echo), Buffer::no_color());
        let outcome = runner.run();
        assert_eq!(runner.phase(), &RunPhase::Done);
        assert!(outcome.failure().is_none());
        let counters = outcome.counters();
        assert_eq!((counters.tests, counters.passed, counters.assertions), (1, 1, 3));

        let out = String::from_utf8(runner.into_output().into_inner()).unwrap();
        assert!(out.contains("001) 200 Api.PingTest::ping"), "{out}");
        assert!(out.contains("OK (Tests: 1, Assertions: 3)"), "{out}");
    }

    #[test]
    fn failure_records_the_running_case() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("PingTest.yaml"),
            "cases:\n  - name: ping\n    test: true\n    steps:\n      - { path: /ping, expect: { status: 404 } }\n",
        )
        .unwrap();

        let mut runner = Runner::new(config(dir.path()), Box::new(Echo), Buffer::no_color());
        let outcome = runner.run();
        let failure = outcome.failure().unwrap();
        assert!(failure.error.is_assertion());
        assert_eq!(failure.case.as_deref(), Some("ping"));
        assert_eq!(failure.suite.as_ref().map(|(n, _)| n.as_str()), Some("Api.PingTest"));
        assert_eq!(failure.exchange.response.as_ref().map(|r| r.status), Some(200));
        assert_eq!(outcome.counters().passed, 0);
        assert!(matches!(outcome, RunOutcome::Failed(..)));
    }
}
