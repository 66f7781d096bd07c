//! The Restsuite Command-Line Interface.
//!
//! Parses arguments, builds the run configuration and dispatches to the
//! runner. Errors that happen before a run starts (bad config file, failed
//! discovery for `list`) are rendered as miette diagnostics on stderr.

use std::process::ExitCode;

use clap::Parser;
use miette::Report;
use termcolor::StandardStream;
use tracing_subscriber::EnvFilter;

use crate::cli::args::{Command, DiscoveryArgs, RestSuiteArgs};
use crate::config::RunConfig;
use crate::errors::Result;
use crate::http::BlockingTransport;
use crate::runner::{self, Runner};

pub mod args;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "RESTSUITE_LOG";

/// The main entry point for the CLI.
pub fn run() -> ExitCode {
    let args = RestSuiteArgs::parse();
    init_logging(args.verbose);

    let result = match args.command {
        Command::Run {
            discovery,
            base_url,
            headers,
            timeout,
            debug,
            no_color,
        } => load_config(&discovery).and_then(|mut config| {
            if base_url.is_some() {
                config.base_url = base_url;
            }
            config.add_headers(headers);
            if timeout.is_some() {
                config.timeout_secs = timeout;
            }
            config.debug |= debug;
            if no_color {
                config.use_colors = false;
            }
            handle_run(config)
        }),
        Command::List { discovery } => load_config(&discovery).and_then(handle_list),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{:?}", Report::new(e));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(discovery: &DiscoveryArgs) -> Result<RunConfig> {
    let mut config = RunConfig::load(discovery.config.as_deref())?;
    if let Some(directory) = &discovery.directory {
        config.directory = directory.clone();
    }
    if let Some(namespace) = &discovery.namespace {
        config.namespace = namespace.clone();
    }
    Ok(config)
}

fn handle_run(config: RunConfig) -> Result<ExitCode> {
    let transport = BlockingTransport::new(config.timeout())?;
    let stdout = StandardStream::stdout(config.color_choice());
    let mut runner = Runner::new(config, Box::new(transport), stdout);
    Ok(runner.run().exit_code())
}

fn handle_list(config: RunConfig) -> Result<ExitCode> {
    runner::list(&config, StandardStream::stdout(config.color_choice()))?;
    Ok(ExitCode::SUCCESS)
}
