//! Defines the command-line arguments and subcommands for the Restsuite CLI.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "restsuite",
    version,
    about = "Declarative, dependency-ordered black-box tests for REST APIs."
)]
pub struct RestSuiteArgs {
    /// Log discovery and HTTP traffic to stderr (overridden by RESTSUITE_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Discover, order and run every test suite in a directory.
    Run {
        #[command(flatten)]
        discovery: DiscoveryArgs,

        /// Base URL for suites that do not configure their own client.
        #[arg(long)]
        base_url: Option<String>,

        /// Extra request header, as `Name: value`. Repeatable.
        #[arg(long = "header", value_name = "NAME:VALUE", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// Request timeout in seconds.
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Print every request and response, and the error source chain.
        #[arg(long)]
        debug: bool,

        /// Disable colored output.
        #[arg(long)]
        no_color: bool,
    },
    /// Discover test suites and print them in run order.
    List {
        #[command(flatten)]
        discovery: DiscoveryArgs,
    },
}

/// Options shared by every command that discovers suites.
#[derive(Debug, Args)]
pub struct DiscoveryArgs {
    /// The directory containing the test suites.
    pub directory: Option<PathBuf>,

    /// Root namespace prefixed to every suite name.
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// YAML config file (defaults to ./restsuite.yaml when present).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("invalid header \"{raw}\", expected NAME:VALUE"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid header \"{raw}\", name is empty"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
