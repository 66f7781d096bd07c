//! Run configuration.
//!
//! Defaults, optionally overlaid by a YAML file (`restsuite.yaml`), then by
//! command-line flags.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use termcolor::ColorChoice;

use crate::errors::{RestSuiteError, Result};

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "restsuite.yaml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Root namespace prefixed to every suite name.
    pub namespace: String,
    /// Directory scanned for suite files.
    pub directory: PathBuf,
    /// Base URL for suites that do not set their own.
    pub base_url: Option<String>,
    /// Headers sent with every request; suites may override them.
    pub headers: BTreeMap<String, String>,
    pub timeout_secs: Option<u64>,
    /// Dump every exchange, not only the failing one.
    pub debug: bool,
    #[serde(skip)]
    pub use_colors: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            directory: PathBuf::from("tests/api"),
            base_url: None,
            headers: BTreeMap::new(),
            timeout_secs: None,
            debug: false,
            use_colors: atty::is(atty::Stream::Stdout),
        }
    }
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| RestSuiteError::load(path, e))?;
        Self::from_yaml(path, &content)
    }

    pub fn from_yaml(path: &Path, content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: RunConfig =
            serde_yaml::from_str(content).map_err(|e| RestSuiteError::load(path, e))?;

        config.headers = std::mem::take(&mut config.headers)
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();

        // relative suite directories are relative to the config file
        if config.directory.is_relative() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                config.directory = parent.join(&config.directory);
            }
        }
        Ok(config)
    }

    /// Loads `path` if given, else the default file when present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Layers `headers` over the configured ones. Names are case-insensitive
    /// and kept lowercased, so a later layer always replaces an earlier one.
    pub fn add_headers<I>(&mut self, headers: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in headers {
            self.headers.insert(name.to_ascii_lowercase(), value);
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn color_choice(&self) -> ColorChoice {
        if self.use_colors {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        }
    }
}
