pub use crate::errors::{RestSuiteError, Result};

pub mod assertion;
pub mod cli;
pub mod compare;
pub mod config;
pub mod context;
pub mod definition;
pub mod discovery;
pub mod errors;
pub mod http;
pub mod ids;
pub mod metadata;
pub mod report;
pub mod runner;
pub mod sorter;
pub mod suite;
pub mod template;
