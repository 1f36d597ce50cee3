//! CLI support for aiol-lang
//!
//! Provides programmatic access to the `aiol` command so other tools can
//! run scripts against a catalog file the same way the binary does.

mod catalog;
mod check;

pub use catalog::CatalogHost;
pub use check::{CheckOptions, CheckResult, execute_check};

use std::io;

use thiserror::Error;

use crate::host::HostError;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    /// Parse diagnostics found in syntax-only mode
    #[error("{} syntax error(s):\n{}", .0.len(), .0.join("\n"))]
    Syntax(Vec<String>),

    /// Bindings JSON could not be parsed
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Bindings JSON was not an object
    #[error("Bindings must be a JSON object")]
    BindingsNotObject,

    /// A catalog line could not be read as a record
    #[error("Catalog line {line}: {source}")]
    Catalog { line: usize, source: HostError },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// No script provided
    #[error("No script provided. Pass one as an argument or pipe it to stdin.")]
    NoScript,
}
