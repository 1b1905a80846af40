//! Per-report error types. Startup and plumbing failures travel as `anyhow::Error`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The document is not well-formed XML.
    #[error("malformed report: {0}")]
    Malformed(String),

    /// A field required to reconcile the report is missing or empty.
    #[error("report is missing required field: {0}")]
    MissingField(&'static str),

    #[error("reading report {path}: {message}")]
    Io { path: String, message: String },
}

impl ParseError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}
