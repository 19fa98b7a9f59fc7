//! Error taxonomy for the release pipeline.
//!
//! Components return [`Error`] at their boundaries. Lower-level helpers
//! (process invocation, tree copies) use `anyhow` and are mapped into one of
//! these variants by the component that called them.

use std::fmt;

/// Pipeline stage that a packaging error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Tar,
    Rpm,
    Deb,
    Gppkg,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Tar => "tar",
            Format::Rpm => "rpm",
            Format::Deb => "deb",
            Format::Gppkg => "gppkg",
        };
        f.write_str(name)
    }
}

/// Errors produced by the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Platform facts could not be determined. Nothing has been written.
    #[error("environment error: {0}")]
    Environment(String),

    /// A module or package format was intentionally omitted. Not a failure.
    #[error("{gate} skipped: {reason}")]
    GateSkipped { gate: String, reason: String },

    /// A module collaborator reported failure for one of its operations.
    #[error("module '{module}' failed to {operation}: {message}")]
    ModuleOperation {
        module: String,
        operation: String,
        message: String,
    },

    /// The staged tree could not be assembled.
    #[error("staging failed: {0}")]
    Staging(String),

    /// A single packaging backend failed.
    #[error("{format} packaging failed: {message}")]
    Packaging { format: Format, message: String },
}

impl Error {
    /// Returns true for the informational gate-skip case.
    pub fn is_gate_skip(&self) -> bool {
        matches!(self, Error::GateSkipped { .. })
    }

    pub(crate) fn staging(err: impl fmt::Display) -> Self {
        Error::Staging(err.to_string())
    }

    pub(crate) fn packaging(format: Format, err: anyhow::Error) -> Self {
        Error::Packaging {
            format,
            message: format!("{:#}", err),
        }
    }
}

/// Result alias used by every pipeline component.
pub type Result<T> = std::result::Result<T, Error>;
