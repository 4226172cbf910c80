//! Harness error types.

use thiserror::Error;

/// Harness errors.
///
/// Each variant names the phase it came from. The runner treats
/// [`Error::Execution`] as a per-iteration outcome; the rest end a scenario
/// (or, for [`Error::ReportMismatch`], the whole run).
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed DSN or unreachable database.
    #[error("connection error: {0}")]
    Connection(String),

    /// Statement preparation failed before timing started.
    #[error("prepare error: {0}")]
    Prepare(String),

    /// A single execution failed.
    #[error("execution error: {0}")]
    Execution(String),

    /// Two strategies disagreed on the row count of the same query.
    #[error(
        "row count mismatch for {query}: {left} returned {left_rows} rows, {right} returned {right_rows}"
    )]
    ReportMismatch {
        query: String,
        left: String,
        left_rows: u64,
        right: String,
        right_rows: u64,
    },

    /// Invalid harness configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error ends the scenario it occurred in.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Execution(_))
    }
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, Error>;
