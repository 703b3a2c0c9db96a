//! Error types for Trueno-Registry
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

use crate::artifact::ArtifactError;
use crate::experiment::RunStatus;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trueno-Registry error types
#[derive(Error, Debug)]
pub enum Error {
    /// Missing key or entity (recoverable, callers branch on it)
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of thing that was looked up ("experiment", "run", "params", ...)
        entity: &'static str,
        /// Key, name or id that was not found
        key: String,
    },

    /// Log kind string outside {params, metrics, datasets}
    #[error("Unknown log kind: {0:?}\nExpected one of \"params\", \"metrics\", \"datasets\"")]
    UnknownKind(String),

    /// Dataset artifact could not be resolved to a durable URI
    #[error("Artifact resolution failed: {0}")]
    ArtifactResolution(#[from] ArtifactError),

    /// Mutation attempted on a run that has already been finalized
    #[error("Run {run_id} is closed (status {status:?})\nLogs can only be written while the run is RUNNING")]
    RunClosed {
        /// Finalized run
        run_id: String,
        /// Terminal status of the run
        status: RunStatus,
    },

    /// Query selector was malformed (both or neither selector given)
    #[error("Ambiguous query: {0}")]
    AmbiguousQuery(String),

    /// Next-page token could not be decoded
    #[error("Invalid page token: {0:?}")]
    InvalidPageToken(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Whether this error is a `NotFound` signal.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}
