//! Error types for the scan pipeline.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Classification of oracle failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OracleErrorKind {
    /// Missing credentials or unusable settings.
    InvalidConfig,
    /// Network failure, timeout, or retries exhausted.
    Transport,
    /// Non-success status returned by the service.
    Api,
    /// A structured response that does not match its schema.
    Schema,
    /// The conversation finished without any structured result.
    NoStructuredOutput,
    /// The agent loop hit its turn budget.
    TurnLimit,
}

impl fmt::Display for OracleErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OracleErrorKind::InvalidConfig => "invalid_config",
            OracleErrorKind::Transport => "transport",
            OracleErrorKind::Api => "api",
            OracleErrorKind::Schema => "schema",
            OracleErrorKind::NoStructuredOutput => "no_structured_output",
            OracleErrorKind::TurnLimit => "turn_limit",
        };
        f.write_str(name)
    }
}

/// Failure reported by an [`crate::Oracle`] implementation.
#[derive(Debug, Clone, Error)]
#[error("oracle {kind} error: {message}")]
pub struct OracleError {
    pub kind: OracleErrorKind,
    pub message: String,
}

impl OracleError {
    pub fn new(kind: OracleErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(OracleErrorKind::InvalidConfig, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(OracleErrorKind::Transport, message)
    }

    pub fn no_structured_output(message: impl Into<String>) -> Self {
        Self::new(OracleErrorKind::NoStructuredOutput, message)
    }
}

impl From<SchemaError> for OracleError {
    fn from(err: SchemaError) -> Self {
        OracleError::new(OracleErrorKind::Schema, err.to_string())
    }
}

/// Structured response that failed validation.
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    #[error("{what} does not match schema: {reason}")]
    Mismatch { what: &'static str, reason: String },

    #[error("{what} is not a JSON object")]
    NotAnObject { what: &'static str },
}

/// Top-level error for scan operations.
#[derive(Debug, Error)]
pub enum SemkonError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("invalid ignore pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("{location}: {source}")]
    Oracle {
        location: String,
        #[source]
        source: OracleError,
    },

    #[error("worker task failed: {0}")]
    Join(String),
}

impl SemkonError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SemkonError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn oracle(location: impl fmt::Display, source: OracleError) -> Self {
        SemkonError::Oracle {
            location: location.to_string(),
            source,
        }
    }
}

/// Result type for scan operations.
pub type SemkonResult<T> = Result<T, SemkonError>;

/// Result type for oracle calls.
pub type OracleResult<T> = Result<T, OracleError>;
