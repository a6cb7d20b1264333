//! Error types for the Gatemap core library
//!
//! This module defines the error handling system for Gatemap, using
//! thiserror for ergonomic error definitions and anyhow for opaque causes.
//! Layer-specific errors (paths, writes, transformers) live next to the code
//! that raises them and convert into [`Error`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::path::PathError;
use crate::transform::TransformError;
use crate::writer::WriteError;

/// Main error type for Gatemap operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (missing mappings, malformed integration definitions)
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Validation errors raised by behaviors or input checks
    #[error("Validation error: {field} - {message}")]
    Validation {
        field: String,
        message: String,
    },

    /// Malformed path expressions, raised when mappings are compiled
    #[error("Path error in '{path}': {source}")]
    Path {
        path: String,
        #[source]
        source: PathError,
    },

    /// Source or destination document could not be parsed or rendered
    #[error("Document error ({format}): {message}")]
    Document {
        format: String,
        message: String,
    },

    /// Destination path could not be materialized
    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    /// A transformer failed outside of a recovering chain
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// A behavior in the pipeline failed
    #[error("Behavior '{behavior}' failed: {message}")]
    Behavior {
        behavior: String,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The request was cancelled before it could complete
    #[error("Operation cancelled: {operation}")]
    Cancelled {
        operation: String,
    },

    /// HTTP/Network related errors from transport adapters
    #[error("HTTP error: {message}")]
    Http {
        message: String,
        status_code: Option<u16>,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Severity levels for errors and warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Informational, no action required
    Info,
    /// Warning, should be reviewed
    Warning,
    /// Error, operation may fail
    Error,
    /// Critical, operation will fail
    Critical,
}

impl Error {
    /// Create a configuration error without an underlying cause
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a validation error for a named field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a behavior failure
    pub fn behavior(behavior: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Behavior {
            behavior: behavior.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a cancellation error for the named operation
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Error::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a document error
    pub fn document(format: impl fmt::Display, message: impl Into<String>) -> Self {
        Error::Document {
            format: format.to_string(),
            message: message.into(),
        }
    }

    /// Whether this error represents cancellation rather than failure.
    ///
    /// Callers use this to avoid logging cancelled requests as application errors.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    /// Severity used when the error is surfaced in logs or results
    pub fn severity(&self) -> Severity {
        match self {
            Error::Cancelled { .. } => Severity::Info,
            Error::Write(_) | Error::Transform(_) => Severity::Warning,
            Error::Validation { .. } | Error::Behavior { .. } | Error::Http { .. } => Severity::Error,
            Error::Configuration { .. }
            | Error::Path { .. }
            | Error::Document { .. }
            | Error::Json { .. }
            | Error::Io { .. }
            | Error::Internal { .. } => Severity::Critical,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::configuration("no mappings supplied");
        assert_eq!(err.to_string(), "Configuration error: no mappings supplied");
    }

    #[test]
    fn test_cancellation_is_distinguishable() {
        let err = Error::cancelled("token refresh");
        assert!(err.is_cancelled());
        assert_eq!(err.severity(), Severity::Info);

        let err = Error::behavior("auth", "token endpoint returned 500");
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: Error = anyhow::anyhow!("boom").into();
        assert!(matches!(err, Error::Internal { .. }));
        assert!(err.to_string().contains("boom"));
    }
}
