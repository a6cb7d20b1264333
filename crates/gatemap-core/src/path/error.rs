//! Error types for path parsing
//!
//! Paths are compiled when an integration is loaded, so every error here is a
//! load-time error carrying the offending input and a byte position.

use thiserror::Error;

/// Errors raised while parsing source or destination paths
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    /// Empty path expression
    #[error("Empty path expression")]
    Empty,

    /// The prefix does not select any known dialect
    #[error("Unknown path dialect for '{input}': expected '$', '$$' or '/'")]
    UnknownDialect { input: String },

    /// Generic parse error
    #[error("Parse error at position {position}: {message}")]
    Parse {
        message: String,
        position: usize,
        input: String,
    },

    /// Syntax error with expected/found tokens
    #[error("Syntax error at position {position}: {message} (expected {}, found '{found}')", expected.join(" or "))]
    Syntax {
        message: String,
        position: usize,
        input: String,
        expected: Vec<String>,
        found: String,
    },

    /// A construct that is valid for reading but cannot address a write target
    #[error("'{feature}' cannot be used in a destination path")]
    NotWritable { feature: String, input: String },
}

impl PathError {
    /// Create a parse error with position
    pub fn parse(message: impl Into<String>, position: usize, input: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            position,
            input: input.into(),
        }
    }

    /// Create a syntax error with expected and found tokens
    pub fn syntax(
        message: impl Into<String>,
        position: usize,
        input: impl Into<String>,
        expected: Vec<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::Syntax {
            message: message.into(),
            position,
            input: input.into(),
            expected,
            found: found.into(),
        }
    }

    pub fn not_writable(feature: impl Into<String>, input: impl Into<String>) -> Self {
        Self::NotWritable {
            feature: feature.into(),
            input: input.into(),
        }
    }

    /// The path expression that failed to parse
    pub fn input(&self) -> &str {
        match self {
            PathError::Empty => "",
            PathError::UnknownDialect { input }
            | PathError::Parse { input, .. }
            | PathError::Syntax { input, .. }
            | PathError::NotWritable { input, .. } => input,
        }
    }

    /// Byte offset of the failure, when known
    pub fn position(&self) -> Option<usize> {
        match self {
            PathError::Parse { position, .. } | PathError::Syntax { position, .. } => Some(*position),
            _ => None,
        }
    }
}

impl From<PathError> for crate::Error {
    fn from(err: PathError) -> Self {
        crate::Error::Path {
            path: err.input().to_string(),
            source: err,
        }
    }
}
