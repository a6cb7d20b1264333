//! Error types and handling for the CLI
//!
//! This module provides error types and utilities for handling
//! various failure modes in the CLI application.

use std::io;
use std::path::PathBuf;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error from gatemap-core
    #[error("{0}")]
    Core(#[from] gatemap_core::Error),

    /// File not found
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Invalid file format
    #[error("Invalid file format for {}: expected {}", path.display(), expected)]
    InvalidFormat { path: PathBuf, expected: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Integration definition failed validation
    #[error("Integration '{}' has {} invalid mapping(s)", name, count)]
    InvalidIntegration { name: String, count: usize },

    /// The mapping run completed but reported failure
    #[error("Mapping failed: {0}")]
    MappingFailed(String),

    /// Downstream rejected the document
    #[error("Downstream returned status {}", status)]
    Rejected { status: u16 },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error with context
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a generic error with message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(anyhow::anyhow!(message.into()))
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::Core(gatemap_core::Error::Cancelled { .. }) => 130,
            Self::Core(_) => 2,
            Self::FileNotFound { .. } => 3,
            Self::InvalidFormat { .. } => 4,
            Self::Config(_) => 5,
            Self::InvalidIntegration { .. } => 6,
            Self::MappingFailed(_) => 7,
            Self::Rejected { .. } => 8,
            Self::Json(_) => 12,
            Self::Yaml(_) => 13,
            Self::Other(_) => 99,
        }
    }

    /// Check if this error should display usage help
    pub fn should_show_help(&self) -> bool {
        matches!(self, Self::FileNotFound { .. })
    }
}

/// Format an error for display to the user
pub fn format_error(error: &Error, use_color: bool) -> String {
    let mut message = error.to_string();
    if let Error::Other(inner) = error {
        for cause in inner.chain().skip(1) {
            message.push_str(&format!("\n  caused by: {}", cause));
        }
    }

    if use_color {
        use colored::Colorize;
        format!("{} {}", "Error:".red().bold(), message)
    } else {
        format!("Error: {}", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_for_user_errors() {
        let not_found = Error::FileNotFound { path: PathBuf::from("crm.yaml") };
        let invalid = Error::InvalidIntegration { name: "crm".to_string(), count: 2 };
        assert_eq!(not_found.exit_code(), 3);
        assert_eq!(invalid.exit_code(), 6);
        assert!(not_found.should_show_help());
    }

    #[test]
    fn test_cancelled_core_error_maps_to_interrupt_code() {
        let err = Error::from(gatemap_core::Error::cancelled("mapping"));
        assert_eq!(err.exit_code(), 130);
    }

    #[test]
    fn test_format_error_without_color() {
        let err = Error::config("missing auth.client_id");
        assert_eq!(
            format_error(&err, false),
            "Error: Configuration error: missing auth.client_id"
        );
    }

    #[test]
    fn test_format_error_includes_anyhow_causes() {
        let inner = anyhow::anyhow!("connection refused").context("token request failed");
        let formatted = format_error(&Error::Other(inner), false);
        assert!(formatted.starts_with("Error: token request failed"));
        assert!(formatted.contains("caused by: connection refused"));
    }
}
