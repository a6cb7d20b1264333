//! Outcome of a mapping run

use super::context::Properties;
use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Category of a recovered per-field problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    TransformerFailed,
    WriteFailed,
    MultiplicityMismatch,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::TransformerFailed => write!(f, "transformer_failed"),
            WarningKind::WriteFailed => write!(f, "write_failed"),
            WarningKind::MultiplicityMismatch => write!(f, "multiplicity_mismatch"),
        }
    }
}

/// A recovered problem attributed to one field mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingWarning {
    pub source: String,
    pub destination: String,
    pub kind: WarningKind,
    pub message: String,
}

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingStats {
    /// Mappings that resolved and wrote (or were resolve-only)
    pub mappings_applied: usize,
    /// Mappings that resolved nothing or wrote nothing
    pub mappings_skipped: usize,
    /// Individual successful writes
    pub values_written: usize,
}

/// Result of one mapping engine run, annotated by behaviors on the way out
#[derive(Debug, Clone, Default, Serialize)]
pub struct MappingResult {
    pub is_success: bool,
    pub error_message: Option<String>,
    /// Underlying failure, when the run failed because of an error
    #[serde(skip)]
    pub cause: Option<Arc<Error>>,
    pub properties: Properties,
    pub warnings: Vec<MappingWarning>,
    pub stats: MappingStats,
}

impl MappingResult {
    pub fn success() -> Self {
        Self {
            is_success: true,
            ..Default::default()
        }
    }

    /// A failed result; the message is never empty
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            "Mapping failed".to_string()
        } else {
            message
        };
        Self {
            is_success: false,
            error_message: Some(message),
            ..Default::default()
        }
    }

    /// A failed result carrying its cause
    pub fn from_error(error: Error) -> Self {
        let mut result = Self::failure(error.to_string());
        result.cause = Some(Arc::new(error));
        result
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub(crate) fn warn(
        &mut self,
        source: impl fmt::Display,
        destination: Option<impl fmt::Display>,
        kind: WarningKind,
        message: impl Into<String>,
    ) {
        self.warnings.push(MappingWarning {
            source: source.to_string(),
            destination: destination.map(|d| d.to_string()).unwrap_or_default(),
            kind,
            message: message.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_always_has_message() {
        let result = MappingResult::failure("");
        assert!(!result.is_success);
        assert_eq!(result.error_message.as_deref(), Some("Mapping failed"));

        let result = MappingResult::from_error(Error::validation("source", "missing"));
        assert!(result.error_message.unwrap().contains("missing"));
        assert!(result.cause.is_some());
    }

    #[test]
    fn test_warnings_are_counted() {
        let mut result = MappingResult::success();
        result.warn("$.a", Some("/R/A"), WarningKind::WriteFailed, "conflict");
        result.warn("$.b", None::<&str>, WarningKind::TransformerFailed, "boom");
        assert_eq!(result.warning_count(), 2);
        assert_eq!(result.warnings[1].destination, "");
    }

    #[test]
    fn test_serializes_without_cause() {
        let result = MappingResult::from_error(Error::configuration("bad")).with_property("k", 1);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["is_success"], false);
        assert_eq!(json["properties"]["k"], 1);
        assert!(json.get("cause").is_none());
    }
}
