//! Destination writing with auto-vivification
//!
//! A [`DestinationPath`] addresses a single location in the destination
//! document. Writing creates every missing intermediate node, pads arrays and
//! sibling lists as needed, and replaces whatever leaf value was there before,
//! so repeating a write leaves the document unchanged.

mod element;
mod tree;


use crate::document::Document;
use crate::path::tree::Segment;
use crate::path::{ElementPath, PathError, TreePath};
use std::fmt;
use thiserror::Error;

/// Largest array index or 0-based sibling position a write may target.
///
/// Writes pad up to their target, so an unbounded index would allocate
/// without limit. Explicit indexes above it are rejected when the path is
/// parsed; repeat indexes above it fail the write with a conflict.
pub const MAX_WRITE_INDEX: usize = 65_535;

/// Errors raised when a destination cannot be materialized
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WriteError {
    /// First element step does not name the destination root
    #[error("Destination path '{path}' starts at '{expected}' but the document root is '{actual}'")]
    RootMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// An existing node has the wrong shape for the path
    #[error("Cannot write '{path}': {reason}")]
    Conflict { path: String, reason: String },

    /// Dialect and document encoding disagree
    #[error("Destination path '{path}' cannot be written into a {format} document")]
    IncompatibleDocument { path: String, format: String },
}

impl WriteError {
    pub(crate) fn conflict(path: impl Into<String>, reason: impl Into<String>) -> Self {
        WriteError::Conflict {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A compiled destination path
#[derive(Debug, Clone, PartialEq)]
pub enum DestinationPath {
    Tree(TreePath),
    Element(ElementPath),
}

impl DestinationPath {
    /// Parse a destination, rejecting constructs that cannot address a single node
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }
        if trimmed.starts_with("$$") {
            return Err(PathError::not_writable("static reference", trimmed));
        }
        let path = if trimmed.starts_with('$') {
            DestinationPath::Tree(TreePath::parse_destination(trimmed)?)
        } else if trimmed.starts_with('/') {
            DestinationPath::Element(ElementPath::parse_destination(trimmed)?)
        } else {
            return Err(PathError::UnknownDialect {
                input: trimmed.to_string(),
            });
        };

        if let Some(index) = path.largest_index().filter(|index| *index > MAX_WRITE_INDEX) {
            return Err(PathError::not_writable(
                format!("index {} (the maximum is {})", index, MAX_WRITE_INDEX),
                trimmed,
            ));
        }
        Ok(path)
    }

    /// Largest explicit 0-based index or position the path addresses
    fn largest_index(&self) -> Option<usize> {
        match self {
            DestinationPath::Tree(path) => path
                .segments()
                .iter()
                .filter_map(|segment| match segment {
                    Segment::Index(index) => Some(usize::try_from(*index).unwrap_or(usize::MAX)),
                    _ => None,
                })
                .max(),
            DestinationPath::Element(path) => path
                .steps()
                .iter()
                .filter_map(|step| step.position.map(|p| p - 1))
                .max(),
        }
    }

    /// Whether the path carries an explicit repeat marker
    pub fn has_repeat(&self) -> bool {
        match self {
            DestinationPath::Tree(path) => path.has_repeat(),
            DestinationPath::Element(path) => path.has_repeat(),
        }
    }

    /// Element destinations append a repeated element when the source is multi-valued
    pub fn appends_implicitly(&self) -> bool {
        matches!(self, DestinationPath::Element(_))
    }

    /// Write one value.
    ///
    /// `repeat_index` selects the slot for repeated writes. It replaces each
    /// repeat marker. Element paths without a marker repeat one element
    /// instead: the owner of a final `@attr`, otherwise the parent of the
    /// text leaf, or the leaf itself when it is a direct child of the root.
    /// So `/R/Item/Id` yields one `Item` per value and `/R/Tag` one `Tag`.
    /// `None` writes the single, non-repeated slot.
    pub fn write(
        &self,
        doc: &mut Document,
        value: Option<&str>,
        repeat_index: Option<usize>,
    ) -> Result<(), WriteError> {
        match (self, doc) {
            (DestinationPath::Tree(path), Document::Json(root)) => {
                tree::write(path, root, value, repeat_index)
            }
            (DestinationPath::Element(path), Document::Xml(root)) => {
                element::write(path, root, value, repeat_index)
            }
            (path, doc) => Err(WriteError::IncompatibleDocument {
                path: path.to_string(),
                format: doc.format().to_string(),
            }),
        }
    }
}

impl fmt::Display for DestinationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestinationPath::Tree(path) => write!(f, "{}", path),
            DestinationPath::Element(path) => write!(f, "{}", path),
        }
    }
}
