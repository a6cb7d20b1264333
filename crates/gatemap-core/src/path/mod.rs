//! Source path resolution
//!
//! A source path is parsed once, when an integration is loaded, into one of
//! three dialects chosen by prefix:
//!
//! | Prefix | Dialect |
//! |--------|---------|
//! | `$$`   | static reference looked up in [`StaticValues`] |
//! | `$`    | tree navigation over JSON documents ([`TreePath`]) |
//! | `/`    | hierarchical elements over XML documents ([`ElementPath`]) |
//!
//! Resolution never fails: a dialect that does not fit the document, a
//! missing document or a path that walks off the tree all yield no values.

pub mod element;
pub mod error;
pub mod statics;
pub mod tree;

pub use element::ElementPath;
pub use error::PathError;
pub use statics::StaticValues;
pub use tree::TreePath;

use crate::document::Document;
use std::fmt;

/// Values produced by resolving a source path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Textual values in document order; `None` stands for an explicit null
    pub values: Vec<Option<String>>,
    /// Whether the path is array-producing (by shape or by match count)
    pub multi: bool,
}

impl Resolution {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn single(value: Option<String>) -> Self {
        Self {
            values: vec![value],
            multi: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// A compiled source path
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePath {
    Tree(TreePath),
    Element(ElementPath),
    Static(String),
}

impl SourcePath {
    /// Parse and select the dialect by prefix
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }

        if let Some(key) = trimmed.strip_prefix("$$") {
            if key.trim().is_empty() {
                return Err(PathError::parse("Static reference needs a key", 2, trimmed));
            }
            return Ok(SourcePath::Static(key.trim().to_string()));
        }
        if trimmed.starts_with('$') {
            return TreePath::parse(trimmed).map(SourcePath::Tree);
        }
        if trimmed.starts_with('/') {
            return ElementPath::parse(trimmed).map(SourcePath::Element);
        }

        Err(PathError::UnknownDialect {
            input: trimmed.to_string(),
        })
    }

    /// Resolve against an optional source document and the static values
    pub fn resolve(&self, source: Option<&Document>, statics: &StaticValues) -> Resolution {
        match (self, source) {
            (SourcePath::Static(key), _) => statics
                .resolve(key)
                .map(|value| Resolution::single(Some(value.to_string())))
                .unwrap_or_default(),
            (SourcePath::Tree(path), Some(Document::Json(root))) => path.resolve(root),
            (SourcePath::Element(path), Some(Document::Xml(root))) => path.resolve(root),
            _ => Resolution::none(),
        }
    }

    /// Whether a document is needed to resolve this path
    pub fn needs_document(&self) -> bool {
        !matches!(self, SourcePath::Static(_))
    }

    /// Whether the path is array-producing by shape
    pub fn is_multi(&self) -> bool {
        match self {
            SourcePath::Tree(path) => path.is_multi(),
            SourcePath::Element(path) => path.is_multi(),
            SourcePath::Static(_) => false,
        }
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourcePath::Tree(path) => write!(f, "{}", path),
            SourcePath::Element(path) => write!(f, "{}", path),
            SourcePath::Static(key) => write!(f, "$${}", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::XmlElement;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_dialect_selection() {
        assert!(matches!(SourcePath::parse("$$Country"), Ok(SourcePath::Static(k)) if k == "Country"));
        assert!(matches!(SourcePath::parse("$.a"), Ok(SourcePath::Tree(_))));
        assert!(matches!(SourcePath::parse("/a/b"), Ok(SourcePath::Element(_))));
        assert!(matches!(
            SourcePath::parse("Customer.Name"),
            Err(PathError::UnknownDialect { .. })
        ));
        assert!(SourcePath::parse("$$").is_err());
        assert!(matches!(SourcePath::parse("  "), Err(PathError::Empty)));
    }

    #[test]
    fn test_dialect_mismatch_is_no_match() {
        let statics = StaticValues::default();
        let json = Document::Json(json!({"a": "1"}));
        let xml = Document::Xml(XmlElement::parse("<a>1</a>").unwrap());

        let tree = SourcePath::parse("$.a").unwrap();
        let element = SourcePath::parse("/a").unwrap();

        assert_eq!(tree.resolve(Some(&json), &statics).values, vec![Some("1".to_string())]);
        assert!(tree.resolve(Some(&xml), &statics).is_empty());
        assert_eq!(element.resolve(Some(&xml), &statics).values, vec![Some("1".to_string())]);
        assert!(element.resolve(Some(&json), &statics).is_empty());
        assert!(tree.resolve(None, &statics).is_empty());
    }

    #[test]
    fn test_static_resolution_without_document() {
        let statics = StaticValues::new(
            HashMap::from([("Country".to_string(), "US".to_string())]),
            Default::default(),
        );
        let path = SourcePath::parse("$$Country").unwrap();
        assert!(!path.needs_document());
        assert_eq!(path.resolve(None, &statics), Resolution::single(Some("US".to_string())));
        assert!(SourcePath::parse("$$Other").unwrap().resolve(None, &statics).is_empty());
        assert_eq!(path.to_string(), "$$Country");
    }
}
