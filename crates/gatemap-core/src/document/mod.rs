//! Tree-encoded documents handled by the mapping engine
//!
//! The engine is generic over a closed set of encodings: object/array/scalar
//! trees (JSON) and element/attribute trees (XML). Each variant owns its tree;
//! parsing and rendering happen only at the process boundary.

pub mod xml;

pub use xml::{XmlElement, XmlError, XmlNode};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Supported tree encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Json,
    Xml,
}

impl DocumentFormat {
    /// MIME type used when a document of this format is sent downstream
    pub fn content_type(&self) -> &'static str {
        match self {
            DocumentFormat::Json => "application/json",
            DocumentFormat::Xml => "application/xml",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Json => write!(f, "json"),
            DocumentFormat::Xml => write!(f, "xml"),
        }
    }
}

impl FromStr for DocumentFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(DocumentFormat::Json),
            "xml" => Ok(DocumentFormat::Xml),
            other => Err(Error::configuration(format!(
                "Unknown document format '{}', expected 'json' or 'xml'",
                other
            ))),
        }
    }
}

/// A source or destination document
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Json(Value),
    Xml(XmlElement),
}

impl Document {
    /// Decode an inbound payload
    pub fn parse(format: DocumentFormat, input: &str) -> Result<Self> {
        match format {
            DocumentFormat::Json => Ok(Document::Json(serde_json::from_str(input)?)),
            DocumentFormat::Xml => XmlElement::parse(input)
                .map(Document::Xml)
                .map_err(|e| Error::document(format, e.to_string())),
        }
    }

    /// Create an empty destination seeded with a root node.
    ///
    /// Element documents need a root element name; object documents start as `{}`.
    pub fn empty(format: DocumentFormat, root: Option<&str>) -> Result<Self> {
        match format {
            DocumentFormat::Json => Ok(Document::Json(Value::Object(serde_json::Map::new()))),
            DocumentFormat::Xml => match root {
                Some(name) if !name.trim().is_empty() => Ok(Document::Xml(XmlElement::new(name.trim()))),
                _ => Err(Error::configuration(
                    "An XML destination needs a root element name",
                )),
            },
        }
    }

    /// Encoding of this document
    pub fn format(&self) -> DocumentFormat {
        match self {
            Document::Json(_) => DocumentFormat::Json,
            Document::Xml(_) => DocumentFormat::Xml,
        }
    }

    /// Encode the document for onward transport
    pub fn render(&self, pretty: bool) -> Result<String> {
        match self {
            Document::Json(value) if pretty => Ok(serde_json::to_string_pretty(value)?),
            Document::Json(value) => Ok(serde_json::to_string(value)?),
            Document::Xml(root) => Ok(root.to_xml_string(pretty)),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Document::Json(value) => Some(value),
            Document::Xml(_) => None,
        }
    }

    pub fn as_xml(&self) -> Option<&XmlElement> {
        match self {
            Document::Xml(root) => Some(root),
            Document::Json(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_and_xml() {
        let doc = Document::parse(DocumentFormat::Json, r#"{"a": 1}"#).unwrap();
        assert_eq!(doc.as_json(), Some(&json!({"a": 1})));
        assert_eq!(doc.format(), DocumentFormat::Json);

        let doc = Document::parse(DocumentFormat::Xml, "<a><b>1</b></a>").unwrap();
        assert_eq!(doc.as_xml().map(|root| root.name.as_str()), Some("a"));
    }

    #[test]
    fn test_parse_errors_are_document_errors() {
        let err = Document::parse(DocumentFormat::Xml, "<a>").unwrap_err();
        assert!(matches!(err, Error::Document { .. }));

        let err = Document::parse(DocumentFormat::Json, "{").unwrap_err();
        assert!(matches!(err, Error::Json { .. }));
    }

    #[test]
    fn test_empty_documents() {
        let doc = Document::empty(DocumentFormat::Xml, Some("Customer")).unwrap();
        assert_eq!(doc.render(false).unwrap(), "<Customer/>");

        let doc = Document::empty(DocumentFormat::Json, None).unwrap();
        assert_eq!(doc.render(false).unwrap(), "{}");

        assert!(Document::empty(DocumentFormat::Xml, None).is_err());
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("XML".parse::<DocumentFormat>().unwrap(), DocumentFormat::Xml);
        assert!("soap".parse::<DocumentFormat>().is_err());
        assert_eq!(DocumentFormat::Json.content_type(), "application/json");
    }
}
