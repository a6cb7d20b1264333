//! Element/attribute document model
//!
//! A deliberately small owned tree: elements carry ordered attributes and a
//! list of child nodes (elements or text). Parsing goes through `quick-xml`;
//! rendering escapes text and attribute values with `quick_xml::escape`.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;

/// Errors raised while parsing element documents
#[derive(Error, Debug, Clone, PartialEq)]
pub enum XmlError {
    /// Malformed markup
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    /// Input contained no root element
    #[error("XML document has no root element")]
    NoRoot,

    /// More than one top-level element
    #[error("XML document has more than one root element (found '{second}')")]
    MultipleRoots { second: String },

    /// Element left open at end of input
    #[error("XML element '{name}' is not closed")]
    Unclosed { name: String },
}

/// A node inside an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlNode {
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        }
    }
}

/// An element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Look up an attribute value
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    /// Iterate over child elements
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// Iterate over child elements matching a name test (`*` matches any)
    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements()
            .filter(move |element| name == "*" || element.name == name)
    }

    /// Number of child elements with the given name
    pub fn count_named(&self, name: &str) -> usize {
        self.elements_named(name).count()
    }

    /// Concatenated text of this element and its descendants, in document order
    pub fn text(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(value) => out.push_str(value),
                XmlNode::Element(element) => element.collect_text(out),
            }
        }
    }

    /// Replace the direct text content of this element.
    ///
    /// Child elements are kept; previous text nodes are removed so that
    /// repeated writes never accumulate text.
    pub fn set_text(&mut self, value: &str) {
        self.children.retain(|child| !matches!(child, XmlNode::Text(_)));
        if !value.is_empty() {
            self.children.insert(0, XmlNode::Text(value.to_string()));
        }
    }

    /// Return the `position`-th (0-based) child element named `name`,
    /// appending empty siblings until it exists.
    pub fn ensure_child(&mut self, name: &str, position: usize) -> &mut XmlElement {
        let existing = self.count_named(name);
        for _ in existing..=position {
            self.children.push(XmlNode::Element(XmlElement::new(name)));
        }
        self.children
            .iter_mut()
            .filter_map(XmlNode::as_element_mut)
            .filter(|element| element.name == name)
            .nth(position)
            .expect("sibling count was ensured above")
    }

    /// Parse a document and return its root element
    pub fn parse(input: &str) -> Result<XmlElement, XmlError> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let event = reader.read_event().map_err(|e| XmlError::Syntax {
                position: reader.buffer_position() as u64,
                message: e.to_string(),
            })?;

            match event {
                Event::Start(start) => {
                    stack.push(element_from_start(&start, reader.buffer_position() as u64)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start, reader.buffer_position() as u64)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut root, element)?;
                    }
                }
                Event::Text(text) => {
                    let value = text.unescape().map_err(|e| XmlError::Syntax {
                        position: reader.buffer_position() as u64,
                        message: e.to_string(),
                    })?;
                    if let Some(parent) = stack.last_mut() {
                        if !value.is_empty() {
                            parent.children.push(XmlNode::Text(value.into_owned()));
                        }
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                        parent.children.push(XmlNode::Text(value));
                    }
                }
                Event::Eof => break,
                // declarations, comments, processing instructions, doctype
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(XmlError::Unclosed { name: open.name });
        }

        root.ok_or(XmlError::NoRoot)
    }

    /// Render the element as markup
    pub fn to_xml_string(&self, pretty: bool) -> String {
        let mut out = String::new();
        self.write_markup(&mut out, pretty, 0);
        out
    }

    fn write_markup(&self, out: &mut String, pretty: bool, depth: usize) {
        if pretty {
            out.push_str(&"  ".repeat(depth));
        }
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }

        if self.children.is_empty() {
            out.push_str("/>");
            if pretty {
                out.push('\n');
            }
            return;
        }
        out.push('>');

        let has_elements = self.elements().next().is_some();
        if has_elements && pretty {
            out.push('\n');
        }
        for child in &self.children {
            match child {
                XmlNode::Text(value) => {
                    if has_elements && pretty {
                        out.push_str(&"  ".repeat(depth + 1));
                        out.push_str(&escape(value.as_str()));
                        out.push('\n');
                    } else {
                        out.push_str(&escape(value.as_str()));
                    }
                }
                XmlNode::Element(element) => element.write_markup(out, pretty, depth + 1),
            }
        }
        if has_elements && pretty {
            out.push_str(&"  ".repeat(depth));
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
        if pretty {
            out.push('\n');
        }
    }
}

fn element_from_start(start: &BytesStart<'_>, position: u64) -> Result<XmlElement, XmlError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| XmlError::Syntax {
            position,
            message: e.to_string(),
        })?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(|e| XmlError::Syntax {
            position,
            message: e.to_string(),
        })?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(XmlError::MultipleRoots { second: element.name });
    }
    *root = Some(element);
    Ok(())
}
