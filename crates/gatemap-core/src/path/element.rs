//! Hierarchical-element paths over XML-shaped documents
//!
//! Grammar: `/Root/Child` steps from the root element, `//Name` for
//! descendant-or-self search, `*` as a name wildcard, `[n]` 1-based position
//! among same-name siblings, and an optional final `@attr` step.
//! Destination paths additionally accept `[*]` / `[]` as a repeat marker and
//! reject descendant search and wildcards.

use super::error::PathError;
use super::Resolution;
use crate::document::XmlElement;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
}

/// A single `/name[n]` step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementStep {
    pub axis: Axis,
    /// Element name, or `*`
    pub name: String,
    /// 1-based position among matching siblings
    pub position: Option<usize>,
    /// Destination-only repeat marker
    pub repeat: bool,
}

impl ElementStep {
    fn matches(&self, element: &XmlElement) -> bool {
        self.name == "*" || self.name == element.name
    }
}

/// A compiled `/`-prefixed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPath {
    raw: String,
    steps: Vec<ElementStep>,
    attribute: Option<String>,
}

impl ElementPath {
    pub fn parse(input: &str) -> Result<Self, PathError> {
        parse(input, false)
    }

    pub fn parse_destination(input: &str) -> Result<Self, PathError> {
        parse(input, true)
    }

    pub fn steps(&self) -> &[ElementStep] {
        &self.steps
    }

    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_multi(&self) -> bool {
        self.steps
            .iter()
            .any(|step| step.axis == Axis::Descendant || step.name == "*")
    }

    pub fn has_repeat(&self) -> bool {
        self.steps.iter().any(|step| step.repeat)
    }

    /// Select matching elements in document order
    pub fn select<'a>(&self, root: &'a XmlElement) -> Vec<&'a XmlElement> {
        let Some((first, rest)) = self.steps.split_first() else {
            return Vec::new();
        };

        // The document node has a single child: the root element.
        let mut current: Vec<&'a XmlElement> = Vec::new();
        if first.matches(root) && first.position.map_or(true, |p| p == 1) {
            current.push(root);
        }
        if first.axis == Axis::Descendant {
            collect_descendants(root, first, &mut current);
        }

        for step in rest {
            let mut next: Vec<&'a XmlElement> = Vec::new();
            for context in current {
                let mut found = Vec::new();
                match step.axis {
                    Axis::Child => collect_children(context, step, &mut found),
                    Axis::Descendant => collect_descendants(context, step, &mut found),
                }
                for element in found {
                    if !next.iter().any(|seen| std::ptr::eq(*seen, element)) {
                        next.push(element);
                    }
                }
            }
            if next.is_empty() {
                return next;
            }
            current = next;
        }
        current
    }

    /// Resolve to element text or attribute values
    pub fn resolve(&self, root: &XmlElement) -> Resolution {
        let selected = self.select(root);
        let matched = selected.len();
        let values: Vec<Option<String>> = match &self.attribute {
            Some(name) => selected
                .into_iter()
                .filter_map(|element| element.attribute(name).map(|value| Some(value.to_string())))
                .collect(),
            None => selected.into_iter().map(|element| Some(element.text())).collect(),
        };
        Resolution {
            multi: self.is_multi() || matched > 1,
            values,
        }
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn collect_children<'a>(parent: &'a XmlElement, step: &ElementStep, out: &mut Vec<&'a XmlElement>) {
    let mut position = 0;
    for child in parent.elements() {
        if step.matches(child) {
            position += 1;
            if step.position.map_or(true, |p| p == position) {
                out.push(child);
            }
        }
    }
}

fn collect_descendants<'a>(
    parent: &'a XmlElement,
    step: &ElementStep,
    out: &mut Vec<&'a XmlElement>,
) {
    let mut position = 0;
    for child in parent.elements() {
        if step.matches(child) {
            position += 1;
            if step.position.map_or(true, |p| p == position) {
                out.push(child);
            }
        }
        collect_descendants(child, step, out);
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.' | ':')
}

fn parse(input: &str, destination: bool) -> Result<ElementPath, PathError> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err(PathError::Empty);
    }
    if !raw.starts_with('/') {
        return Err(PathError::syntax(
            "Element path must start with /",
            0,
            raw,
            vec!["/".to_string()],
            raw.chars().next().map(String::from).unwrap_or_default(),
        ));
    }

    let chars: Vec<(usize, char)> = raw.char_indices().collect();
    let found_at = |i: usize| {
        chars
            .get(i)
            .map(|(_, c)| c.to_string())
            .unwrap_or_else(|| "EOF".to_string())
    };
    let offset_at = |i: usize| chars.get(i).map(|(pos, _)| *pos).unwrap_or(raw.len());

    let mut steps = Vec::new();
    let mut attribute = None;
    let mut i = 0;

    while i < chars.len() {
        // step separator
        if chars[i].1 != '/' {
            return Err(PathError::syntax(
                "Expected step separator",
                offset_at(i),
                raw,
                vec!["/".to_string()],
                found_at(i),
            ));
        }
        i += 1;
        let axis = if chars.get(i).map(|(_, c)| *c) == Some('/') {
            i += 1;
            if destination {
                return Err(PathError::not_writable("descendant search '//'", raw));
            }
            Axis::Descendant
        } else {
            Axis::Child
        };

        // attribute step, must be last
        if chars.get(i).map(|(_, c)| *c) == Some('@') {
            i += 1;
            let start = i;
            while i < chars.len() && is_name_char(chars[i].1) {
                i += 1;
            }
            if start == i {
                return Err(PathError::syntax(
                    "Expected attribute name",
                    offset_at(i),
                    raw,
                    vec!["name".to_string()],
                    found_at(i),
                ));
            }
            if i < chars.len() {
                return Err(PathError::parse(
                    "Attribute step must be the last step",
                    offset_at(i),
                    raw,
                ));
            }
            if axis == Axis::Descendant || steps.is_empty() {
                return Err(PathError::parse(
                    "Attribute step must follow an element step",
                    offset_at(start),
                    raw,
                ));
            }
            attribute = Some(chars[start..i].iter().map(|(_, c)| c).collect());
            break;
        }

        // name test
        let start = i;
        let name: String = if chars.get(i).map(|(_, c)| *c) == Some('*') {
            if destination {
                return Err(PathError::not_writable("name wildcard", raw));
            }
            i += 1;
            "*".to_string()
        } else {
            while i < chars.len() && is_name_char(chars[i].1) {
                i += 1;
            }
            chars[start..i].iter().map(|(_, c)| c).collect()
        };
        if name.is_empty() {
            return Err(PathError::syntax(
                "Expected element name",
                offset_at(i),
                raw,
                vec!["name".to_string(), "*".to_string(), "@".to_string()],
                found_at(i),
            ));
        }

        // optional predicate
        let mut position = None;
        let mut repeat = false;
        if chars.get(i).map(|(_, c)| *c) == Some('[') {
            let open = i;
            i += 1;
            let start = i;
            while i < chars.len() && chars[i].1 != ']' {
                i += 1;
            }
            if i >= chars.len() {
                return Err(PathError::parse("Unterminated predicate", offset_at(open), raw));
            }
            let body: String = chars[start..i].iter().map(|(_, c)| c).collect();
            i += 1; // consume ']'
            let body = body.trim();
            if body.is_empty() || body == "*" {
                if !destination {
                    return Err(PathError::parse(
                        "Repeat marker is only valid in destination paths",
                        offset_at(open),
                        raw,
                    ));
                }
                repeat = true;
            } else {
                let n: usize = body.parse().map_err(|_| {
                    PathError::parse(
                        format!("Invalid position predicate: {}", body),
                        offset_at(start),
                        raw,
                    )
                })?;
                if n == 0 {
                    return Err(PathError::parse(
                        "Positions are 1-based",
                        offset_at(start),
                        raw,
                    ));
                }
                position = Some(n);
            }
        }

        steps.push(ElementStep {
            axis,
            name,
            position,
            repeat,
        });
    }

    if steps.is_empty() {
        return Err(PathError::parse("Path selects no element", 0, raw));
    }

    Ok(ElementPath {
        raw: raw.to_string(),
        steps,
        attribute,
    })
}
