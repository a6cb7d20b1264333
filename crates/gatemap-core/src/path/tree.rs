//! Tree-navigation paths over JSON-shaped documents
//!
//! A recursive descent parser for the `$`-prefixed dialect plus a small
//! evaluator. Supported syntax:
//!
//! - `.name` / `['name']` child access
//! - `[n]` index, negative values count from the end
//! - `[*]` / `.*` wildcard
//! - `..name`, `..*`, `.**.name` recursive descent
//! - `[?(@.field == 'x' && !@.other)]` filters with `==`, `!=`, existence,
//!   `&&`, `||`, `!` and parentheses
//!
//! The same parser produces destination paths; in that mode only child keys,
//! non-negative indexes and the repeat marker (`[*]` or `[]`) are accepted.

use super::error::PathError;
use super::Resolution;
use serde_json::Value;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

/// One navigation step
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Object member
    Child(String),
    /// Array element, negative counts from the end
    Index(i64),
    /// All children of an object or array
    Wildcard,
    /// Every descendant, optionally restricted to a member name
    Descendant(Option<String>),
    /// Children satisfying a predicate
    Filter(Predicate),
    /// Destination-only: one array element per resolved value
    Repeat,
}

/// Filter predicate evaluated against a candidate node
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Exists(Vec<String>),
    Compare {
        field: Vec<String>,
        op: CompareOp,
        literal: Literal,
    },
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl Literal {
    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Literal::String(expected), Value::String(actual)) => expected == actual,
            (Literal::Number(expected), Value::Number(actual)) => {
                actual.as_f64().map_or(false, |actual| actual == *expected)
            }
            (Literal::Bool(expected), Value::Bool(actual)) => expected == actual,
            (Literal::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl Predicate {
    /// Evaluate against a candidate node.
    ///
    /// A missing field never equals a literal, so `!=` holds for it.
    pub fn matches(&self, node: &Value) -> bool {
        match self {
            Predicate::Exists(field) => lookup(node, field).is_some(),
            Predicate::Compare { field, op, literal } => {
                let equal = lookup(node, field).map_or(false, |value| literal.matches(value));
                match op {
                    CompareOp::Equal => equal,
                    CompareOp::NotEqual => !equal,
                }
            }
            Predicate::Not(inner) => !inner.matches(node),
            Predicate::And(left, right) => left.matches(node) && right.matches(node),
            Predicate::Or(left, right) => left.matches(node) || right.matches(node),
        }
    }
}

fn lookup<'a>(node: &'a Value, field: &[String]) -> Option<&'a Value> {
    field
        .iter()
        .try_fold(node, |current, key| current.as_object()?.get(key))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseMode {
    Source,
    Destination,
}

/// A compiled `$`-prefixed path
#[derive(Debug, Clone, PartialEq)]
pub struct TreePath {
    raw: String,
    segments: Vec<Segment>,
}

impl TreePath {
    /// Parse a source path
    pub fn parse(input: &str) -> Result<Self, PathError> {
        Parser::new(input, ParseMode::Source)?.parse()
    }

    /// Parse a destination path (keys, indexes and repeat markers only)
    pub fn parse_destination(input: &str) -> Result<Self, PathError> {
        Parser::new(input, ParseMode::Destination)?.parse()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the path is array-producing by shape
    pub fn is_multi(&self) -> bool {
        self.segments.iter().any(|segment| {
            matches!(
                segment,
                Segment::Wildcard | Segment::Descendant(_) | Segment::Filter(_)
            )
        })
    }

    /// Whether the path carries a repeat marker
    pub fn has_repeat(&self) -> bool {
        self.segments.iter().any(|segment| matches!(segment, Segment::Repeat))
    }

    /// Select matching nodes in document order
    pub fn select<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![root];
        for segment in &self.segments {
            let mut next = Vec::new();
            for node in current {
                apply_segment(segment, node, &mut next);
            }
            if next.is_empty() {
                return next;
            }
            current = next;
        }
        current
    }

    /// Resolve to textual values
    pub fn resolve(&self, root: &Value) -> Resolution {
        let values: Vec<Option<String>> = self.select(root).into_iter().map(render_value).collect();
        Resolution {
            multi: self.is_multi() || values.len() > 1,
            values,
        }
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Render a selected node as text; `null` has no textual value
pub fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

fn apply_segment<'a>(segment: &Segment, node: &'a Value, out: &mut Vec<&'a Value>) {
    match segment {
        Segment::Child(name) => {
            if let Some(child) = node.as_object().and_then(|map| map.get(name)) {
                out.push(child);
            }
        }
        Segment::Index(index) => {
            if let Value::Array(items) = node {
                if let Some(position) = normalize_index(*index, items.len()) {
                    out.push(&items[position]);
                }
            }
        }
        Segment::Wildcard | Segment::Repeat => push_children(node, out),
        Segment::Descendant(target) => descend(node, target.as_deref(), out),
        Segment::Filter(predicate) => {
            let mut children = Vec::new();
            push_children(node, &mut children);
            out.extend(children.into_iter().filter(|child| predicate.matches(child)));
        }
    }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let position = if index < 0 { len + index } else { index };
    if (0..len).contains(&position) {
        usize::try_from(position).ok()
    } else {
        None
    }
}

fn push_children<'a>(node: &'a Value, out: &mut Vec<&'a Value>) {
    match node {
        Value::Array(items) => out.extend(items.iter()),
        Value::Object(map) => out.extend(map.values()),
        _ => {}
    }
}

fn descend<'a>(node: &'a Value, target: Option<&str>, out: &mut Vec<&'a Value>) {
    match node {
        Value::Object(map) => {
            for (key, child) in map {
                if target.map_or(true, |name| name == key) {
                    out.push(child);
                }
                descend(child, target, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                if target.is_none() {
                    out.push(child);
                }
                descend(child, target, out);
            }
        }
        _ => {}
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: Peekable<Chars<'a>>,
    position: usize,
    mode: ParseMode,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, mode: ParseMode) -> Result<Self, PathError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PathError::Empty);
        }

        Ok(Self {
            input,
            chars: input.chars().peekable(),
            position: 0,
            mode,
        })
    }

    fn parse(mut self) -> Result<TreePath, PathError> {
        if self.current_char() != Some('$') {
            return Err(PathError::syntax(
                "Tree path must start with $",
                self.position,
                self.input,
                vec!["$".to_string()],
                self.found(),
            ));
        }
        self.advance();

        let mut segments = Vec::new();
        loop {
            self.skip_whitespace();
            if self.is_at_end() {
                break;
            }
            segments.push(self.parse_segment()?);
        }

        Ok(TreePath {
            raw: self.input.to_string(),
            segments,
        })
    }

    fn parse_segment(&mut self) -> Result<Segment, PathError> {
        match self.current_char() {
            Some('.') => self.parse_dot_segment(),
            Some('[') => self.parse_bracket_segment(),
            _ => Err(PathError::syntax(
                "Unexpected character in path",
                self.position,
                self.input,
                vec![".".to_string(), "[".to_string()],
                self.found(),
            )),
        }
    }

    /// `.name`, `.*`, `..target`, `.**.target`
    fn parse_dot_segment(&mut self) -> Result<Segment, PathError> {
        self.advance(); // consume '.'

        match self.current_char() {
            Some('.') => {
                self.advance();
                self.parse_descendant_target()
            }
            Some('*') => {
                self.advance();
                if self.current_char() == Some('*') {
                    self.advance();
                    if self.current_char() == Some('.') {
                        self.advance();
                        return self.parse_descendant_target();
                    }
                    return self.descendant(None);
                }
                self.writable("wildcard '.*'")?;
                Ok(Segment::Wildcard)
            }
            _ => Ok(Segment::Child(self.parse_identifier()?)),
        }
    }

    fn parse_descendant_target(&mut self) -> Result<Segment, PathError> {
        match self.current_char() {
            Some('*') => {
                self.advance();
                self.descendant(None)
            }
            Some('[') => {
                self.advance();
                self.skip_whitespace();
                let target = if self.current_char() == Some('*') {
                    self.advance();
                    None
                } else {
                    Some(self.parse_quoted_string()?)
                };
                self.skip_whitespace();
                self.expect_char(']')?;
                self.descendant(target)
            }
            _ => {
                let name = self.parse_identifier()?;
                self.descendant(Some(name))
            }
        }
    }

    fn descendant(&self, target: Option<String>) -> Result<Segment, PathError> {
        self.writable("recursive descent")?;
        Ok(Segment::Descendant(target))
    }

    fn parse_bracket_segment(&mut self) -> Result<Segment, PathError> {
        let start = self.position;
        self.advance(); // consume '['
        self.skip_whitespace();

        match self.current_char() {
            Some('?') => {
                self.writable("filter")?;
                self.advance();
                let predicate = self.parse_or()?;
                self.skip_whitespace();
                self.expect_char(']')?;
                Ok(Segment::Filter(predicate))
            }
            Some('\'') | Some('"') => {
                let name = self.parse_quoted_string()?;
                self.skip_whitespace();
                self.expect_char(']')?;
                Ok(Segment::Child(name))
            }
            Some('*') => {
                self.advance();
                self.skip_whitespace();
                self.expect_char(']')?;
                Ok(match self.mode {
                    ParseMode::Source => Segment::Wildcard,
                    ParseMode::Destination => Segment::Repeat,
                })
            }
            Some(']') if self.mode == ParseMode::Destination => {
                self.advance();
                Ok(Segment::Repeat)
            }
            Some(ch) if ch.is_ascii_digit() || ch == '-' => {
                let index = self.parse_integer()?;
                self.skip_whitespace();
                self.expect_char(']')?;
                if index < 0 {
                    self.writable("negative index")?;
                }
                Ok(Segment::Index(index))
            }
            Some(ch) => Err(PathError::syntax(
                "Invalid character in bracket selector",
                self.position,
                self.input,
                vec![
                    "quote".to_string(),
                    "digit".to_string(),
                    "*".to_string(),
                    "?".to_string(),
                ],
                ch.to_string(),
            )),
            None => Err(PathError::parse("Unterminated bracket selector", start, self.input)),
        }
    }

    fn parse_or(&mut self) -> Result<Predicate, PathError> {
        let mut expr = self.parse_and()?;
        loop {
            self.skip_whitespace();
            if !self.match_operator("||") {
                break;
            }
            let right = self.parse_and()?;
            expr = Predicate::Or(Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Predicate, PathError> {
        let mut expr = self.parse_unary()?;
        loop {
            self.skip_whitespace();
            if !self.match_operator("&&") {
                break;
            }
            let right = self.parse_unary()?;
            expr = Predicate::And(Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Predicate, PathError> {
        self.skip_whitespace();
        if self.current_char() == Some('!') {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Predicate::Not(Box::new(operand)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Predicate, PathError> {
        self.skip_whitespace();
        match self.current_char() {
            Some('(') => {
                self.advance();
                let expr = self.parse_or()?;
                self.skip_whitespace();
                self.expect_char(')')?;
                Ok(expr)
            }
            Some('@') => {
                self.advance();
                let field = self.parse_field_path()?;
                self.skip_whitespace();
                if self.match_operator("==") {
                    let literal = self.parse_literal()?;
                    Ok(Predicate::Compare { field, op: CompareOp::Equal, literal })
                } else if self.match_operator("!=") {
                    let literal = self.parse_literal()?;
                    Ok(Predicate::Compare { field, op: CompareOp::NotEqual, literal })
                } else {
                    Ok(Predicate::Exists(field))
                }
            }
            Some(ch) => Err(PathError::syntax(
                "Unexpected character in filter expression",
                self.position,
                self.input,
                vec!["@".to_string(), "(".to_string(), "!".to_string()],
                ch.to_string(),
            )),
            None => Err(PathError::parse(
                "Unexpected end of input in filter expression",
                self.position,
                self.input,
            )),
        }
    }

    /// `@` followed by `.name` / `['name']` steps
    fn parse_field_path(&mut self) -> Result<Vec<String>, PathError> {
        let mut field = Vec::new();
        loop {
            match self.current_char() {
                Some('.') => {
                    self.advance();
                    field.push(self.parse_identifier()?);
                }
                Some('[') => {
                    self.advance();
                    self.skip_whitespace();
                    field.push(self.parse_quoted_string()?);
                    self.skip_whitespace();
                    self.expect_char(']')?;
                }
                _ => break,
            }
        }
        Ok(field)
    }

    fn parse_literal(&mut self) -> Result<Literal, PathError> {
        self.skip_whitespace();
        match self.current_char() {
            Some('\'') | Some('"') => Ok(Literal::String(self.parse_quoted_string()?)),
            Some(ch) if ch.is_ascii_digit() || ch == '-' => Ok(Literal::Number(self.parse_number()?)),
            Some(ch) if ch.is_alphabetic() => {
                let start = self.position;
                let word = self.parse_identifier()?;
                match word.as_str() {
                    "true" => Ok(Literal::Bool(true)),
                    "false" => Ok(Literal::Bool(false)),
                    "null" => Ok(Literal::Null),
                    _ => Err(PathError::syntax(
                        "Unknown literal",
                        start,
                        self.input,
                        vec!["true".to_string(), "false".to_string(), "null".to_string()],
                        word,
                    )),
                }
            }
            _ => Err(PathError::syntax(
                "Expected literal",
                self.position,
                self.input,
                vec!["string".to_string(), "number".to_string(), "true/false/null".to_string()],
                self.found(),
            )),
        }
    }

    fn parse_identifier(&mut self) -> Result<String, PathError> {
        if !self
            .current_char()
            .map(|c| c.is_alphabetic() || c == '_')
            .unwrap_or(false)
        {
            return Err(PathError::syntax(
                "Expected identifier",
                self.position,
                self.input,
                vec!["letter or _".to_string()],
                self.found(),
            ));
        }

        let mut identifier = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '-' {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        Ok(identifier)
    }

    fn parse_quoted_string(&mut self) -> Result<String, PathError> {
        let quote_char = match self.current_char() {
            Some(ch @ ('\'' | '"')) => ch,
            _ => {
                return Err(PathError::syntax(
                    "Expected quoted name",
                    self.position,
                    self.input,
                    vec!["'".to_string(), "\"".to_string()],
                    self.found(),
                ))
            }
        };
        let start = self.position;
        self.advance(); // consume opening quote

        let mut string = String::new();
        let mut escaped = false;
        while let Some(ch) = self.current_char() {
            if escaped {
                match ch {
                    'n' => string.push('\n'),
                    't' => string.push('\t'),
                    '\\' | '\'' | '"' => string.push(ch),
                    _ => {
                        string.push('\\');
                        string.push(ch);
                    }
                }
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote_char {
                self.advance(); // consume closing quote
                return Ok(string);
            } else {
                string.push(ch);
            }
            self.advance();
        }

        Err(PathError::parse("Unterminated string literal", start, self.input))
    }

    fn parse_integer(&mut self) -> Result<i64, PathError> {
        let start = self.position;
        let mut digits = String::new();
        if self.current_char() == Some('-') {
            digits.push('-');
            self.advance();
        }
        while let Some(ch) = self.current_char().filter(|c| c.is_ascii_digit()) {
            digits.push(ch);
            self.advance();
        }
        digits
            .parse()
            .map_err(|_| PathError::parse(format!("Invalid array index: {}", digits), start, self.input))
    }

    fn parse_number(&mut self) -> Result<f64, PathError> {
        let start = self.position;
        let mut number = String::new();
        while let Some(ch) = self
            .current_char()
            .filter(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        {
            number.push(ch);
            self.advance();
        }
        number
            .parse()
            .map_err(|_| PathError::parse(format!("Invalid number: {}", number), start, self.input))
    }

    fn writable(&self, feature: &str) -> Result<(), PathError> {
        match self.mode {
            ParseMode::Source => Ok(()),
            ParseMode::Destination => Err(PathError::not_writable(feature, self.input)),
        }
    }

    fn match_operator(&mut self, op: &str) -> bool {
        let remaining: String = self.chars.clone().take(op.chars().count()).collect();
        if remaining == op {
            for _ in op.chars() {
                self.advance();
            }
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().map_or(false, char::is_whitespace) {
            self.advance();
        }
    }

    fn current_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn found(&mut self) -> String {
        self.current_char()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "EOF".to_string())
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        self.position += ch.len_utf8();
        Some(ch)
    }

    fn is_at_end(&mut self) -> bool {
        self.current_char().is_none()
    }

    fn expect_char(&mut self, expected: char) -> Result<(), PathError> {
        match self.current_char() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(PathError::syntax(
                format!("Expected '{}'", expected),
                self.position,
                self.input,
                vec![expected.to_string()],
                ch.to_string(),
            )),
            None => Err(PathError::parse(
                format!("Expected '{}' but reached end of input", expected),
                self.position,
                self.input,
            )),
        }
    }
}
