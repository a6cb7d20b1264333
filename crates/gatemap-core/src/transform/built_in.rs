//! Built-in transformers
//!
//! All built-ins pass a null value through unchanged unless their purpose is
//! to supply one (`Default`, `Lookup`, `Concat`).

use super::types::{TransformError, Transformer, TransformerArgs};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

/// Every built-in, ready for registration
pub fn all() -> Vec<Arc<dyn Transformer>> {
    vec![
        Arc::new(ToUpper),
        Arc::new(ToLower),
        Arc::new(Trim),
        Arc::new(DefaultValue),
        Arc::new(Prefix),
        Arc::new(Suffix),
        Arc::new(Replace),
        Arc::new(RegexReplace::default()),
        Arc::new(Substring),
        Arc::new(Lookup),
        Arc::new(FormatDate),
        Arc::new(Concat),
    ]
}

type Output = Result<Option<String>, TransformError>;

#[derive(Debug, Clone, Copy, Default)]
pub struct ToUpper;

impl Transformer for ToUpper {
    fn name(&self) -> &str {
        "ToUpper"
    }

    fn transform(&self, value: Option<&str>, _args: &TransformerArgs) -> Output {
        Ok(value.map(str::to_uppercase))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ToLower;

impl Transformer for ToLower {
    fn name(&self) -> &str {
        "ToLower"
    }

    fn transform(&self, value: Option<&str>, _args: &TransformerArgs) -> Output {
        Ok(value.map(str::to_lowercase))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Trim;

impl Transformer for Trim {
    fn name(&self) -> &str {
        "Trim"
    }

    fn transform(&self, value: Option<&str>, _args: &TransformerArgs) -> Output {
        Ok(value.map(|v| v.trim().to_string()))
    }
}

/// `Default(value)`: substitutes for a null or empty value
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValue;

impl Transformer for DefaultValue {
    fn name(&self) -> &str {
        "Default"
    }

    fn transform(&self, value: Option<&str>, args: &TransformerArgs) -> Output {
        let fallback = args.require(self.name(), "value")?;
        Ok(match value {
            Some(v) if !v.is_empty() => Some(v.to_string()),
            _ => Some(fallback.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Prefix;

impl Transformer for Prefix {
    fn name(&self) -> &str {
        "Prefix"
    }

    fn transform(&self, value: Option<&str>, args: &TransformerArgs) -> Output {
        let prefix = args.require(self.name(), "value")?;
        Ok(value.map(|v| format!("{}{}", prefix, v)))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Suffix;

impl Transformer for Suffix {
    fn name(&self) -> &str {
        "Suffix"
    }

    fn transform(&self, value: Option<&str>, args: &TransformerArgs) -> Output {
        let suffix = args.require(self.name(), "value")?;
        Ok(value.map(|v| format!("{}{}", v, suffix)))
    }
}

/// `Replace(from, to)`: literal substring replacement
#[derive(Debug, Clone, Copy, Default)]
pub struct Replace;

impl Transformer for Replace {
    fn name(&self) -> &str {
        "Replace"
    }

    fn transform(&self, value: Option<&str>, args: &TransformerArgs) -> Output {
        let from = args.require(self.name(), "from")?;
        if from.is_empty() {
            return Err(TransformError::invalid_argument(self.name(), "from", "must not be empty"));
        }
        let to = args.get("to").unwrap_or_default();
        Ok(value.map(|v| v.replace(from, to)))
    }
}

/// `RegexReplace(pattern, replacement)`; `$1`-style group references are honoured
///
/// Compiled patterns are kept for the life of the transformer.
#[derive(Debug, Default)]
pub struct RegexReplace {
    patterns: Mutex<HashMap<String, Regex>>,
}

impl RegexReplace {
    fn compile(&self, pattern: &str) -> Result<Regex, TransformError> {
        let mut patterns = self.patterns.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(regex) = patterns.get(pattern) {
            return Ok(regex.clone());
        }
        let regex = Regex::new(pattern)
            .map_err(|e| TransformError::invalid_argument(self.name(), "pattern", e.to_string()))?;
        patterns.insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    #[cfg(test)]
    fn cached(&self) -> usize {
        self.patterns.lock().map(|patterns| patterns.len()).unwrap_or_default()
    }
}

impl Transformer for RegexReplace {
    fn name(&self) -> &str {
        "RegexReplace"
    }

    fn transform(&self, value: Option<&str>, args: &TransformerArgs) -> Output {
        let pattern = args.require(self.name(), "pattern")?;
        let replacement = args.get("replacement").unwrap_or_default();
        let regex = self.compile(pattern)?;
        Ok(value.map(|v| regex.replace_all(v, replacement).into_owned()))
    }
}

/// `Substring(start, length?)`, counted in characters
#[derive(Debug, Clone, Copy, Default)]
pub struct Substring;

impl Substring {
    fn number(&self, args: &TransformerArgs, key: &str) -> Result<Option<usize>, TransformError> {
        args.get(key)
            .map(|raw| {
                raw.trim()
                    .parse::<usize>()
                    .map_err(|e| TransformError::invalid_argument(self.name(), key, e.to_string()))
            })
            .transpose()
    }
}

impl Transformer for Substring {
    fn name(&self) -> &str {
        "Substring"
    }

    fn transform(&self, value: Option<&str>, args: &TransformerArgs) -> Output {
        let start = self
            .number(args, "start")?
            .ok_or_else(|| TransformError::missing_argument(self.name(), "start"))?;
        let length = self.number(args, "length")?;

        Ok(value.map(|v| {
            let chars = v.chars().skip(start);
            match length {
                Some(length) => chars.take(length).collect(),
                None => chars.collect(),
            }
        }))
    }
}

/// `Lookup`: argument keys are input values, argument values their replacements.
///
/// Unmatched values fall back to `_default` when given and pass through otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lookup;

impl Lookup {
    const DEFAULT_KEY: &'static str = "_default";
}

impl Transformer for Lookup {
    fn name(&self) -> &str {
        "Lookup"
    }

    fn transform(&self, value: Option<&str>, args: &TransformerArgs) -> Output {
        let mapped = value.and_then(|v| args.entry(v));
        Ok(match (mapped, args.entry(Self::DEFAULT_KEY)) {
            (Some(found), _) => found.map(str::to_string),
            (None, Some(fallback)) => fallback.map(str::to_string),
            (None, None) => value.map(str::to_string),
        })
    }
}

/// `FormatDate(from?, to)`: reparses a timestamp with chrono format strings.
///
/// `from` defaults to RFC 3339. Inputs without an offset or time are accepted
/// when the `from` format does not mention them.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatDate;

impl Transformer for FormatDate {
    fn name(&self) -> &str {
        "FormatDate"
    }

    fn transform(&self, value: Option<&str>, args: &TransformerArgs) -> Output {
        let to = args.require(self.name(), "to")?;
        let Some(raw) = value else {
            return Ok(None);
        };
        let raw = raw.trim();

        let formatted = match args.get("from") {
            None => DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.format(to))
                .map_err(|e| TransformError::invalid_input(self.name(), raw, e.to_string()))?,
            Some(from) => {
                if let Ok(dt) = DateTime::parse_from_str(raw, from) {
                    dt.format(to)
                } else if let Ok(dt) = NaiveDateTime::parse_from_str(raw, from) {
                    dt.and_utc().fixed_offset().format(to)
                } else {
                    let date = NaiveDate::parse_from_str(raw, from).map_err(|e| {
                        TransformError::invalid_input(self.name(), raw, e.to_string())
                    })?;
                    date.and_hms_opt(0, 0, 0)
                        .map(|dt| dt.and_utc().fixed_offset())
                        .ok_or_else(|| TransformError::invalid_input(self.name(), raw, "invalid time"))?
                        .format(to)
                }
            }
        };

        // chrono reports unusable output formats through fmt::Error
        let mut out = String::new();
        write!(out, "{}", formatted)
            .map_err(|_| TransformError::invalid_argument(self.name(), "to", "unsupported format"))?;
        Ok(Some(out))
    }
}

/// `Concat(separator?, values)`: appends comma separated constants
#[derive(Debug, Clone, Copy, Default)]
pub struct Concat;

impl Transformer for Concat {
    fn name(&self) -> &str {
        "Concat"
    }

    fn transform(&self, value: Option<&str>, args: &TransformerArgs) -> Output {
        let separator = args.get("separator").unwrap_or_default();
        let extra = args.require(self.name(), "values")?;
        let parts: Vec<&str> = value
            .into_iter()
            .chain(extra.split(',').map(str::trim).filter(|part| !part.is_empty()))
            .collect();
        Ok(Some(parts.join(separator)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(transformer: &dyn Transformer, value: Option<&str>, args: TransformerArgs) -> Output {
        transformer.transform(value, &args)
    }

    fn ok(value: &str) -> Output {
        Ok(Some(value.to_string()))
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(run(&ToUpper, Some("doe"), TransformerArgs::new()), ok("DOE"));
        assert_eq!(run(&ToLower, Some("DoE"), TransformerArgs::new()), ok("doe"));
        assert_eq!(run(&Trim, Some("  x "), TransformerArgs::new()), ok("x"));
        assert_eq!(run(&ToUpper, None, TransformerArgs::new()), Ok(None));
    }

    #[test]
    fn test_default() {
        let args = || TransformerArgs::new().with("value", "N/A");
        assert_eq!(run(&DefaultValue, None, args()), ok("N/A"));
        assert_eq!(run(&DefaultValue, Some(""), args()), ok("N/A"));
        assert_eq!(run(&DefaultValue, Some("x"), args()), ok("x"));
        assert!(run(&DefaultValue, None, TransformerArgs::new()).is_err());
    }

    #[test]
    fn test_prefix_suffix_replace() {
        assert_eq!(run(&Prefix, Some("1"), TransformerArgs::new().with("value", "ID-")), ok("ID-1"));
        assert_eq!(run(&Suffix, Some("1"), TransformerArgs::new().with("value", "kg")), ok("1kg"));
        assert_eq!(
            run(&Replace, Some("a-b-c"), TransformerArgs::new().with("from", "-").with("to", "/")),
            ok("a/b/c")
        );
        assert!(run(&Replace, Some("x"), TransformerArgs::new().with("from", "")).is_err());
    }

    #[test]
    fn test_regex_replace() {
        let args = TransformerArgs::new()
            .with("pattern", r"(\d{3})(\d{4})")
            .with("replacement", "$1-$2");
        assert_eq!(run(&RegexReplace::default(), Some("5551234"), args), ok("555-1234"));

        let bad = TransformerArgs::new().with("pattern", "(");
        assert!(matches!(
            run(&RegexReplace::default(), Some("x"), bad),
            Err(TransformError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_regex_replace_compiles_each_pattern_once() {
        let transformer = RegexReplace::default();
        let digits = TransformerArgs::new().with("pattern", r"\d").with("replacement", "#");
        let spaces = TransformerArgs::new().with("pattern", r"\s+").with("replacement", " ");

        for value in ["a1", "b22", "c333"] {
            assert!(run(&transformer, Some(value), digits.clone()).is_ok());
        }
        assert_eq!(transformer.cached(), 1);
        assert_eq!(run(&transformer, Some("a  b"), spaces), ok("a b"));
        assert_eq!(run(&transformer, Some("x9"), digits), ok("x#"));
        assert_eq!(transformer.cached(), 2);

        let bad = TransformerArgs::new().with("pattern", "(");
        assert!(run(&transformer, Some("x"), bad).is_err());
        assert_eq!(transformer.cached(), 2);
    }

    #[test]
    fn test_substring_counts_chars() {
        let args = TransformerArgs::new().with("start", "1").with("length", "3");
        assert_eq!(run(&Substring, Some("héllo"), args), ok("éll"));
        assert_eq!(run(&Substring, Some("abc"), TransformerArgs::new().with("start", "5")), ok(""));
        assert!(run(&Substring, Some("abc"), TransformerArgs::new().with("start", "x")).is_err());
    }

    #[test]
    fn test_lookup() {
        let args = || {
            TransformerArgs::new()
                .with("M", "Male")
                .with("F", "Female")
                .with_null("U")
        };
        assert_eq!(run(&Lookup, Some("M"), args()), ok("Male"));
        assert_eq!(run(&Lookup, Some("U"), args()), Ok(None));
        assert_eq!(run(&Lookup, Some("X"), args()), ok("X"));
        assert_eq!(run(&Lookup, Some("X"), args().with("_default", "Other")), ok("Other"));
    }

    #[test]
    fn test_format_date() {
        let args = TransformerArgs::new().with("to", "%d/%m/%Y");
        assert_eq!(run(&FormatDate, Some("2024-03-15T10:30:00Z"), args), ok("15/03/2024"));

        let args = TransformerArgs::new().with("from", "%Y%m%d").with("to", "%Y-%m-%d");
        assert_eq!(run(&FormatDate, Some("20240315"), args), ok("2024-03-15"));

        let args = TransformerArgs::new().with("to", "%Y");
        assert!(matches!(
            run(&FormatDate, Some("yesterday"), args),
            Err(TransformError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_concat() {
        let args = TransformerArgs::new().with("separator", " ").with("values", "Jr, PhD");
        assert_eq!(run(&Concat, Some("John"), args), ok("John Jr PhD"));
    }
}
