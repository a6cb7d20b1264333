//! Core types for the value transformer system

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by individual transformers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// A required argument is absent
    #[error("{transformer}: missing required argument '{argument}'")]
    MissingArgument { transformer: String, argument: String },

    /// An argument is present but unusable
    #[error("{transformer}: invalid argument '{argument}': {message}")]
    InvalidArgument {
        transformer: String,
        argument: String,
        message: String,
    },

    /// The input value cannot be transformed
    #[error("{transformer}: cannot transform '{value}': {message}")]
    InvalidInput {
        transformer: String,
        value: String,
        message: String,
    },

    /// No transformer registered under this name
    #[error("Unknown transformer '{name}'")]
    UnknownTransformer { name: String },

    /// The transformer panicked; the panic was contained
    #[error("{transformer}: panicked: {message}")]
    Panicked { transformer: String, message: String },
}

impl TransformError {
    pub fn missing_argument(transformer: &str, argument: &str) -> Self {
        Self::MissingArgument {
            transformer: transformer.to_string(),
            argument: argument.to_string(),
        }
    }

    pub fn invalid_argument(transformer: &str, argument: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            transformer: transformer.to_string(),
            argument: argument.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_input(transformer: &str, value: &str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            transformer: transformer.to_string(),
            value: value.to_string(),
            message: message.into(),
        }
    }
}

/// Named arguments passed to a transformer; values may be explicitly null
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformerArgs(HashMap<String, Option<String>>);

impl TransformerArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), Some(value.into()));
        self
    }

    pub fn with_null(mut self, key: impl Into<String>) -> Self {
        self.0.insert(key.into(), None);
        self
    }

    /// Argument value, treating explicit null like absence
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.as_deref())
    }

    /// Raw entry, distinguishing "present but null" from "absent"
    pub fn entry(&self, key: &str) -> Option<Option<&str>> {
        self.0.get(key).map(|value| value.as_deref())
    }

    pub fn require(&self, transformer: &str, key: &str) -> Result<&str, TransformError> {
        self.get(key)
            .ok_or_else(|| TransformError::missing_argument(transformer, key))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, Option<String>>> for TransformerArgs {
    fn from(map: HashMap<String, Option<String>>) -> Self {
        Self(map)
    }
}

/// A transformer invocation inside a field mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformerSpec {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(default, alias = "args", alias = "Arguments")]
    pub arguments: TransformerArgs,
}

impl TransformerSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: TransformerArgs::default(),
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments = self.arguments.with(key, value);
        self
    }
}

/// A named, pure value transformation.
///
/// Implementations must be shareable across concurrent requests; a transformer
/// sees only the current value and its arguments.
pub trait Transformer: Send + Sync {
    fn name(&self) -> &str;

    fn transform(&self, value: Option<&str>, args: &TransformerArgs)
        -> Result<Option<String>, TransformError>;
}

type TransformFn =
    dyn Fn(Option<&str>, &TransformerArgs) -> Result<Option<String>, TransformError> + Send + Sync;

/// Adapter turning a closure into a [`Transformer`]
#[derive(Clone)]
pub struct FnTransformer {
    name: String,
    function: Arc<TransformFn>,
}

impl FnTransformer {
    pub fn new<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(Option<&str>, &TransformerArgs) -> Result<Option<String>, TransformError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            function: Arc::new(function),
        }
    }
}

impl Transformer for FnTransformer {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(
        &self,
        value: Option<&str>,
        args: &TransformerArgs,
    ) -> Result<Option<String>, TransformError> {
        (self.function)(value, args)
    }
}

impl fmt::Debug for FnTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransformer").field("name", &self.name).finish()
    }
}

/// A recovered transformer failure
#[derive(Debug, Clone, PartialEq)]
pub struct TransformFailure {
    pub transformer: String,
    pub error: TransformError,
}
