//! Name -> transformer registry

use super::built_in;
use super::types::{FnTransformer, TransformError, Transformer, TransformerArgs};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Registry of named transformers, shared read-only across requests
#[derive(Clone, Default)]
pub struct TransformerRegistry {
    transformers: HashMap<String, Arc<dyn Transformer>>,
}

impl TransformerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with every built-in transformer
    pub fn with_built_ins() -> Self {
        let mut registry = Self::new();
        for transformer in built_in::all() {
            registry.register(transformer);
        }
        registry
    }

    /// Register a transformer; an existing entry with the same name is replaced
    pub fn register(&mut self, transformer: Arc<dyn Transformer>) -> &mut Self {
        let name = transformer.name().to_string();
        if self.transformers.insert(name.clone(), transformer).is_some() {
            debug!(transformer = %name, "Replaced previously registered transformer");
        }
        self
    }

    /// Register a closure under `name`
    pub fn register_fn<F>(&mut self, name: impl Into<String>, function: F) -> &mut Self
    where
        F: Fn(Option<&str>, &TransformerArgs) -> Result<Option<String>, TransformError>
            + Send
            + Sync
            + 'static,
    {
        self.register(Arc::new(FnTransformer::new(name, function)))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Transformer>> {
        self.transformers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transformers.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.transformers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}

impl fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerRegistry")
            .field("transformers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_built_ins_are_registered() {
        let registry = TransformerRegistry::with_built_ins();
        for name in [
            "ToUpper",
            "ToLower",
            "Trim",
            "Default",
            "Prefix",
            "Suffix",
            "Replace",
            "RegexReplace",
            "Substring",
            "Lookup",
            "FormatDate",
            "Concat",
        ] {
            assert!(registry.contains(name), "{name} should be registered");
        }
        assert!(!registry.contains("toupper"));
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = TransformerRegistry::with_built_ins();
        let before = registry.len();
        registry.register_fn("ToUpper", |_, _| Ok(Some("custom".to_string())));

        assert_eq!(registry.len(), before);
        let transformer = registry.get("ToUpper").unwrap();
        assert_eq!(
            transformer.transform(Some("x"), &TransformerArgs::new()).unwrap(),
            Some("custom".to_string())
        );
    }
}
