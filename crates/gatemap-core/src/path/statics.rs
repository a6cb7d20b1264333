//! Static reference values (`$$key`)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Per-integration statics layered over process-wide globals
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticValues {
    /// Values scoped to one integration
    #[serde(default)]
    pub local: HashMap<String, String>,
    /// Shared, process-wide values
    #[serde(skip)]
    pub global: Arc<HashMap<String, String>>,
}

impl StaticValues {
    pub fn new(local: HashMap<String, String>, global: Arc<HashMap<String, String>>) -> Self {
        Self { local, global }
    }

    /// Local first, then global
    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.local
            .get(key)
            .or_else(|| self.global.get(key))
            .map(String::as_str)
    }

    pub fn with_local(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.local.insert(key.into(), value.into());
        self
    }
}
