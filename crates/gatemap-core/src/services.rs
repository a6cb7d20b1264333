//! Type-keyed registry of shared services available to behaviors

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Shared services keyed by their concrete type
#[derive(Clone, Default)]
pub struct ServiceLocator {
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ServiceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service, replacing any previous instance of the same type
    pub fn insert<T: Send + Sync + 'static>(&mut self, service: Arc<T>) -> &mut Self {
        self.services.insert(TypeId::of::<T>(), service);
        self
    }

    pub fn with<T: Send + Sync + 'static>(mut self, service: Arc<T>) -> Self {
        self.insert(service);
        self
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|service| service.downcast::<T>().ok())
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for ServiceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceLocator")
            .field("services", &self.services.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Clock(u64);

    #[test]
    fn test_insert_and_get_by_type() {
        let locator = ServiceLocator::new().with(Arc::new(Clock(7)));
        assert_eq!(locator.get::<Clock>().as_deref(), Some(&Clock(7)));
        assert!(locator.get::<String>().is_none());
        assert!(locator.contains::<Clock>());
    }

    #[test]
    fn test_insert_replaces_same_type() {
        let mut locator = ServiceLocator::new();
        locator.insert(Arc::new(Clock(1)));
        locator.insert(Arc::new(Clock(2)));
        assert_eq!(locator.len(), 1);
        assert_eq!(locator.get::<Clock>().map(|c| c.0), Some(2));
    }
}
