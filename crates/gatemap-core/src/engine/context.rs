//! Per-request mapping state

use super::mapping::MappingSet;
use crate::cancel::CancellationSignal;
use crate::document::Document;
use crate::path::StaticValues;
use crate::services::ServiceLocator;
use crate::transform::TransformerRegistry;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Untyped bag used for behavior-to-behavior and behavior-to-caller communication
pub type Properties = HashMap<String, Value>;

/// Mutable state for one inbound request.
///
/// Created per request and never shared between concurrent requests; the
/// `Arc` fields point at configuration shared read-only across requests.
#[derive(Debug, Clone)]
pub struct MappingContext {
    pub source: Option<Document>,
    /// Pre-seeded with a root node by the caller
    pub destination: Option<Document>,
    pub mappings: Arc<MappingSet>,
    pub statics: StaticValues,
    pub properties: Properties,
    pub transformers: Arc<TransformerRegistry>,
    pub services: ServiceLocator,
    pub cancellation: CancellationSignal,
    pub request_id: String,
}

impl MappingContext {
    /// Context with no documents, empty statics, no services and a fresh request id
    pub fn new(mappings: Arc<MappingSet>, transformers: Arc<TransformerRegistry>) -> Self {
        Self {
            source: None,
            destination: None,
            mappings,
            statics: StaticValues::default(),
            properties: Properties::new(),
            transformers,
            services: ServiceLocator::default(),
            cancellation: CancellationSignal::never(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_source(mut self, source: Document) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_destination(mut self, destination: Document) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_statics(mut self, statics: StaticValues) -> Self {
        self.statics = statics;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_services(mut self, services: ServiceLocator) -> Self {
        self.services = services;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationSignal) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// String property, if present and a string
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}
