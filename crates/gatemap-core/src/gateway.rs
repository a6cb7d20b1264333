//! Integration glue: one configured translation from inbound text to a
//! dispatched destination document

use crate::cancel::CancellationSignal;
use crate::dispatch::{DispatchReceipt, Dispatcher};
use crate::document::{Document, DocumentFormat};
use crate::engine::{
    FieldMapping, MappingContext, MappingEngine, MappingResult, MappingSet, MultiplicityPolicy,
};
use crate::path::StaticValues;
use crate::pipeline::behaviors::{
    ErrorCaptureBehavior, OutcomeLoggingBehavior, TimingBehavior, ValidationBehavior,
};
use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::services::ServiceLocator;
use crate::transform::TransformerRegistry;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Declarative description of one integration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationDefinition {
    pub name: String,
    pub source_format: DocumentFormat,
    pub destination_format: DocumentFormat,
    /// Root element name; required for XML destinations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_root: Option<String>,
    pub mappings: Vec<FieldMapping>,
    /// Integration-local static values
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub statics: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplicity: Option<MultiplicityPolicy>,
}

impl IntegrationDefinition {
    /// Compile the mappings and check the destination can be seeded
    pub fn compile(&self) -> Result<MappingSet> {
        if self.name.trim().is_empty() {
            return Err(Error::configuration("Integration name cannot be empty"));
        }
        if self.mappings.is_empty() {
            return Err(Error::configuration(format!(
                "Integration '{}' has no mappings",
                self.name
            )));
        }
        self.seed_destination()?;
        MappingSet::compile(self.mappings.clone())
    }

    /// Fresh destination document holding only the root
    pub fn seed_destination(&self) -> Result<Document> {
        Document::empty(self.destination_format, self.destination_root.as_deref())
    }
}

/// Everything produced for one inbound request
#[derive(Debug, Clone)]
pub struct GatewayOutcome {
    pub request_id: String,
    pub result: MappingResult,
    pub document: Option<Document>,
    pub receipt: Option<DispatchReceipt>,
}

/// The standard behavior set: error capture, timing, validation and outcome logging
pub fn default_behaviors() -> PipelineBuilder {
    PipelineBuilder::new()
        .whole_run(Arc::new(ErrorCaptureBehavior))
        .whole_run(Arc::new(TimingBehavior::new()))
        .pre_run(Arc::new(ValidationBehavior))
        .post_run(Arc::new(OutcomeLoggingBehavior))
}

/// A loaded integration, shared across requests
#[derive(Clone)]
pub struct Gateway {
    definition: Arc<IntegrationDefinition>,
    mappings: Arc<MappingSet>,
    engine: MappingEngine,
    transformers: Arc<TransformerRegistry>,
    global_statics: Arc<HashMap<String, String>>,
    services: ServiceLocator,
    behaviors: PipelineBuilder,
    pipeline: Pipeline,
    dispatcher: Option<Arc<dyn Dispatcher>>,
}

impl Gateway {
    /// Compile `definition` with built-in transformers and default behaviors
    pub fn new(definition: IntegrationDefinition) -> Result<Self> {
        let mappings = Arc::new(definition.compile()?);
        let engine = MappingEngine::new().with_policy(definition.multiplicity.unwrap_or_default());
        let behaviors = default_behaviors();
        let pipeline = behaviors.clone().build(Arc::new(engine));
        info!(
            integration = %definition.name,
            mappings = mappings.len(),
            policy = %engine.policy(),
            "Integration loaded"
        );
        Ok(Self {
            definition: Arc::new(definition),
            mappings,
            engine,
            transformers: Arc::new(TransformerRegistry::with_built_ins()),
            global_statics: Arc::new(HashMap::new()),
            services: ServiceLocator::new(),
            behaviors,
            pipeline,
            dispatcher: None,
        })
    }

    /// Replace the behavior set; the mapping engine stays the core
    pub fn with_behaviors(mut self, behaviors: PipelineBuilder) -> Self {
        self.pipeline = behaviors.clone().build(Arc::new(self.engine));
        self.behaviors = behaviors;
        self
    }

    /// Override the multiplicity policy set by the definition
    pub fn with_policy(mut self, policy: MultiplicityPolicy) -> Self {
        self.engine = self.engine.with_policy(policy);
        self.pipeline = self.behaviors.clone().build(Arc::new(self.engine));
        self
    }

    pub fn with_transformers(mut self, transformers: TransformerRegistry) -> Self {
        self.transformers = Arc::new(transformers);
        self
    }

    pub fn with_global_statics(mut self, statics: HashMap<String, String>) -> Self {
        self.global_statics = Arc::new(statics);
        self
    }

    /// Register a shared service for behaviors
    pub fn with_service<T: Send + Sync + 'static>(mut self, service: Arc<T>) -> Self {
        self.services.insert(service);
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn definition(&self) -> &IntegrationDefinition {
        &self.definition
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Fresh context for one request
    pub fn context(&self, source: Document) -> Result<MappingContext> {
        let statics = StaticValues::new(self.definition.statics.clone(), self.global_statics.clone());
        Ok(MappingContext::new(self.mappings.clone(), self.transformers.clone())
            .with_source(source)
            .with_destination(self.definition.seed_destination()?)
            .with_statics(statics)
            .with_services(self.services.clone()))
    }

    /// Map inbound text without dispatching
    pub async fn map(&self, input: &str, cancellation: CancellationSignal) -> Result<GatewayOutcome> {
        self.process(input, cancellation, false).await
    }

    /// Map inbound text and, on success, hand the document to the dispatcher
    pub async fn handle(&self, input: &str, cancellation: CancellationSignal) -> Result<GatewayOutcome> {
        self.process(input, cancellation, true).await
    }

    async fn process(
        &self,
        input: &str,
        cancellation: CancellationSignal,
        dispatch: bool,
    ) -> Result<GatewayOutcome> {
        let source = Document::parse(self.definition.source_format, input)?;
        let mut ctx = self.context(source)?.with_cancellation(cancellation);
        debug!(integration = %self.definition.name, request_id = %ctx.request_id, "Request accepted");

        let result = self.pipeline.execute(&mut ctx).await?;
        let document = ctx.destination.take();

        let receipt = match (&self.dispatcher, &document) {
            (Some(dispatcher), Some(document)) if dispatch && result.is_success => Some(
                dispatcher
                    .dispatch(document, &ctx.properties, &ctx.cancellation)
                    .await?,
            ),
            _ => None,
        };

        Ok(GatewayOutcome {
            request_id: ctx.request_id,
            result,
            document,
            receipt,
        })
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("integration", &self.definition.name)
            .field("mappings", &self.mappings.len())
            .field("pipeline", &self.pipeline)
            .field("dispatcher", &self.dispatcher.is_some())
            .finish()
    }
}
