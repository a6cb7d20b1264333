//! Gatemap Core - declarative payload translation for protocol gateways
//!
//! This crate turns an inbound tree-shaped payload into a differently shaped
//! outbound payload by applying an ordered list of field mappings
//! (resolve -> transform -> write), wrapped in a pipeline of ordered
//! behaviors.
//!
//! # Main Components
//!
//! - **Paths**: JSON tree paths (`$.a.b[0]`), XML element paths (`/A/B/@c`)
//!   and static references (`$$Key`)
//! - **Transformers**: named, argument-driven value transformations applied as
//!   a failure-isolating chain
//! - **Writer**: destination writes with auto-vivification of missing nodes
//! - **Engine**: per-field mapping with multiplicity reconciliation
//! - **Pipeline**: pre-run, post-run and whole-run behaviors around the engine
//! - **Token cache**: shared credentials with single-flight refresh
//!
//! # Example
//!
//! ```
//! use gatemap_core::{CancellationSignal, Gateway, IntegrationDefinition};
//!
//! # async fn example() -> gatemap_core::Result<()> {
//! let definition: IntegrationDefinition = serde_json::from_str(r#"{
//!     "name": "customers",
//!     "source_format": "json",
//!     "destination_format": "xml",
//!     "destination_root": "Customer",
//!     "mappings": [
//!         {"source": "$.name", "destination": "/Customer/Name",
//!          "transformers": [{"name": "ToUpper"}]}
//!     ]
//! }"#)?;
//!
//! let gateway = Gateway::new(definition)?;
//! let outcome = gateway.map(r#"{"name": "ada"}"#, CancellationSignal::never()).await?;
//! assert!(outcome.result.is_success);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cancel;
pub mod dispatch;
pub mod document;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod path;
pub mod pipeline;
pub mod services;
pub mod transform;
pub mod writer;

// Re-export main types for convenience
pub use cache::{AccessToken, HttpTokenSource, TokenCache, TokenSource};
pub use cancel::{CancellationSignal, CancellationSource};
pub use dispatch::{DispatchReceipt, Dispatcher, HttpDispatcher, RetryPolicy};
pub use document::{Document, DocumentFormat, XmlElement};
pub use engine::{
    FieldMapping, MappingContext, MappingEngine, MappingResult, MappingSet, MappingStats,
    MappingWarning, MultiplicityPolicy, Properties, WarningKind,
};
pub use error::{Error, Result, Severity};
pub use gateway::{default_behaviors, Gateway, GatewayOutcome, IntegrationDefinition};
pub use path::{Resolution, SourcePath, StaticValues};
pub use pipeline::{
    CoreOperation, Next, Pipeline, PipelineBuilder, PostRunBehavior, PreRunBehavior,
    WholeRunBehavior,
};
pub use services::ServiceLocator;
pub use transform::{Transformer, TransformerRegistry, TransformerSpec};
pub use writer::{DestinationPath, WriteError, MAX_WRITE_INDEX};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
