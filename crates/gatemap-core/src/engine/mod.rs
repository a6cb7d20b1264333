//! Mapping engine
//!
//! Applies an ordered [`MappingSet`] to a source document, writing into a
//! destination document:
//!
//! ```
//! use gatemap_core::document::{Document, DocumentFormat};
//! use gatemap_core::engine::{FieldMapping, MappingEngine, MappingSet};
//! use gatemap_core::path::StaticValues;
//! use gatemap_core::transform::TransformerRegistry;
//!
//! let mappings = MappingSet::compile(vec![
//!     FieldMapping::new("$.customer.name", "/Customer/Name"),
//! ]).unwrap();
//! let source = Document::parse(DocumentFormat::Json, r#"{"customer":{"name":"Ada"}}"#).unwrap();
//! let mut destination = Document::empty(DocumentFormat::Xml, Some("Customer")).unwrap();
//!
//! let result = MappingEngine::new().apply_mapping(
//!     &mappings,
//!     Some(&source),
//!     Some(&mut destination),
//!     &StaticValues::default(),
//!     &TransformerRegistry::with_built_ins(),
//! );
//! assert!(result.is_success);
//! assert_eq!(destination.render(false).unwrap(), "<Customer><Name>Ada</Name></Customer>");
//! ```

pub mod context;
pub mod mapping;
pub mod multiplicity;
pub mod result;

pub use context::{MappingContext, Properties};
pub use mapping::{CompiledMapping, FieldMapping, MappingEngine, MappingSet};
pub use multiplicity::{reconcile, MultiplicityPolicy, Reconciliation, WritePlan};
pub use result::{MappingResult, MappingStats, MappingWarning, WarningKind};
