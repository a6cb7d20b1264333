//! Value transformers applied between resolution and writing
//!
//! # Module Organization
//!
//! - [`types`] - the [`Transformer`] trait, arguments, specs and errors
//! - [`registry`] - name -> transformer lookup, last registration wins
//! - [`chain`] - in-order application with failure isolation
//! - [`built_in`] - the stock transformers
//!
//! # Examples
//!
//! ```
//! use gatemap_core::transform::{TransformerChain, TransformerRegistry, TransformerSpec};
//!
//! let registry = TransformerRegistry::with_built_ins();
//! let specs = vec![TransformerSpec::new("Trim"), TransformerSpec::new("ToUpper")];
//!
//! let outcome = TransformerChain::apply(&registry, &specs, Some(" doe ".to_string()));
//! assert_eq!(outcome.value.as_deref(), Some("DOE"));
//! ```

pub mod built_in;
pub mod chain;
pub mod registry;
pub mod types;

pub use chain::{ChainOutcome, TransformerChain};
pub use registry::TransformerRegistry;
pub use types::{
    FnTransformer, TransformError, TransformFailure, Transformer, TransformerArgs,
    TransformerSpec,
};
