//! Ordered application of transformers with failure isolation

use super::registry::TransformerRegistry;
use super::types::{TransformError, TransformFailure, TransformerSpec};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

/// Value after a chain run, plus any recovered failures
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainOutcome {
    pub value: Option<String>,
    pub failures: Vec<TransformFailure>,
}

/// Applies a mapping's transformers in declaration order
pub struct TransformerChain;

impl TransformerChain {
    /// Run every spec in order.
    ///
    /// A failing, panicking or unknown transformer leaves the value as it was
    /// before that step; later steps still run.
    pub fn apply(
        registry: &TransformerRegistry,
        specs: &[TransformerSpec],
        value: Option<String>,
    ) -> ChainOutcome {
        let mut outcome = ChainOutcome {
            value,
            failures: Vec::new(),
        };

        for spec in specs {
            let result = match registry.get(&spec.name) {
                Some(transformer) => catch_unwind(AssertUnwindSafe(|| {
                    transformer.transform(outcome.value.as_deref(), &spec.arguments)
                }))
                .unwrap_or_else(|panic| {
                    Err(TransformError::Panicked {
                        transformer: spec.name.clone(),
                        message: panic_message(panic.as_ref()),
                    })
                }),
                None => Err(TransformError::UnknownTransformer {
                    name: spec.name.clone(),
                }),
            };

            match result {
                Ok(next) => outcome.value = next,
                Err(error) => {
                    warn!(transformer = %spec.name, error = %error, "Transformer failed, keeping previous value");
                    outcome.failures.push(TransformFailure {
                        transformer: spec.name.clone(),
                        error,
                    });
                }
            }
        }

        outcome
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TransformerRegistry {
        let mut registry = TransformerRegistry::with_built_ins();
        registry.register_fn("Fail", |value, _| {
            Err(TransformError::invalid_input("Fail", value.unwrap_or_default(), "always fails"))
        });
        registry.register_fn("Explode", |_, _| panic!("boom"));
        registry
    }

    #[test]
    fn test_applies_in_order() {
        let specs = vec![
            TransformerSpec::new("Trim"),
            TransformerSpec::new("ToUpper"),
            TransformerSpec::new("Prefix").arg("value", "Mr "),
        ];
        let outcome = TransformerChain::apply(&registry(), &specs, Some("  doe ".to_string()));
        assert_eq!(outcome.value.as_deref(), Some("Mr DOE"));
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_failure_holds_value_and_continues() {
        let specs = vec![
            TransformerSpec::new("ToUpper"),
            TransformerSpec::new("Fail"),
            TransformerSpec::new("Suffix").arg("value", "!"),
        ];
        let outcome = TransformerChain::apply(&registry(), &specs, Some("doe".to_string()));
        assert_eq!(outcome.value.as_deref(), Some("DOE!"));
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].transformer, "Fail");
    }

    #[test]
    fn test_panic_is_contained() {
        let specs = vec![TransformerSpec::new("Explode"), TransformerSpec::new("ToLower")];
        let outcome = TransformerChain::apply(&registry(), &specs, Some("ABC".to_string()));
        assert_eq!(outcome.value.as_deref(), Some("abc"));
        assert!(matches!(
            &outcome.failures[0].error,
            TransformError::Panicked { message, .. } if message == "boom"
        ));
    }

    #[test]
    fn test_unknown_transformer_is_recorded() {
        let specs = vec![TransformerSpec::new("Nope")];
        let outcome = TransformerChain::apply(&registry(), &specs, Some("x".to_string()));
        assert_eq!(outcome.value.as_deref(), Some("x"));
        assert!(matches!(
            outcome.failures[0].error,
            TransformError::UnknownTransformer { .. }
        ));
    }
}
