//! Field mappings and the mapping engine
//!
//! Mappings are compiled once, when an integration is loaded: every source
//! and destination path is parsed up front so malformed syntax fails fast.
//! The engine then processes mappings in declaration order, resolving,
//! transforming and writing one field at a time. Only structural problems
//! fail a run; per-field problems become warnings on the result.

use super::context::MappingContext;
use super::multiplicity::{reconcile, MultiplicityPolicy, WritePlan};
use super::result::{MappingResult, WarningKind};
use crate::cancel::CancellationSignal;
use crate::document::Document;
use crate::path::{SourcePath, StaticValues};
use crate::pipeline::CoreOperation;
use crate::transform::{TransformerChain, TransformerRegistry, TransformerSpec};
use crate::writer::DestinationPath;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One declarative field rule as loaded from configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(alias = "Source")]
    pub source: String,
    /// Empty means resolve only
    #[serde(default, alias = "Destination")]
    pub destination: String,
    #[serde(default, alias = "Transformers")]
    pub transformers: Vec<TransformerSpec>,
}

impl FieldMapping {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            transformers: Vec::new(),
        }
    }

    pub fn transformer(mut self, spec: TransformerSpec) -> Self {
        self.transformers.push(spec);
        self
    }
}

/// A field mapping with its paths parsed
#[derive(Debug, Clone)]
pub struct CompiledMapping {
    pub definition: FieldMapping,
    pub source: SourcePath,
    pub destination: Option<DestinationPath>,
}

impl CompiledMapping {
    fn compile(position: usize, definition: FieldMapping) -> Result<Self> {
        if definition.source.trim().is_empty() {
            return Err(Error::configuration(format!(
                "Mapping #{} has an empty source path",
                position + 1
            )));
        }
        let source = SourcePath::parse(&definition.source)?;
        let destination = if definition.destination.trim().is_empty() {
            None
        } else {
            Some(DestinationPath::parse(&definition.destination)?)
        };
        Ok(Self {
            definition,
            source,
            destination,
        })
    }

    pub fn transformers(&self) -> &[TransformerSpec] {
        &self.definition.transformers
    }
}

/// An ordered, compiled list of field mappings
#[derive(Debug, Clone, Default)]
pub struct MappingSet {
    mappings: Vec<CompiledMapping>,
}

impl MappingSet {
    /// Compile every mapping, failing on the first malformed path
    pub fn compile(mappings: Vec<FieldMapping>) -> Result<Self> {
        let mappings = mappings
            .into_iter()
            .enumerate()
            .map(|(position, definition)| CompiledMapping::compile(position, definition))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { mappings })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompiledMapping> {
        self.mappings.iter()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Whether any mapping reads from the source document
    pub fn requires_source(&self) -> bool {
        self.mappings.iter().any(|m| m.source.needs_document())
    }

    /// Whether any mapping writes to the destination document
    pub fn writes_destination(&self) -> bool {
        self.mappings.iter().any(|m| m.destination.is_some())
    }
}

impl<'a> IntoIterator for &'a MappingSet {
    type Item = &'a CompiledMapping;
    type IntoIter = std::slice::Iter<'a, CompiledMapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.mappings.iter()
    }
}

/// Applies a mapping set to a source/destination pair
#[derive(Debug, Clone, Copy, Default)]
pub struct MappingEngine {
    policy: MultiplicityPolicy,
}

impl MappingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: MultiplicityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> MultiplicityPolicy {
        self.policy
    }

    /// Apply every mapping in order
    pub fn apply_mapping(
        &self,
        mappings: &MappingSet,
        source: Option<&Document>,
        destination: Option<&mut Document>,
        statics: &StaticValues,
        registry: &TransformerRegistry,
    ) -> MappingResult {
        self.run_mappings(mappings, source, destination, statics, registry, None)
            .unwrap_or_else(MappingResult::from_error)
    }

    fn run_mappings(
        &self,
        mappings: &MappingSet,
        source: Option<&Document>,
        mut destination: Option<&mut Document>,
        statics: &StaticValues,
        registry: &TransformerRegistry,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<MappingResult> {
        if mappings.is_empty() {
            return Ok(MappingResult::failure("No mappings supplied"));
        }
        if source.is_none() && destination.is_none() {
            return Ok(MappingResult::failure(
                "Neither a source nor a destination document was supplied",
            ));
        }

        let mut result = MappingResult::success();
        for mapping in mappings {
            if let Some(signal) = cancellation {
                signal.check("mapping")?;
            }
            self.apply_one(mapping, source, destination.as_deref_mut(), statics, registry, &mut result);
        }

        debug!(
            applied = result.stats.mappings_applied,
            skipped = result.stats.mappings_skipped,
            written = result.stats.values_written,
            warnings = result.warning_count(),
            "Mapping run finished"
        );
        Ok(result)
    }

    fn apply_one(
        &self,
        mapping: &CompiledMapping,
        source: Option<&Document>,
        destination: Option<&mut Document>,
        statics: &StaticValues,
        registry: &TransformerRegistry,
        result: &mut MappingResult,
    ) {
        let resolution = mapping.source.resolve(source, statics);
        if resolution.is_empty() {
            debug!(source = %mapping.source, "No value resolved, mapping skipped");
            result.stats.mappings_skipped += 1;
            return;
        }

        let multi = resolution.multi;
        let mut values = Vec::with_capacity(resolution.len());
        for value in resolution.values {
            let outcome = TransformerChain::apply(registry, mapping.transformers(), value);
            for failure in outcome.failures {
                result.warn(
                    &mapping.source,
                    mapping.destination.as_ref(),
                    WarningKind::TransformerFailed,
                    failure.error.to_string(),
                );
            }
            values.push(outcome.value);
        }

        let Some(target) = &mapping.destination else {
            result.stats.mappings_applied += 1;
            return;
        };
        let Some(doc) = destination else {
            warn!(source = %mapping.source, destination = %target, "No destination document to write into");
            result.warn(
                &mapping.source,
                Some(target),
                WarningKind::WriteFailed,
                "No destination document supplied",
            );
            result.stats.mappings_skipped += 1;
            return;
        };

        let reconciliation = reconcile(target, multi, values.len(), self.policy);
        if reconciliation.mismatch {
            warn!(
                source = %mapping.source,
                destination = %target,
                count = values.len(),
                policy = %self.policy,
                "Several values resolved for a single-valued destination"
            );
            result.warn(
                &mapping.source,
                Some(target),
                WarningKind::MultiplicityMismatch,
                format!(
                    "{} values resolved for a single-valued destination, applied policy '{}'",
                    values.len(),
                    self.policy
                ),
            );
        }

        let writes: Vec<(Option<usize>, Option<&str>)> = match reconciliation.plan {
            WritePlan::Each => values
                .iter()
                .enumerate()
                .map(|(index, value)| (Some(index), value.as_deref()))
                .collect(),
            WritePlan::One(index) => values
                .get(index)
                .map(|value| vec![(None, value.as_deref())])
                .unwrap_or_default(),
            WritePlan::Nothing => Vec::new(),
        };

        let mut written = 0;
        for (slot, value) in writes {
            match target.write(doc, value, slot) {
                Ok(()) => written += 1,
                Err(error) => {
                    warn!(source = %mapping.source, destination = %target, error = %error, "Write failed");
                    result.warn(&mapping.source, Some(target), WarningKind::WriteFailed, error.to_string());
                }
            }
        }

        result.stats.values_written += written;
        if written > 0 {
            result.stats.mappings_applied += 1;
        } else {
            result.stats.mappings_skipped += 1;
        }
    }
}

#[async_trait]
impl CoreOperation for MappingEngine {
    async fn run(&self, ctx: &mut MappingContext) -> Result<MappingResult> {
        let MappingContext {
            source,
            destination,
            mappings,
            statics,
            properties,
            transformers,
            cancellation,
            ..
        } = ctx;

        let mut result = self.run_mappings(
            mappings,
            source.as_ref(),
            destination.as_mut(),
            statics,
            transformers,
            Some(cancellation),
        )?;
        result
            .properties
            .extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentFormat;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn set(mappings: Vec<FieldMapping>) -> MappingSet {
        MappingSet::compile(mappings).unwrap()
    }

    fn xml(root: &str) -> Document {
        Document::empty(DocumentFormat::Xml, Some(root)).unwrap()
    }

    #[test]
    fn test_compile_fails_fast() {
        assert!(matches!(
            MappingSet::compile(vec![FieldMapping::new("", "/R/A")]),
            Err(Error::Configuration { .. })
        ));
        assert!(matches!(
            MappingSet::compile(vec![FieldMapping::new("$.a[", "/R/A")]),
            Err(Error::Path { .. })
        ));
        assert!(matches!(
            MappingSet::compile(vec![FieldMapping::new("$.a", "$..b")]),
            Err(Error::Path { .. })
        ));
        let compiled = set(vec![FieldMapping::new("$.a", "")]);
        assert!(!compiled.writes_destination());
    }

    #[test]
    fn test_structural_failures() {
        let engine = MappingEngine::new();
        let registry = TransformerRegistry::new();
        let statics = StaticValues::default();

        let result = engine.apply_mapping(&MappingSet::default(), None, None, &statics, &registry);
        assert!(!result.is_success);
        assert!(result.error_message.is_some());

        let mappings = set(vec![FieldMapping::new("$.a", "$.b")]);
        let result = engine.apply_mapping(&mappings, None, None, &statics, &registry);
        assert!(!result.is_success);
    }

    #[test]
    fn test_missing_fields_are_skipped() {
        let engine = MappingEngine::new();
        let mappings = set(vec![
            FieldMapping::new("$.missing", "/R/A"),
            FieldMapping::new("$.present", "/R/B"),
        ]);
        let source = Document::Json(json!({"present": "yes"}));
        let mut dest = xml("R");

        let result = engine.apply_mapping(
            &mappings,
            Some(&source),
            Some(&mut dest),
            &StaticValues::default(),
            &TransformerRegistry::new(),
        );
        assert!(result.is_success);
        assert_eq!(result.stats.mappings_skipped, 1);
        assert_eq!(result.stats.mappings_applied, 1);
        assert_eq!(dest.render(false).unwrap(), "<R><B>yes</B></R>");
    }

    #[test]
    fn test_write_failures_become_warnings() {
        let engine = MappingEngine::new();
        let mappings = set(vec![
            FieldMapping::new("$.a", "/Other/A"),
            FieldMapping::new("$.a", "/R/A"),
        ]);
        let source = Document::Json(json!({"a": "1"}));
        let mut dest = xml("R");

        let result = engine.apply_mapping(
            &mappings,
            Some(&source),
            Some(&mut dest),
            &StaticValues::default(),
            &TransformerRegistry::new(),
        );
        assert!(result.is_success);
        assert_eq!(result.warning_count(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::WriteFailed);
        assert_eq!(dest.render(false).unwrap(), "<R><A>1</A></R>");
    }

    #[test]
    fn test_source_only_run_records_write_warnings() {
        let engine = MappingEngine::new();
        let mappings = set(vec![
            FieldMapping::new("$.a", "$.b"),
            FieldMapping::new("$.a", ""),
        ]);
        let source = Document::Json(json!({"a": "1"}));

        let result = engine.apply_mapping(
            &mappings,
            Some(&source),
            None,
            &StaticValues::default(),
            &TransformerRegistry::new(),
        );
        assert!(result.is_success);
        assert_eq!(result.warnings[0].kind, WarningKind::WriteFailed);
        assert_eq!(result.stats.mappings_applied, 1);
    }

    #[test]
    fn test_multiplicity_policies() {
        let mappings = set(vec![FieldMapping::new("$.items[*]", "$.first")]);
        let source = Document::Json(json!({"items": ["a", "b", "c"]}));
        let run = |policy| {
            let mut dest = Document::Json(json!({}));
            let result = MappingEngine::new().with_policy(policy).apply_mapping(
                &mappings,
                Some(&source),
                Some(&mut dest),
                &StaticValues::default(),
                &TransformerRegistry::new(),
            );
            (result, dest)
        };

        let (result, dest) = run(MultiplicityPolicy::FirstValue);
        assert_eq!(dest, Document::Json(json!({"first": "a"})));
        assert_eq!(result.warnings[0].kind, WarningKind::MultiplicityMismatch);

        let (_, dest) = run(MultiplicityPolicy::LastValue);
        assert_eq!(dest, Document::Json(json!({"first": "c"})));

        let (result, dest) = run(MultiplicityPolicy::Skip);
        assert_eq!(dest, Document::Json(json!({})));
        assert_eq!(result.stats.mappings_skipped, 1);
    }

    #[test]
    fn test_statics_write_without_source_document() {
        let mappings = set(vec![FieldMapping::new("$$Country", "/R/@country")]);
        let statics = StaticValues::new(
            HashMap::new(),
            Arc::new(HashMap::from([("Country".to_string(), "US".to_string())])),
        );
        let mut dest = xml("R");
        let result = MappingEngine::new().apply_mapping(
            &mappings,
            None,
            Some(&mut dest),
            &statics,
            &TransformerRegistry::new(),
        );
        assert!(result.is_success);
        assert_eq!(dest.render(false).unwrap(), r#"<R country="US"/>"#);
    }

    #[tokio::test]
    async fn test_core_operation_honours_cancellation() {
        let source = crate::cancel::CancellationSource::new();
        source.cancel();
        let mut ctx = MappingContext::new(
            Arc::new(set(vec![FieldMapping::new("$.a", "$.b")])),
            Arc::new(TransformerRegistry::new()),
        )
        .with_source(Document::Json(json!({"a": 1})))
        .with_destination(Document::Json(json!({})))
        .with_cancellation(source.signal());

        let err = MappingEngine::new().run(&mut ctx).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_core_operation_copies_properties() {
        let mut ctx = MappingContext::new(
            Arc::new(set(vec![FieldMapping::new("$.a", "$.b")])),
            Arc::new(TransformerRegistry::new()),
        )
        .with_source(Document::Json(json!({"a": 1})))
        .with_destination(Document::Json(json!({})))
        .with_property("tenant", "acme");

        let result = MappingEngine::new().run(&mut ctx).await.unwrap();
        assert_eq!(result.properties["tenant"], "acme");
        assert_eq!(ctx.destination, Some(Document::Json(json!({"b": "1"}))));
    }
}
