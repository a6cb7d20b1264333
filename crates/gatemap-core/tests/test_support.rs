//! Shared test support utilities for integration tests

#![allow(dead_code)]

use gatemap_core::{
    Document, DocumentFormat, FieldMapping, MappingEngine, MappingResult, MappingSet,
    StaticValues, TransformerRegistry, TransformerSpec,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Shorthand for a mapping without transformers
pub fn mapping(source: &str, destination: &str) -> FieldMapping {
    FieldMapping::new(source, destination)
}

/// Shorthand for a mapping with argument-free transformers
pub fn mapping_with(source: &str, destination: &str, transformers: &[&str]) -> FieldMapping {
    transformers
        .iter()
        .fold(FieldMapping::new(source, destination), |m, name| {
            m.transformer(TransformerSpec::new(*name))
        })
}

pub fn json(text: &str) -> Document {
    Document::parse(DocumentFormat::Json, text).expect("valid JSON fixture")
}

pub fn xml_root(root: &str) -> Document {
    Document::empty(DocumentFormat::Xml, Some(root)).expect("valid root")
}

pub fn statics(local: &[(&str, &str)], global: &[(&str, &str)]) -> StaticValues {
    let to_map = |pairs: &[(&str, &str)]| {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>()
    };
    StaticValues::new(to_map(local), Arc::new(to_map(global)))
}

/// Compile and run `mappings` with the built-in transformers
pub fn run(
    engine: &MappingEngine,
    mappings: Vec<FieldMapping>,
    source: Option<&Document>,
    destination: &mut Document,
    statics: &StaticValues,
) -> MappingResult {
    let set = MappingSet::compile(mappings).expect("mappings compile");
    engine.apply_mapping(
        &set,
        source,
        Some(destination),
        statics,
        &TransformerRegistry::with_built_ins(),
    )
}
