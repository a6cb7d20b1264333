//! Validate command handler

use super::utils::load_integration;
use crate::cli::ValidateArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::{MappingCheck, OutputWriter, ValidationReport};
use gatemap_core::{
    DestinationPath, DocumentFormat, FieldMapping, IntegrationDefinition, SourcePath,
    TransformerRegistry,
};
use tracing::instrument;

/// Handle the validate command
#[instrument(skip(_config, output), fields(integration = %args.integration.display()))]
pub async fn handle_validate(
    args: ValidateArgs,
    _config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    output.info(&format!("Validating integration: {}", args.integration.display()))?;

    let definition = load_integration(&args.integration)?;
    let report = check_integration(&definition, &TransformerRegistry::with_built_ins());
    output.validation_report(&report, args.detailed)?;

    if report.valid {
        Ok(())
    } else {
        Err(Error::InvalidIntegration {
            name: report.integration.clone(),
            count: report.invalid_count() + report.errors.len(),
        })
    }
}

/// Check every mapping of `definition` without running it
pub fn check_integration(
    definition: &IntegrationDefinition,
    registry: &TransformerRegistry,
) -> ValidationReport {
    let mut errors = Vec::new();
    if definition.name.trim().is_empty() {
        errors.push("Integration name cannot be empty".to_string());
    }
    if definition.mappings.is_empty() {
        errors.push("Integration has no mappings".to_string());
    }
    if let Err(e) = definition.seed_destination() {
        errors.push(e.to_string());
    }

    let mappings: Vec<MappingCheck> = definition
        .mappings
        .iter()
        .enumerate()
        .map(|(i, mapping)| check_mapping(i + 1, mapping, definition, registry))
        .collect();

    let valid = errors.is_empty() && mappings.iter().all(MappingCheck::is_valid);
    ValidationReport {
        integration: definition.name.clone(),
        source_format: definition.source_format.to_string(),
        destination_format: definition.destination_format.to_string(),
        valid,
        errors,
        mappings,
    }
}

fn check_mapping(
    index: usize,
    mapping: &FieldMapping,
    definition: &IntegrationDefinition,
    registry: &TransformerRegistry,
) -> MappingCheck {
    let mut errors = Vec::new();

    match SourcePath::parse(&mapping.source) {
        Ok(SourcePath::Tree(_)) if definition.source_format == DocumentFormat::Xml => {
            errors.push("source: a '$.' path cannot resolve against an xml source".to_string())
        }
        Ok(SourcePath::Element(_)) if definition.source_format == DocumentFormat::Json => {
            errors.push("source: a '/' path cannot resolve against a json source".to_string())
        }
        Ok(_) => {}
        Err(e) => errors.push(format!("source: {}", e)),
    }

    let destination = (!mapping.destination.trim().is_empty()).then(|| mapping.destination.clone());
    if let Some(destination) = &destination {
        match DestinationPath::parse(destination) {
            Ok(DestinationPath::Tree(_)) if definition.destination_format == DocumentFormat::Xml => {
                errors.push("destination: a '$.' path cannot be written into an xml document".to_string())
            }
            Ok(DestinationPath::Element(_))
                if definition.destination_format == DocumentFormat::Json =>
            {
                errors.push("destination: a '/' path cannot be written into a json document".to_string())
            }
            Ok(_) => {}
            Err(e) => errors.push(format!("destination: {}", e)),
        }
    }

    for spec in &mapping.transformers {
        if !registry.contains(&spec.name) {
            errors.push(format!("transformer: '{}' is not registered", spec.name));
        }
    }

    MappingCheck {
        index,
        source: mapping.source.clone(),
        destination,
        transformers: mapping.transformers.iter().map(|t| t.name.clone()).collect(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatemap_core::TransformerSpec;

    fn definition(mappings: Vec<FieldMapping>) -> IntegrationDefinition {
        IntegrationDefinition {
            name: "crm-sync".to_string(),
            source_format: DocumentFormat::Json,
            destination_format: DocumentFormat::Xml,
            destination_root: Some("Customer".to_string()),
            mappings,
            statics: Default::default(),
            multiplicity: None,
        }
    }

    #[test]
    fn test_valid_integration() {
        let def = definition(vec![
            FieldMapping::new("$.name", "/Customer/Name").transformer(TransformerSpec::new("ToUpper")),
            FieldMapping::new("$$Channel", "/Customer/@channel"),
            FieldMapping::new("$.id", ""),
        ]);
        let report = check_integration(&def, &TransformerRegistry::with_built_ins());
        assert!(report.valid, "{:?}", report);
        assert_eq!(report.mappings[2].destination, None);
    }

    #[test]
    fn test_reports_each_broken_mapping() {
        let def = definition(vec![
            FieldMapping::new("$.name", "/Customer/Name"),
            FieldMapping::new("name", "/Customer/Name"),
            FieldMapping::new("$.id", "$.customer.id"),
            FieldMapping::new("$.tier", "/Customer/Tier").transformer(TransformerSpec::new("Nope")),
        ]);
        let report = check_integration(&def, &TransformerRegistry::with_built_ins());

        assert!(!report.valid);
        assert_eq!(report.invalid_count(), 3);
        assert!(report.mappings[0].is_valid());
        assert!(report.mappings[1].errors[0].starts_with("source:"));
        assert!(report.mappings[2].errors[0].contains("xml document"));
        assert_eq!(report.mappings[3].errors, vec!["transformer: 'Nope' is not registered"]);
    }

    #[test]
    fn test_missing_root_is_an_integration_error() {
        let mut def = definition(vec![FieldMapping::new("$.name", "/Customer/Name")]);
        def.destination_root = None;
        let report = check_integration(&def, &TransformerRegistry::with_built_ins());
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.invalid_count(), 0);
    }
}
