//! Shared utilities for command handlers

use crate::config::{Config, FileFormat};
use crate::error::{Error, Result};
use gatemap_core::{
    CancellationSignal, CancellationSource, Gateway, IntegrationDefinition, MultiplicityPolicy,
};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Load an integration definition, choosing the parser by file extension
pub fn load_integration(path: &Path) -> Result<IntegrationDefinition> {
    let content = read_file(path)?;

    let definition = match FileFormat::from_path(path) {
        FileFormat::Yaml => serde_yaml::from_str(&content).map_err(|e| Error::InvalidFormat {
            path: path.to_path_buf(),
            expected: format!("YAML integration definition ({})", e),
        })?,
        FileFormat::Toml => toml::from_str(&content).map_err(|e| Error::InvalidFormat {
            path: path.to_path_buf(),
            expected: format!("TOML integration definition ({})", e.message()),
        })?,
        FileFormat::Json => serde_json::from_str(&content).map_err(|e| Error::InvalidFormat {
            path: path.to_path_buf(),
            expected: format!("JSON integration definition ({})", e),
        })?,
    };

    debug!(path = %path.display(), "Integration definition loaded");
    Ok(definition)
}

/// Read a file, reporting a missing one as such
pub fn read_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(fs::read_to_string(path)?)
}

/// Build a gateway from a definition and the tool configuration
///
/// Policy precedence: command line, then the definition, then the config file.
pub fn build_gateway(
    mut definition: IntegrationDefinition,
    config: &Config,
    policy: Option<MultiplicityPolicy>,
) -> Result<Gateway> {
    if definition.multiplicity.is_none() {
        definition.multiplicity = Some(config.multiplicity);
    }

    let mut gateway = Gateway::new(definition)?.with_global_statics(config.statics.clone());
    if let Some(policy) = policy {
        gateway = gateway.with_policy(policy);
    }
    Ok(gateway)
}

/// A cancellation signal tripped by Ctrl-C
pub fn cancel_on_ctrl_c() -> CancellationSignal {
    let source = CancellationSource::new();
    let signal = source.signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling the current run");
            source.cancel();
        }
    });
    signal
}
