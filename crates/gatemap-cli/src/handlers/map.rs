//! Map command handler

use super::utils::{build_gateway, cancel_on_ctrl_c, load_integration, read_file};
use crate::cli::MapArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::{OutputWriter, RunReport};
use std::fs;
use tracing::{info, instrument};

/// Handle the map command
#[instrument(skip(config, output), fields(integration = %args.integration.display()))]
pub async fn handle_map(args: MapArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let timer = Timer::with_details("map_command", &args.input.display().to_string());

    let definition = load_integration(&args.integration)?;
    let input = read_file(&args.input)?;
    let gateway = build_gateway(definition, config, args.policy.map(Into::into))?;
    output.debug(&format!("Loaded {:?}", gateway))?;

    let outcome = gateway.map(&input, cancel_on_ctrl_c()).await?;
    let mut report = RunReport::from_outcome(&gateway.definition().name, &outcome, args.pretty)?;

    if let Some(path) = &args.save_to {
        if let Some(document) = report.document.take() {
            fs::write(path, document)?;
            report.saved_to = Some(path.clone());
        }
    }

    info!(
        request_id = %report.request_id,
        success = report.is_success,
        warnings = report.warnings.len(),
        elapsed_ms = timer.elapsed().as_millis() as u64,
        "Map command finished"
    );
    output.run_report(&report)?;

    if report.is_success {
        Ok(())
    } else {
        Err(Error::MappingFailed(
            report.error_message.unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}
