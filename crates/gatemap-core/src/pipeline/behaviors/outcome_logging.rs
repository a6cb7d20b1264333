//! Outcome logging after the core has run

use crate::engine::{MappingContext, MappingResult};
use crate::pipeline::PostRunBehavior;
use crate::Result;
use async_trait::async_trait;
use tracing::{info, warn};

/// Property key holding the warning count
pub const WARNINGS: &str = "warnings";

/// Logs the run outcome and annotates the warning count on the result
#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomeLoggingBehavior;

#[async_trait]
impl PostRunBehavior for OutcomeLoggingBehavior {
    fn name(&self) -> &str {
        "outcome_logging"
    }

    fn order(&self) -> i32 {
        1000
    }

    async fn execute(&self, ctx: &mut MappingContext, result: &mut MappingResult) -> Result<()> {
        let warnings = result.warning_count();
        result.properties.insert(WARNINGS.to_string(), warnings.into());

        if !result.is_success {
            warn!(
                request_id = %ctx.request_id,
                error = result.error_message.as_deref().unwrap_or_default(),
                "Mapping failed"
            );
            return Ok(());
        }

        for warning in &result.warnings {
            warn!(
                request_id = %ctx.request_id,
                source = %warning.source,
                destination = %warning.destination,
                kind = %warning.kind,
                "{}",
                warning.message
            );
        }
        info!(
            request_id = %ctx.request_id,
            applied = result.stats.mappings_applied,
            skipped = result.stats.mappings_skipped,
            written = result.stats.values_written,
            warnings,
            "Mapping succeeded"
        );
        Ok(())
    }
}
