//! Input checks that run before any mapping work

use crate::engine::MappingContext;
use crate::pipeline::PreRunBehavior;
use crate::{Error, Result};
use async_trait::async_trait;
use tracing::debug;

/// Rejects contexts that cannot possibly map: no mappings, a missing source
/// document when a mapping reads one, or a missing destination document when
/// a mapping writes one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationBehavior;

#[async_trait]
impl PreRunBehavior for ValidationBehavior {
    fn name(&self) -> &str {
        "validation"
    }

    fn order(&self) -> i32 {
        -100
    }

    async fn execute(&self, ctx: &mut MappingContext) -> Result<()> {
        if ctx.mappings.is_empty() {
            return Err(Error::validation("mappings", "No field mappings are configured"));
        }
        if ctx.source.is_none() && ctx.mappings.requires_source() {
            return Err(Error::validation("source", "A source document is required"));
        }
        if ctx.destination.is_none() && ctx.mappings.writes_destination() {
            return Err(Error::validation("destination", "A destination document is required"));
        }
        debug!(request_id = %ctx.request_id, mappings = ctx.mappings.len(), "Context validated");
        Ok(())
    }
}
