//! Converts pipeline errors into failed results

use crate::engine::{MappingContext, MappingResult};
use crate::pipeline::{Next, WholeRunBehavior};
use crate::Result;
use async_trait::async_trait;
use tracing::error;

/// Outermost whole-run behavior: any error from inside becomes a failed
/// [`MappingResult`] carrying the error as its cause. Cancellation is not
/// captured so callers can tell it apart.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorCaptureBehavior;

#[async_trait]
impl WholeRunBehavior for ErrorCaptureBehavior {
    fn name(&self) -> &str {
        "error_capture"
    }

    fn order(&self) -> i32 {
        i32::MIN
    }

    async fn execute(&self, ctx: &mut MappingContext, next: Next) -> Result<MappingResult> {
        match next.run(ctx).await {
            Err(err) if !err.is_cancelled() => {
                error!(request_id = %ctx.request_id, error = %err, severity = ?err.severity(), "Mapping run failed");
                Ok(MappingResult::from_error(err))
            }
            other => other,
        }
    }
}
