//! Wall-clock timing of everything inside the behavior

use crate::engine::{MappingContext, MappingResult};
use crate::pipeline::{Next, WholeRunBehavior};
use crate::Result;
use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

/// Property key holding the elapsed milliseconds
pub const ELAPSED_MS: &str = "elapsed_ms";

/// Records `elapsed_ms` on the context and, when the run succeeds, the result
#[derive(Debug, Clone, Copy)]
pub struct TimingBehavior {
    order: i32,
}

impl TimingBehavior {
    pub fn new() -> Self {
        Self { order: 0 }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

impl Default for TimingBehavior {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WholeRunBehavior for TimingBehavior {
    fn name(&self) -> &str {
        "timing"
    }

    fn order(&self) -> i32 {
        self.order
    }

    async fn execute(&self, ctx: &mut MappingContext, next: Next) -> Result<MappingResult> {
        let started = Instant::now();
        let outcome = next.run(ctx).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        debug!(request_id = %ctx.request_id, elapsed_ms, "Run timed");
        ctx.properties.insert(ELAPSED_MS.to_string(), elapsed_ms.into());
        outcome.map(|result| result.with_property(ELAPSED_MS, elapsed_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MappingSet;
    use crate::pipeline::{CoreOperation, PipelineBuilder};
    use crate::transform::TransformerRegistry;
    use std::sync::Arc;
    use std::time::Duration;

    struct Slow;

    #[async_trait]
    impl CoreOperation for Slow {
        async fn run(&self, _ctx: &mut MappingContext) -> Result<MappingResult> {
            tokio::time::sleep(Duration::from_millis(250)).await;
            Ok(MappingResult::success())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_records_elapsed_time() {
        let pipeline = PipelineBuilder::new()
            .whole_run(Arc::new(TimingBehavior::new()))
            .build(Arc::new(Slow));
        let mut ctx =
            MappingContext::new(Arc::new(MappingSet::default()), Arc::new(TransformerRegistry::new()));

        let result = pipeline.execute(&mut ctx).await.unwrap();
        let elapsed = result.properties[ELAPSED_MS].as_u64().unwrap();
        assert!(elapsed >= 250);
        assert_eq!(ctx.properties[ELAPSED_MS], result.properties[ELAPSED_MS]);
    }
}
