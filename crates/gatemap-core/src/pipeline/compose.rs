//! Composition of behaviors around a core operation
//!
//! The composed handler is a single boxed closure, folded once when the
//! pipeline is built. Executing a pipeline never re-sorts or re-wraps.

use super::behavior::{CoreOperation, PostRunBehavior, PreRunBehavior, WholeRunBehavior};
use crate::engine::{MappingContext, MappingResult};
use crate::Result;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, Instrument};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Handler = Arc<
    dyn for<'c> Fn(&'c mut MappingContext) -> BoxFuture<'c, Result<MappingResult>> + Send + Sync,
>;

fn handler<F>(f: F) -> Handler
where
    F: for<'c> Fn(&'c mut MappingContext) -> BoxFuture<'c, Result<MappingResult>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Continuation handed to a whole-run behavior
#[derive(Clone)]
pub struct Next {
    handler: Handler,
}

impl Next {
    /// Run everything inside the calling behavior
    pub async fn run(&self, ctx: &mut MappingContext) -> Result<MappingResult> {
        (self.handler)(ctx).await
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// Collects behaviors before composing them around a core operation
#[derive(Default, Clone)]
pub struct PipelineBuilder {
    pre_run: Vec<Arc<dyn PreRunBehavior>>,
    post_run: Vec<Arc<dyn PostRunBehavior>>,
    whole_run: Vec<Arc<dyn WholeRunBehavior>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pre_run(mut self, behavior: Arc<dyn PreRunBehavior>) -> Self {
        self.pre_run.push(behavior);
        self
    }

    pub fn post_run(mut self, behavior: Arc<dyn PostRunBehavior>) -> Self {
        self.post_run.push(behavior);
        self
    }

    pub fn whole_run(mut self, behavior: Arc<dyn WholeRunBehavior>) -> Self {
        self.whole_run.push(behavior);
        self
    }

    /// Sort every list by order and fold the whole-run behaviors around the core
    pub fn build(self, core: Arc<dyn CoreOperation>) -> Pipeline {
        let PipelineBuilder {
            mut pre_run,
            mut post_run,
            mut whole_run,
        } = self;

        // Stable sorts: equal orders keep registration order.
        pre_run.sort_by_key(|b| b.order());
        post_run.sort_by_key(|b| b.order());
        whole_run.sort_by_key(|b| b.order());

        let layout = PipelineLayout {
            whole_run: whole_run.iter().map(|b| b.name().to_string()).collect(),
            pre_run: pre_run.iter().map(|b| b.name().to_string()).collect(),
            post_run: post_run.iter().map(|b| b.name().to_string()).collect(),
        };
        debug!(
            whole_run = ?layout.whole_run,
            pre_run = ?layout.pre_run,
            post_run = ?layout.post_run,
            "Pipeline composed"
        );

        let pre_run: Arc<[Arc<dyn PreRunBehavior>]> = pre_run.into();
        let post_run: Arc<[Arc<dyn PostRunBehavior>]> = post_run.into();

        let mut composed = handler(move |ctx| {
            let pre_run = pre_run.clone();
            let post_run = post_run.clone();
            let core = core.clone();
            Box::pin(async move {
                for behavior in pre_run.iter() {
                    ctx.cancellation.check(behavior.name())?;
                    behavior.execute(ctx).await?;
                }
                ctx.cancellation.check("mapping")?;
                let mut result = core.run(ctx).await?;
                for behavior in post_run.iter() {
                    behavior.execute(ctx, &mut result).await?;
                }
                Ok(result)
            })
        });

        // Highest order is wrapped first, so the lowest order ends up outermost.
        for behavior in whole_run.into_iter().rev() {
            let next = Next { handler: composed };
            composed = handler(move |ctx| {
                let behavior = behavior.clone();
                let next = next.clone();
                Box::pin(async move { behavior.execute(ctx, next).await })
            });
        }

        Pipeline {
            handler: composed,
            layout: Arc::new(layout),
        }
    }
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("pre_run", &self.pre_run.len())
            .field("post_run", &self.post_run.len())
            .field("whole_run", &self.whole_run.len())
            .finish()
    }
}

/// Behavior names in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineLayout {
    /// Outermost first
    pub whole_run: Vec<String>,
    pub pre_run: Vec<String>,
    pub post_run: Vec<String>,
}

/// A composed, reusable pipeline.
///
/// Cloning is cheap; clones share the composed handler and may execute
/// concurrently for independent contexts.
#[derive(Clone)]
pub struct Pipeline {
    handler: Handler,
    layout: Arc<PipelineLayout>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Run the composed chain for one context
    pub async fn execute(&self, ctx: &mut MappingContext) -> Result<MappingResult> {
        let span = tracing::info_span!("pipeline", request_id = %ctx.request_id);
        (self.handler)(ctx).instrument(span).await
    }

    pub fn layout(&self) -> &PipelineLayout {
        &self.layout
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("layout", &self.layout).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationSource;
    use crate::engine::MappingSet;
    use crate::transform::TransformerRegistry;
    use crate::Error;
    use async_trait::async_trait;
    use std::sync::Mutex;

    type Trace = Arc<Mutex<Vec<String>>>;

    fn record(trace: &Trace, entry: impl Into<String>) {
        trace.lock().unwrap().push(entry.into());
    }

    fn entries(trace: &Trace) -> Vec<String> {
        trace.lock().unwrap().clone()
    }

    fn context() -> MappingContext {
        MappingContext::new(
            Arc::new(MappingSet::default()),
            Arc::new(TransformerRegistry::new()),
        )
    }

    struct RecordingCore(Trace);

    #[async_trait]
    impl CoreOperation for RecordingCore {
        async fn run(&self, _ctx: &mut MappingContext) -> Result<MappingResult> {
            record(&self.0, "core");
            Ok(MappingResult::success())
        }
    }

    struct Pre {
        name: String,
        order: i32,
        fail: bool,
        trace: Trace,
    }

    #[async_trait]
    impl PreRunBehavior for Pre {
        fn name(&self) -> &str {
            &self.name
        }

        fn order(&self) -> i32 {
            self.order
        }

        async fn execute(&self, _ctx: &mut MappingContext) -> Result<()> {
            record(&self.trace, format!("pre:{}", self.name));
            if self.fail {
                return Err(Error::behavior(&self.name, "refused"));
            }
            Ok(())
        }
    }

    struct Post {
        order: i32,
        trace: Trace,
    }

    #[async_trait]
    impl PostRunBehavior for Post {
        fn name(&self) -> &str {
            "post"
        }

        fn order(&self) -> i32 {
            self.order
        }

        async fn execute(&self, _ctx: &mut MappingContext, result: &mut MappingResult) -> Result<()> {
            record(&self.trace, format!("post:{}", self.order));
            result.properties.insert(format!("post{}", self.order), true.into());
            Ok(())
        }
    }

    struct Around {
        name: &'static str,
        order: i32,
        calls: usize,
        trace: Trace,
    }

    #[async_trait]
    impl WholeRunBehavior for Around {
        fn name(&self) -> &str {
            self.name
        }

        fn order(&self) -> i32 {
            self.order
        }

        async fn execute(&self, ctx: &mut MappingContext, next: Next) -> Result<MappingResult> {
            record(&self.trace, format!("{}-start", self.name));
            let mut result = Ok(MappingResult::failure("not called"));
            for _ in 0..self.calls {
                result = next.run(ctx).await;
            }
            record(&self.trace, format!("{}-end", self.name));
            result
        }
    }

    fn pre(name: &str, order: i32, trace: &Trace) -> Arc<dyn PreRunBehavior> {
        Arc::new(Pre {
            name: name.to_string(),
            order,
            fail: false,
            trace: trace.clone(),
        })
    }

    fn around(name: &'static str, order: i32, calls: usize, trace: &Trace) -> Arc<dyn WholeRunBehavior> {
        Arc::new(Around {
            name,
            order,
            calls,
            trace: trace.clone(),
        })
    }

    #[tokio::test]
    async fn test_pre_and_post_run_sorted_by_order() {
        let trace = Trace::default();
        let pipeline = PipelineBuilder::new()
            .pre_run(pre("fifty", 50, &trace))
            .pre_run(pre("ten", 10, &trace))
            .pre_run(pre("thirty", 30, &trace))
            .post_run(Arc::new(Post { order: 5, trace: trace.clone() }))
            .post_run(Arc::new(Post { order: -5, trace: trace.clone() }))
            .build(Arc::new(RecordingCore(trace.clone())));

        let result = pipeline.execute(&mut context()).await.unwrap();
        assert!(result.is_success);
        assert_eq!(
            entries(&trace),
            vec!["pre:ten", "pre:thirty", "pre:fifty", "core", "post:-5", "post:5"]
        );
        assert_eq!(pipeline.layout().pre_run, vec!["ten", "thirty", "fifty"]);
    }

    #[tokio::test]
    async fn test_equal_orders_keep_registration_order() {
        let trace = Trace::default();
        let pipeline = PipelineBuilder::new()
            .pre_run(pre("first", 0, &trace))
            .pre_run(pre("second", 0, &trace))
            .build(Arc::new(RecordingCore(trace.clone())));

        pipeline.execute(&mut context()).await.unwrap();
        assert_eq!(entries(&trace), vec!["pre:first", "pre:second", "core"]);
    }

    #[tokio::test]
    async fn test_lowest_whole_run_is_outermost() {
        let trace = Trace::default();
        let pipeline = PipelineBuilder::new()
            .whole_run(around("B", 2, 1, &trace))
            .whole_run(around("A", 1, 1, &trace))
            .build(Arc::new(RecordingCore(trace.clone())));

        pipeline.execute(&mut context()).await.unwrap();
        assert_eq!(entries(&trace), vec!["A-start", "B-start", "core", "B-end", "A-end"]);
        assert_eq!(pipeline.layout().whole_run, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_whole_run_controls_invocation_count() {
        let trace = Trace::default();
        let pipeline = PipelineBuilder::new()
            .whole_run(around("twice", 0, 2, &trace))
            .build(Arc::new(RecordingCore(trace.clone())));
        pipeline.execute(&mut context()).await.unwrap();
        assert_eq!(entries(&trace), vec!["twice-start", "core", "core", "twice-end"]);

        let trace = Trace::default();
        let pipeline = PipelineBuilder::new()
            .whole_run(around("never", 0, 0, &trace))
            .build(Arc::new(RecordingCore(trace.clone())));
        let result = pipeline.execute(&mut context()).await.unwrap();
        assert!(!result.is_success);
        assert_eq!(entries(&trace), vec!["never-start", "never-end"]);
    }

    #[tokio::test]
    async fn test_pre_run_failure_short_circuits() {
        let trace = Trace::default();
        let failing = Arc::new(Pre {
            name: "gate".to_string(),
            order: 0,
            fail: true,
            trace: trace.clone(),
        });
        let pipeline = PipelineBuilder::new()
            .whole_run(around("outer", 0, 1, &trace))
            .pre_run(failing)
            .pre_run(pre("later", 10, &trace))
            .post_run(Arc::new(Post { order: 0, trace: trace.clone() }))
            .build(Arc::new(RecordingCore(trace.clone())));

        let err = pipeline.execute(&mut context()).await.unwrap_err();
        assert!(matches!(err, Error::Behavior { .. }));
        assert_eq!(entries(&trace), vec!["outer-start", "pre:gate", "outer-end"]);
    }

    #[tokio::test]
    async fn test_cancelled_context_never_reaches_core() {
        let trace = Trace::default();
        let pipeline = PipelineBuilder::new()
            .pre_run(pre("first", 0, &trace))
            .build(Arc::new(RecordingCore(trace.clone())));

        let source = CancellationSource::new();
        source.cancel();
        let mut ctx = context().with_cancellation(source.signal());

        let err = pipeline.execute(&mut ctx).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(entries(&trace).is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_is_reusable_across_tasks() {
        let trace = Trace::default();
        let pipeline = PipelineBuilder::new().build(Arc::new(RecordingCore(trace.clone())));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move { pipeline.execute(&mut context()).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().unwrap().is_success);
        }
        assert_eq!(entries(&trace).len(), 4);
    }
}
