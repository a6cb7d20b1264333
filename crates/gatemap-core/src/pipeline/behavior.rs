//! Behavior contracts
//!
//! Behaviors are stateless singletons shared across concurrent requests; any
//! per-request state lives on the [`MappingContext`]. Lower `order()` values
//! run first (pre-run, post-run) or sit further outside (whole-run).

use super::compose::Next;
use crate::engine::{MappingContext, MappingResult};
use crate::Result;
use async_trait::async_trait;

/// The innermost operation of a pipeline
#[async_trait]
pub trait CoreOperation: Send + Sync {
    async fn run(&self, ctx: &mut MappingContext) -> Result<MappingResult>;
}

/// Runs before the core; an error short-circuits the rest of the run
#[async_trait]
pub trait PreRunBehavior: Send + Sync {
    fn name(&self) -> &str;

    fn order(&self) -> i32 {
        0
    }

    async fn execute(&self, ctx: &mut MappingContext) -> Result<()>;
}

/// Runs after the core and may annotate the result
#[async_trait]
pub trait PostRunBehavior: Send + Sync {
    fn name(&self) -> &str;

    fn order(&self) -> i32 {
        0
    }

    async fn execute(&self, ctx: &mut MappingContext, result: &mut MappingResult) -> Result<()>;
}

/// Wraps everything inside it.
///
/// Implementations decide whether to call `next` zero, one or several times
/// and may replace its result or error.
#[async_trait]
pub trait WholeRunBehavior: Send + Sync {
    fn name(&self) -> &str;

    fn order(&self) -> i32 {
        0
    }

    async fn execute(&self, ctx: &mut MappingContext, next: Next) -> Result<MappingResult>;
}
