//! Behavior pipeline
//!
//! Cross-cutting concerns wrap the mapping engine as ordered behaviors:
//!
//! - **pre-run** behaviors run before the core, ascending by order; an error
//!   short-circuits the core and every post-run behavior
//! - **post-run** behaviors run after the core and may annotate its result
//! - **whole-run** behaviors wrap everything inside them, lowest order
//!   outermost, and receive a [`Next`] continuation
//!
//! A [`Pipeline`] is composed once from a [`PipelineBuilder`] and then shared
//! by every request.

pub mod behavior;
pub mod behaviors;
pub mod compose;

pub use behavior::{CoreOperation, PostRunBehavior, PreRunBehavior, WholeRunBehavior};
pub use compose::{Next, Pipeline, PipelineBuilder, PipelineLayout};
