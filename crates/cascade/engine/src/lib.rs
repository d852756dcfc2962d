//! Orchestrators for the cascade workflow.
//!
//! An orchestrator drives the dependency graph A → {B, C} → (D | passthrough)
//! against a [`MockStageService`](cascade_harness::MockStageService):
//! begin A; when it completes, begin B and C concurrently with A's result;
//! once **both** have completed, begin D with `(b, c)` when `b > c`,
//! otherwise the run finalizes with C's result directly. Finalization
//! completes the signal returned by [`Orchestrator::begin_api`] exactly once
//! and fires the caller's continuation exactly once, with the caller's state
//! token carried through untouched.
//!
//! Two implementations of the same contract ship here, differing only in
//! concurrency idiom: [`JoinOrchestrator`] composes futures, and
//! [`RelayOrchestrator`] relays stage callbacks through a channel into a
//! driver loop with an explicit arrival count for the join barrier.

mod join;
mod relay;

use async_trait::async_trait;
use cascade_types::{ApiCallback, Completion, StateToken};

pub use join::JoinOrchestrator;
pub use relay::RelayOrchestrator;

/// The public face of a cascade workflow run.
///
/// Once begun, a run is never cancelled or retried: it either finalizes the
/// returned signal or aborts on a hard resource error, in which case the
/// signal stays incomplete and the error is logged — callers own the
/// timeout they apply while waiting.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Start the workflow. Returns the run's completion signal immediately,
    /// without suspending the caller. `on_complete`, when supplied, is
    /// invoked exactly once after finalization with a signal whose state
    /// token is `state` by identity.
    fn begin_api(&self, on_complete: Option<ApiCallback>, state: Option<StateToken>)
        -> Completion;

    /// Retrieve the finalized workflow value. This is the waiting
    /// discipline: calling before completion suspends until the run
    /// finalizes rather than returning anything stale.
    async fn end_api(&self, call: &Completion) -> i64 {
        call.wait().await
    }
}
