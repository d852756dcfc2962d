//! Stage handles: the token connecting a begin call to its end call.

use cascade_types::{Completion, Stage, StateToken};
use std::fmt;
use std::time::Duration;

/// Continuation invoked on the worker thread once a stage's simulated I/O
/// finishes. Receives a clone of the handle the begin call returned.
pub type StageCallback = Box<dyn FnOnce(StageHandle) + Send + 'static>;

/// Token returned by every `begin_*` call on the mock service.
///
/// Carries the stage it was issued for, a unique operation id tying it to
/// the pending read it represents, and an embedded completion signal that
/// fires when the read finishes. The matching `end_*` call requires this
/// exact handle; presenting one issued by a different stage is a hard I/O
/// error.
#[derive(Clone)]
pub struct StageHandle {
    stage: Stage,
    op_id: u64,
    done: Completion,
}

impl StageHandle {
    pub(crate) fn new(stage: Stage, op_id: u64, state: Option<StateToken>) -> Self {
        StageHandle {
            stage,
            op_id,
            done: Completion::new(state),
        }
    }

    /// The stage this handle was issued for.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub(crate) fn op_id(&self) -> u64 {
        self.op_id
    }

    pub(crate) fn complete(&self, value: i64) {
        self.done.complete(value);
    }

    /// Whether the simulated I/O has finished.
    pub fn is_complete(&self) -> bool {
        self.done.is_complete()
    }

    /// The opaque token supplied to the begin call, unchanged.
    pub fn state(&self) -> Option<&StateToken> {
        self.done.state()
    }

    /// Suspend until the simulated I/O finishes.
    pub async fn wait(&self) -> i64 {
        self.done.wait().await
    }

    /// [`wait`](Self::wait) bounded by `timeout`; `None` when it elapsed.
    pub async fn wait_timeout(&self, timeout: Duration) -> Option<i64> {
        self.done.wait_timeout(timeout).await
    }
}

impl fmt::Debug for StageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageHandle")
            .field("stage", &self.stage)
            .field("op_id", &self.op_id)
            .field("complete", &self.is_complete())
            .finish()
    }
}
