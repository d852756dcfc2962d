//! Single-shot completion signal.
//!
//! Every begin-style call in the workflow returns one of these immediately:
//! a cheaply clonable, waitable flag that some worker context completes
//! exactly once with the operation's result. The signal also carries an
//! opaque caller-supplied state token, returned unchanged no matter which
//! thread or callback path performs the completion.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::watch;

/// Opaque caller state carried through a [`Completion`] by identity.
pub type StateToken = Arc<dyn Any + Send + Sync>;

/// Continuation invoked exactly once when a workflow run finalizes.
pub type ApiCallback = Box<dyn FnOnce(Completion) + Send + 'static>;

/// A single-shot waitable completion signal.
///
/// Completing twice is a programming error and panics; a correct
/// orchestrator finalizes exactly once, so the second call is expected to be
/// unreachable rather than handled.
#[derive(Clone)]
pub struct Completion {
    inner: Arc<CompletionInner>,
}

struct CompletionInner {
    state: Option<StateToken>,
    result: OnceLock<i64>,
    done: watch::Sender<bool>,
}

impl Completion {
    /// New, uncompleted signal holding the caller's opaque token.
    pub fn new(state: Option<StateToken>) -> Self {
        let (done, _) = watch::channel(false);
        Completion {
            inner: Arc::new(CompletionInner {
                state,
                result: OnceLock::new(),
                done,
            }),
        }
    }

    /// Set the result and mark the signal complete. Panics if already
    /// completed.
    pub fn complete(&self, value: i64) {
        if self.inner.result.set(value).is_err() {
            panic!("completion signal completed twice");
        }
        self.inner.done.send_replace(true);
    }

    /// Non-blocking poll.
    pub fn is_complete(&self) -> bool {
        self.inner.result.get().is_some()
    }

    /// The completed value, if any.
    pub fn result(&self) -> Option<i64> {
        self.inner.result.get().copied()
    }

    /// The caller's opaque token, unchanged from creation.
    pub fn state(&self) -> Option<&StateToken> {
        self.inner.state.as_ref()
    }

    /// Suspend until the signal completes, then return the result.
    /// Returns immediately when already complete.
    pub async fn wait(&self) -> i64 {
        let mut rx = self.inner.done.subscribe();
        loop {
            if let Some(value) = self.result() {
                return value;
            }
            // The sender lives inside `inner`, so it cannot drop while
            // `self` is alive; a recv error just re-checks the slot.
            let _ = rx.changed().await;
        }
    }

    /// [`wait`](Self::wait) bounded by `timeout`. `None` when the timeout
    /// elapsed first.
    pub async fn wait_timeout(&self, timeout: Duration) -> Option<i64> {
        tokio::time::timeout(timeout, self.wait()).await.ok()
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("complete", &self.is_complete())
            .field("result", &self.result())
            .field("has_state", &self.inner.state.is_some())
            .finish()
    }
}
