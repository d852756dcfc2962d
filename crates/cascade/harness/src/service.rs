//! The validating asynchronous stage resource.

use crate::{StageCallback, StageHandle, StageLedger};
use cascade_types::{CascadeError, CascadeResult, Stage, StateToken};
use rand::Rng;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

/// Marker file shared by every instance in the process. Created on first
/// use and reused across runs; deletion belongs to external cleanup.
fn default_marker_path() -> PathBuf {
    std::env::temp_dir().join("cascade-stage-marker")
}

/// An in-flight simulated read: the open marker-file handle plus the
/// operation id of the begin call that issued it.
struct PendingRead {
    op_id: u64,
    file: Arc<File>,
}

struct ServiceInner {
    ledger: StageLedger,
    results: Mutex<[i64; Stage::COUNT]>,
    pending: Mutex<[Option<PendingRead>; Stage::COUNT]>,
    next_op_id: AtomicU64,
    closed: Mutex<bool>,
}

/// Contract-checking mock of the four-stage asynchronous workflow resource.
///
/// Each `begin_*` opens a fresh read-only handle on the marker file and
/// issues a zero-length read on the blocking pool, so every completion lands
/// on a thread distinct from the caller's. Each `end_*` suspends until that
/// read finishes, releases the file handle, and returns the stage's
/// precomputed result.
///
/// Stage results for A, B, and C are drawn once at construction from
/// `[0, 100)`, as is D's; [`set_d_should_be_called`](Self::set_d_should_be_called)
/// regenerates B and C to force the branch decision either way.
///
/// Begin and end calls must be issued from within a Tokio runtime.
pub struct MockStageService {
    inner: Arc<ServiceInner>,
    marker_path: PathBuf,
}

impl MockStageService {
    /// Build a service against the process-wide marker file.
    pub fn new() -> CascadeResult<Self> {
        Self::with_marker(default_marker_path())
    }

    /// Build a service against a caller-chosen marker file, created if
    /// absent.
    pub fn with_marker(path: impl Into<PathBuf>) -> CascadeResult<Self> {
        let marker_path = path.into();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&marker_path)?;

        let mut rng = rand::thread_rng();
        let results: [i64; Stage::COUNT] = std::array::from_fn(|_| rng.gen_range(0..100));
        debug!(path = %marker_path.display(), "stage service ready");

        Ok(MockStageService {
            inner: Arc::new(ServiceInner {
                ledger: StageLedger::new(),
                results: Mutex::new(results),
                pending: Mutex::new(Default::default()),
                next_op_id: AtomicU64::new(1),
                closed: Mutex::new(false),
            }),
            marker_path,
        })
    }

    // ── Stage A ──────────────────────────────────────────────────────

    pub fn begin_a(
        &self,
        on_complete: Option<StageCallback>,
        state: Option<StateToken>,
    ) -> CascadeResult<StageHandle> {
        self.inner.ledger.record_begin(Stage::A)?;
        self.issue_read(Stage::A, on_complete, state)
    }

    pub async fn end_a(&self, handle: StageHandle) -> CascadeResult<i64> {
        self.finish_read(Stage::A, handle).await
    }

    // ── Stage B ──────────────────────────────────────────────────────

    pub fn begin_b(
        &self,
        a_result: i64,
        on_complete: Option<StageCallback>,
        state: Option<StateToken>,
    ) -> CascadeResult<StageHandle> {
        self.check_feed(Stage::B, Stage::A, a_result);
        self.inner.ledger.record_begin(Stage::B)?;
        self.issue_read(Stage::B, on_complete, state)
    }

    pub async fn end_b(&self, handle: StageHandle) -> CascadeResult<i64> {
        self.finish_read(Stage::B, handle).await
    }

    // ── Stage C ──────────────────────────────────────────────────────

    pub fn begin_c(
        &self,
        a_result: i64,
        on_complete: Option<StageCallback>,
        state: Option<StateToken>,
    ) -> CascadeResult<StageHandle> {
        self.check_feed(Stage::C, Stage::A, a_result);
        self.inner.ledger.record_begin(Stage::C)?;
        self.issue_read(Stage::C, on_complete, state)
    }

    pub async fn end_c(&self, handle: StageHandle) -> CascadeResult<i64> {
        self.finish_read(Stage::C, handle).await
    }

    // ── Stage D ──────────────────────────────────────────────────────

    pub fn begin_d(
        &self,
        b_result: i64,
        c_result: i64,
        on_complete: Option<StageCallback>,
        state: Option<StateToken>,
    ) -> CascadeResult<StageHandle> {
        self.check_feed(Stage::D, Stage::B, b_result);
        self.check_feed(Stage::D, Stage::C, c_result);
        self.inner.ledger.record_begin(Stage::D)?;
        self.issue_read(Stage::D, on_complete, state)
    }

    pub async fn end_d(&self, handle: StageHandle) -> CascadeResult<i64> {
        self.finish_read(Stage::D, handle).await
    }

    // ── Steering and inspection ──────────────────────────────────────

    /// Whether the branch to D is required: precomputed B exceeds
    /// precomputed C.
    pub fn d_should_be_called(&self) -> bool {
        let results = self.inner.results.lock().unwrap();
        results[Stage::B.index()] > results[Stage::C.index()]
    }

    /// Force the branch decision. Regenerates B in `[0, 10000)` and places C
    /// one off in whichever direction matches `required`, so a caller can
    /// steer the workflow without knowing the magnitudes.
    pub fn set_d_should_be_called(&self, required: bool) {
        let mut results = self.inner.results.lock().unwrap();
        let b: i64 = rand::thread_rng().gen_range(0..10_000);
        results[Stage::B.index()] = b;
        results[Stage::C.index()] = if required { b - 1 } else { b + 1 };
    }

    /// Ground truth for the value a correct run must produce: D's result
    /// when the branch is required, C's otherwise.
    pub fn expected_result(&self) -> i64 {
        let results = self.inner.results.lock().unwrap();
        if results[Stage::B.index()] > results[Stage::C.index()] {
            results[Stage::D.index()]
        } else {
            results[Stage::C.index()]
        }
    }

    /// Check the run against the workflow contract.
    ///
    /// Recorded violations fail first; with `must_be_complete` the tallies
    /// must show A, B, C begun and ended exactly once and D matching
    /// [`d_should_be_called`](Self::d_should_be_called).
    pub fn validate(&self, must_be_complete: bool) -> CascadeResult<()> {
        let outcome = self
            .inner
            .ledger
            .validate(must_be_complete, self.d_should_be_called());
        if outcome.is_ok() {
            info!(must_be_complete, "workflow run validated");
        }
        outcome
    }

    /// Release every still-open marker-file handle. Idempotent and safe to
    /// call while completions are in flight; also runs on drop.
    pub fn close(&self) {
        let mut closed = self.inner.closed.lock().unwrap();
        if *closed {
            return;
        }
        let mut pending = self.inner.pending.lock().unwrap();
        for slot in pending.iter_mut() {
            slot.take();
        }
        *closed = true;
        debug!("stage service closed");
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Record a violation if `stage` was fed anything other than the
    /// completed result of `upstream`. The begin still proceeds so broken
    /// runs can be driven to their conclusion and inspected afterwards.
    fn check_feed(&self, stage: Stage, upstream: Stage, supplied: i64) {
        let expected = self.inner.results.lock().unwrap()[upstream.index()];
        if self.inner.ledger.ended(upstream) < 1 || supplied != expected {
            self.inner.ledger.record_violation(format!(
                "{stage} called without correct input from {upstream}"
            ));
        }
    }

    fn issue_read(
        &self,
        stage: Stage,
        on_complete: Option<StageCallback>,
        state: Option<StateToken>,
    ) -> CascadeResult<StageHandle> {
        let op_id = self.inner.next_op_id.fetch_add(1, Ordering::Relaxed);
        let file = Arc::new(File::open(&self.marker_path)?);
        {
            let mut pending = self.inner.pending.lock().unwrap();
            pending[stage.index()] = Some(PendingRead {
                op_id,
                file: Arc::clone(&file),
            });
        }

        let handle = StageHandle::new(stage, op_id, state);
        let completed = handle.clone();
        let inner = Arc::clone(&self.inner);
        debug!(stage = %stage, op_id, "stage begun");

        tokio::task::spawn_blocking(move || {
            // Zero-length read against the shared marker: the work is
            // trivial, but completion still arrives on a blocking-pool
            // thread, never the thread that called begin.
            if let Err(err) = (&*file).read(&mut []) {
                error!(stage = %stage, %err, "marker read failed");
            }
            let value = inner.results.lock().unwrap()[stage.index()];
            completed.complete(value);
            if let Some(callback) = on_complete {
                callback(completed);
            }
        });

        Ok(handle)
    }

    async fn finish_read(&self, stage: Stage, handle: StageHandle) -> CascadeResult<i64> {
        self.inner.ledger.record_end(stage);

        if handle.stage() != stage {
            // The I/O layer rejecting a foreign wait handle, not a recorded
            // violation.
            return Err(CascadeError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "end {stage} called with a handle issued by {}",
                    handle.stage()
                ),
            )));
        }

        handle.wait().await;

        let released = self.inner.pending.lock().unwrap()[stage.index()].take();
        match released {
            Some(read) if read.op_id == handle.op_id() => {}
            // A duplicate begin would be the only way to get here, and that
            // already failed hard.
            Some(_) => {
                return Err(CascadeError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("end {stage} called with a stale handle"),
                )));
            }
            // Duplicate end: the soft violation is already on the ledger and
            // the result is still owed to the caller.
            None => {}
        }

        debug!(stage = %stage, op_id = handle.op_id(), "stage ended");
        Ok(self.inner.results.lock().unwrap()[stage.index()])
    }
}

impl Drop for MockStageService {
    fn drop(&mut self) {
        self.close();
    }
}
