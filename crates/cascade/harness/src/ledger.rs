//! Begin/end tallies and the violation log for one workflow run.

use cascade_types::{CascadeError, CascadeResult, Stage};
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tracing::warn;

/// Per-stage call accounting plus the ordered list of recorded violations.
///
/// Counters are atomic because stage completions land on blocking-pool
/// threads while begins and ends may race in from caller tasks. The
/// increment-then-compare discipline makes the exactly-once checks safe
/// under that concurrency: whichever caller pushes a counter past 1 is the
/// one that observes the breach.
pub struct StageLedger {
    begun: [AtomicU32; Stage::COUNT],
    ended: [AtomicU32; Stage::COUNT],
    violations: Mutex<Vec<String>>,
}

/// Point-in-time copy of the tallies, for logs and diagnostics.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct LedgerSnapshot {
    pub begun: [u32; Stage::COUNT],
    pub ended: [u32; Stage::COUNT],
}

impl StageLedger {
    pub fn new() -> Self {
        StageLedger {
            begun: Default::default(),
            ended: Default::default(),
            violations: Mutex::new(Vec::new()),
        }
    }

    /// Tally a begin for `stage`. A second begin is a hard contract error
    /// that aborts the call.
    pub fn record_begin(&self, stage: Stage) -> CascadeResult<()> {
        let seen = self.begun[stage.index()].fetch_add(1, Ordering::SeqCst) + 1;
        if seen > 1 {
            return Err(CascadeError::contract(format!(
                "{stage} begin called more than once"
            )));
        }
        Ok(())
    }

    /// Tally an end for `stage`. A second end is a soft violation; the call
    /// is allowed to proceed.
    pub fn record_end(&self, stage: Stage) {
        let seen = self.ended[stage.index()].fetch_add(1, Ordering::SeqCst) + 1;
        if seen > 1 {
            self.record_violation(format!("{stage} ended more than once"));
        }
    }

    /// Append a violation to the log without interrupting the caller.
    pub fn record_violation(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(violation = %message, "contract violation recorded");
        self.violations.lock().unwrap().push(message);
    }

    pub fn begun(&self, stage: Stage) -> u32 {
        self.begun[stage.index()].load(Ordering::SeqCst)
    }

    pub fn ended(&self, stage: Stage) -> u32 {
        self.ended[stage.index()].load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let tally = |slots: &[AtomicU32; Stage::COUNT]| {
            let mut out = [0u32; Stage::COUNT];
            for (slot, count) in slots.iter().zip(out.iter_mut()) {
                *count = slot.load(Ordering::SeqCst);
            }
            out
        };
        LedgerSnapshot {
            begun: tally(&self.begun),
            ended: tally(&self.ended),
        }
    }

    /// Check the run against the contract.
    ///
    /// Any recorded violation fails first, joined into one message. When
    /// `must_be_complete` is set, A, B, and C must each have begun and ended
    /// exactly once, and D exactly once or exactly zero times depending on
    /// `d_should_be_called`.
    pub fn validate(&self, must_be_complete: bool, d_should_be_called: bool) -> CascadeResult<()> {
        {
            let violations = self.violations.lock().unwrap();
            if !violations.is_empty() {
                return Err(CascadeError::validation(violations.join("; ")));
            }
        }
        if !must_be_complete {
            return Ok(());
        }

        let counts = [
            self.begun(Stage::A),
            self.ended(Stage::A),
            self.begun(Stage::B),
            self.ended(Stage::B),
            self.begun(Stage::C),
            self.ended(Stage::C),
        ];
        if counts.iter().any(|&count| count != 1) {
            let listing = counts.map(|count| count.to_string()).join(" ");
            return Err(CascadeError::validation(format!(
                "not all operations were called and completed: {listing}"
            )));
        }

        if d_should_be_called {
            if self.begun(Stage::D) != 1 || self.ended(Stage::D) != 1 {
                return Err(CascadeError::validation("D was not called and completed"));
            }
        } else if self.begun(Stage::D) != 0 || self.ended(Stage::D) != 0 {
            return Err(CascadeError::validation("D called but should not have been"));
        }
        Ok(())
    }
}

impl Default for StageLedger {
    fn default() -> Self {
        Self::new()
    }
}
