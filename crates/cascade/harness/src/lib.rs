//! Validating asynchronous stage resource.
//!
//! [`MockStageService`] simulates the four out-of-process operations of the
//! cascade workflow (A → {B, C} → D) while auditing exactly how the caller
//! drives them. Every stage follows a two-phase begin/end convention: begin
//! issues a real zero-length read against an on-disk marker file — so
//! completion is genuinely asynchronous and lands on a worker thread — and
//! returns a [`StageHandle`]; end finalizes that read and yields the stage's
//! precomputed result.
//!
//! Misuse is detected at two severities. Duplicate begins and foreign end
//! handles fail the offending call immediately. Wrong upstream inputs and
//! duplicate ends are recorded in the [`StageLedger`] and only surfaced when
//! [`MockStageService::validate`] is invoked, so a deliberately broken run
//! can still be driven to its conclusion and then inspected.

mod handle;
mod ledger;
mod service;

pub use handle::{StageCallback, StageHandle};
pub use ledger::{LedgerSnapshot, StageLedger};
pub use service::MockStageService;
