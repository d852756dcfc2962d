//! Shared domain types for the Cascade workflow suite.
//!
//! The workflow itself is small: four named stages, a fan-out from A into
//! {B, C}, a barrier join, and a conditional final stage D. What this crate
//! provides is the vocabulary everything else speaks:
//!
//! - [`Stage`] — the four asynchronous operations
//! - [`CascadeError`] / [`CascadeResult`] — the three-kind error taxonomy
//!   (soft validation failures, hard contract breaches, I/O faults)
//! - [`Completion`] — the single-shot waitable signal returned by begin-style
//!   calls, carrying an opaque caller state token

mod completion;
mod error;
mod stage;

pub use completion::{ApiCallback, Completion, StateToken};
pub use error::{CascadeError, CascadeResult};
pub use stage::Stage;
