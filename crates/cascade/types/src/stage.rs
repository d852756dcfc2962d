//! The four named stages of the cascade workflow.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four asynchronous operations in the workflow.
///
/// A produces a seed value; B and C both consume A's result and run
/// concurrently; D consumes B's and C's results and only runs when
/// B's value exceeds C's.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    A,
    B,
    C,
    D,
}

impl Stage {
    /// All stages, in workflow order.
    pub const ALL: [Stage; 4] = [Stage::A, Stage::B, Stage::C, Stage::D];

    /// Number of stages.
    pub const COUNT: usize = 4;

    /// Slot index for per-stage arrays.
    pub fn index(self) -> usize {
        match self {
            Stage::A => 0,
            Stage::B => 1,
            Stage::C => 2,
            Stage::D => 3,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::A => write!(f, "A"),
            Stage::B => write!(f, "B"),
            Stage::C => write!(f, "C"),
            Stage::D => write!(f, "D"),
        }
    }
}
