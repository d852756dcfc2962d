//! Error taxonomy for the cascade workflow contract.
//!
//! Three kinds, with very different lifecycles:
//!
//! - [`CascadeError::Validation`] is raised only when a caller explicitly
//!   asks for validation; it joins every violation recorded during the run.
//! - [`CascadeError::Contract`] aborts the offending call immediately
//!   (duplicate begin of the same stage).
//! - [`CascadeError::Io`] comes from the simulated I/O layer itself:
//!   marker-file failures and end calls presented with a foreign handle.

use thiserror::Error;

/// Errors surfaced by the cascade workflow harness and orchestrators.
#[derive(Error, Debug)]
pub enum CascadeError {
    /// Accumulated contract violations, joined with "; ", or a
    /// completeness failure reported at validation time.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Hard misuse of the begin/end discipline. Not recoverable within
    /// the run.
    #[error("contract breached: {0}")]
    Contract(String),

    /// Failure in the underlying marker-file I/O, including an end call
    /// handed a handle from a different stage's begin.
    #[error("stage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CascadeError {
    pub fn validation(message: impl Into<String>) -> Self {
        CascadeError::Validation(message.into())
    }

    pub fn contract(message: impl Into<String>) -> Self {
        CascadeError::Contract(message.into())
    }
}

/// Result alias used across the cascade crates.
pub type CascadeResult<T> = Result<T, CascadeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_distinguish_kinds() {
        let v = CascadeError::validation("B called without correct input from A");
        assert!(v.to_string().starts_with("validation failed:"));

        let c = CascadeError::contract("A begin called more than once");
        assert!(c.to_string().starts_with("contract breached:"));

        let io = CascadeError::from(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "wrong handle",
        ));
        assert!(matches!(io, CascadeError::Io(_)));
    }
}
