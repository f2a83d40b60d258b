//! Verification error taxonomy.
//!
//! Expected conditions (not found yet, diverged, never converged) are
//! typed errors, never panics. `Timeout` is distinct from the mismatch
//! variants so callers can tell "never converged" from "converged to
//! the wrong value". `Unsupported` marks a programming error in the
//! calling test and is never retried.

use std::time::Duration;

use lodestone_types::PolicyRule;
use thiserror::Error;

use crate::cluster::ApiError;

/// Error type for verification operations.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The referenced object does not exist (outside a poll loop).
    #[error("{kind} {name:?} not found")]
    NotFound { kind: &'static str, name: String },

    /// Expectation and observation diverged after polling exhausted its
    /// budget. Both sides are carried, canonicalized, for diagnostics.
    #[error(
        "rule set mismatch for {object}: expected {} rule(s), observed {}",
        .expected.len(),
        .actual.len()
    )]
    RuleMismatch {
        object: String,
        expected: Vec<PolicyRule>,
        actual: Vec<PolicyRule>,
    },

    /// A binding-count assertion diverged after polling exhausted its
    /// budget.
    #[error("binding mismatch for {object}: expected {expected} match(es), observed {actual}")]
    BindingMismatch {
        object: String,
        expected: usize,
        actual: usize,
    },

    /// The poller exhausted its budget without the condition ever
    /// becoming observable.
    #[error("timed out after {elapsed:?} waiting for {what}")]
    Timeout { what: String, elapsed: Duration },

    /// No classification rule exists for the requested access check.
    /// A programming error in the test; fails fast, never retried.
    #[error("unsupported access check: no classification rule for {verb:?} on {resource:?}")]
    Unsupported { verb: String, resource: String },

    /// Non-transient cluster API failure.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result type for verification operations.
pub type Result<T> = std::result::Result<T, VerifyError>;

impl VerifyError {
    /// Whether a poll loop should keep retrying through this error.
    pub fn is_transient(&self) -> bool {
        match self {
            VerifyError::NotFound { .. } => true,
            VerifyError::Api(err) => err.is_transient(),
            _ => false,
        }
    }

    /// JSON rendering of both sides of a mismatch, for diagnostics.
    /// `None` for non-mismatch errors.
    pub fn diagnostics(&self) -> Option<String> {
        match self {
            VerifyError::RuleMismatch {
                expected, actual, ..
            } => {
                let payload = serde_json::json!({
                    "expected": expected,
                    "actual": actual,
                });
                Some(payload.to_string())
            }
            VerifyError::BindingMismatch {
                expected, actual, ..
            } => Some(serde_json::json!({ "expected": expected, "actual": actual }).to_string()),
            _ => None,
        }
    }
}
