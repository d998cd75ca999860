//! Detection error types.

use thiserror::Error;

use crate::cache::CacheError;
use crate::introspect::IntrospectionError;

/// Result type for detection operations.
pub type DetectionResult<T> = Result<T, DetectionError>;

/// Errors that can occur during detection.
#[derive(Error, Debug)]
pub enum DetectionError {
    /// An analyzer produced a number outside [0, 1] (or NaN).
    #[error("invalid evidence from {rule}: {reason}")]
    InvalidEvidence { rule: String, reason: String },

    /// Introspection failed fatally.
    #[error(transparent)]
    Introspection(#[from] IntrospectionError),

    /// The detection cache could not be read or written.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl DetectionError {
    pub fn invalid_evidence(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEvidence {
            rule: rule.into(),
            reason: reason.into(),
        }
    }
}

/// Reject non-finite or out-of-range unit values.
pub(crate) fn check_unit(rule: &str, what: &str, value: f64) -> DetectionResult<f64> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(DetectionError::invalid_evidence(
            rule,
            format!("{} must be within [0, 1], got {}", what, value),
        ))
    }
}
