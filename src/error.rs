//! Error types for the animation core.

use serde::{Deserialize, Serialize};

use crate::value::ValueKind;

/// Error type covering configuration, interpolation, and target access failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AnimationError {
    /// Invalid animation configuration (non-positive duration, malformed
    /// position token, unknown timeline label, conflicting units).
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A from/to pair of mismatched value kinds cannot be interpolated.
    #[error("Cannot interpolate {expected:?} with {actual:?}")]
    InvalidPropertyPair {
        expected: ValueKind,
        actual: ValueKind,
    },

    /// No active animation with the given id.
    #[error("Animation not found: {id}")]
    NotFound { id: String },

    /// The property sink reports the target is gone.
    #[error("Target unavailable: {target}")]
    TargetUnavailable { target: String },

    /// Invalid time value (negative or non-finite).
    #[error("Invalid time value: {time}")]
    InvalidTime { time: f64 },

    /// Serialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },
}

impl AnimationError {
    /// Create an `InvalidConfig` error from any displayable reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Get error category for logging/metrics
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } | Self::InvalidTime { .. } => "config",
            Self::InvalidPropertyPair { .. } => "interpolation",
            Self::NotFound { .. } => "lookup",
            Self::TargetUnavailable { .. } => "target",
            Self::SerializationError { .. } => "serialization",
        }
    }
}

impl From<serde_json::Error> for AnimationError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            reason: err.to_string(),
        }
    }
}
