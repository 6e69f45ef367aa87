//! Error types for the reconciliation core.
//!
//! Errors are strongly typed using thiserror. Validation problems are the
//! caller's to fix, store failures pass through unchanged, and the benign
//! outcomes of the resolution cascade (`NormalizationFailed`,
//! `NoMatchingEntity`) are ordinary variants the reconciler matches on.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::storage::StorageError;

/// Validation errors that occur during input validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Entity title cannot be empty")]
    EmptyTitle,

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Top-level error type for reconciliation operations.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Normalization failed for '{title}': unable to find a match")]
    NormalizationFailed {
        title: String,
    },

    #[error("No entity titled '{title}' was valid as of {as_of}")]
    NoMatchingEntity {
        title: String,
        as_of: DateTime<Utc>,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{step} timed out after {duration_ms}ms")]
    Timeout {
        step: &'static str,
        duration_ms: u64,
    },

    #[error("{step} worker disconnected before replying")]
    Disconnected {
        step: &'static str,
    },
}

impl ReconcileError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this error means "no existing entity", i.e. the
    /// create path should be taken.
    #[must_use]
    pub const fn is_no_match(&self) -> bool {
        matches!(self, Self::NoMatchingEntity { .. })
    }

    /// Returns true if retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::NormalizationFailed { .. } | Self::NoMatchingEntity { .. } => {
                false
            }
            Self::Storage(e) => e.is_transient(),
            Self::Timeout { .. } | Self::Disconnected { .. } => true,
        }
    }

    /// HTTP-analog status code for callers that surface these errors over a
    /// request/response boundary.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 406,
            Self::NoMatchingEntity { .. } => 404,
            Self::NormalizationFailed { .. } => 422,
            Self::Storage(StorageError::EntityNotFound(_)) => 404,
            Self::Storage(StorageError::DuplicateKey(_)) => 409,
            Self::Timeout { .. } => 504,
            Self::Storage(_) | Self::Disconnected { .. } => 500,
        }
    }
}

/// Result type alias for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;
