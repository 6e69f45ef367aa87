//! Reconciler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::matcher::DEFAULT_MIN_MATCH_PERCENTAGE;

/// Default upper bound for each normalization collaborator call.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 5_000;

/// Tunables for normalization and reconciliation.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use gig_reconcile::ReconcilerConfig;
///
/// let cfg = ReconcilerConfig::from_json_str(r#"{"min_match_percentage": 85.0}"#).unwrap();
/// assert_eq!(cfg.min_match_percentage, 85.0);
/// assert_eq!(cfg.unnormalized_category, "arbitrary-entities");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Minimum similarity (0-100) for a candidate name to count as a match.
    pub min_match_percentage: f64,
    /// Source prefixes whose records define canonical names.
    pub verified_sources: Vec<String>,
    /// Category added to entities whose title could not be normalized.
    pub unnormalized_category: String,
    /// Source recorded on title values rewritten by normalization.
    pub normalizer_source: String,
    /// Maximum snippet length in characters.
    pub snippet_length: usize,
    /// Upper bound for each normalization collaborator call. Defaults to
    /// [`DEFAULT_CALL_TIMEOUT_MS`]; `null` runs calls inline without a bound.
    pub call_timeout_ms: Option<u64>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            min_match_percentage: DEFAULT_MIN_MATCH_PERCENTAGE,
            verified_sources: Vec::new(),
            unnormalized_category: "arbitrary-entities".to_string(),
            normalizer_source: "normalizer".to_string(),
            snippet_length: 300,
            call_timeout_ms: Some(DEFAULT_CALL_TIMEOUT_MS),
        }
    }
}

impl ReconcilerConfig {
    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` if the document is malformed
    /// or a value is out of range.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| ValidationError::InvalidConfig {
            reason: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` describing the first bad field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=100.0).contains(&self.min_match_percentage) {
            return Err(ValidationError::InvalidConfig {
                reason: format!(
                    "min_match_percentage must be within 0..=100, got {}",
                    self.min_match_percentage
                ),
            });
        }
        if self.unnormalized_category.trim().is_empty() {
            return Err(ValidationError::InvalidConfig {
                reason: "unnormalized_category cannot be empty".to_string(),
            });
        }
        if self.normalizer_source.trim().is_empty() {
            return Err(ValidationError::InvalidConfig {
                reason: "normalizer_source cannot be empty".to_string(),
            });
        }
        if self.call_timeout_ms == Some(0) {
            return Err(ValidationError::InvalidConfig {
                reason: "call_timeout_ms must be positive".to_string(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}
