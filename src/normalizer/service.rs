//! External normalization service seam.

use std::collections::HashMap;

use thiserror::Error;

use crate::matcher::process_name;

/// Failures reported by a normalization service.
#[derive(Debug, Error)]
pub enum NormalizationError {
    #[error("Normalization service returned no result for '{0}'")]
    NoResult(String),

    #[error("Normalization service unavailable: {0}")]
    Unavailable(String),
}

/// A service that maps a free-form name to its canonical spelling, such as a
/// search API or knowledge-graph lookup.
pub trait NormalizationService: Send + Sync {
    /// Name of the service (for audit/debugging).
    fn name(&self) -> &str;

    /// Returns the canonical form of `text`.
    fn normalize(&self, text: &str) -> Result<String, NormalizationError>;
}

/// Service that never finds a result. Use when no external service is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNormalizationService;

impl NormalizationService for NoopNormalizationService {
    fn name(&self) -> &str {
        "noop"
    }

    fn normalize(&self, text: &str) -> Result<String, NormalizationError> {
        Err(NormalizationError::NoResult(text.to_string()))
    }
}

/// Service answering from a fixed dictionary keyed by processed name.
#[derive(Debug, Clone, Default)]
pub struct DictionaryNormalizationService {
    names: HashMap<String, String>,
}

impl DictionaryNormalizationService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `raw` (processed before storing) to `canonical`.
    #[must_use]
    pub fn with(mut self, raw: &str, canonical: impl Into<String>) -> Self {
        self.names.insert(process_name(raw), canonical.into());
        self
    }
}

impl NormalizationService for DictionaryNormalizationService {
    fn name(&self) -> &str {
        "dictionary"
    }

    fn normalize(&self, text: &str) -> Result<String, NormalizationError> {
        self.names
            .get(&process_name(text))
            .cloned()
            .ok_or_else(|| NormalizationError::NoResult(text.to_string()))
    }
}
