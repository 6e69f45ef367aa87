//! Source verification.
//!
//! Records from verified sources are authoritative: their titles define
//! canonical names and bypass fuzzy normalization.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Decides whether an ingestion source is trusted.
pub trait SourceVerifier: Send + Sync {
    /// Name of the verifier (for audit/debugging).
    fn name(&self) -> &str;

    /// True if records from `source` are authoritative.
    fn is_verified(&self, source: &str) -> bool;
}

/// Verifier backed by a list of trusted source prefixes.
///
/// A source is verified when it starts with any listed prefix, so a prefix
/// such as `https://gazette.example.gov/` covers every document under it.
/// Blank sources are never verified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerifiedSourceList {
    prefixes: BTreeSet<String>,
}

impl VerifiedSourceList {
    /// Create a list from prefixes. Blank prefixes are ignored.
    #[must_use]
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes = prefixes
            .into_iter()
            .map(Into::into)
            .map(|p: String| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { prefixes }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

impl SourceVerifier for VerifiedSourceList {
    fn name(&self) -> &str {
        "verified_source_list"
    }

    fn is_verified(&self, source: &str) -> bool {
        let source = source.trim();
        !source.is_empty() && self.prefixes.iter().any(|p| source.starts_with(p.as_str()))
    }
}
