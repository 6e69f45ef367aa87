//! Normalization cache rows.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::matcher::process_name;

/// Deterministic identifier of a cache row, derived from its search text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedNameId(Uuid);

impl NormalizedNameId {
    /// Hashes an already processed search text into an id.
    #[must_use]
    pub fn for_search_text(search_text: &str) -> Self {
        let hash = blake3::hash(search_text.as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash.as_bytes()[..16]);
        Self(Uuid::from_bytes(bytes))
    }
}

/// Cache row mapping a raw name to its canonical form.
///
/// The search text is stored processed, so lookups compare like with like
/// and the same raw name always maps to the same row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedNameEntry {
    pub id: NormalizedNameId,
    pub search_text: String,
    pub normalized_text: String,
    pub created_at: DateTime<Utc>,
}

impl NormalizedNameEntry {
    /// Creates an entry for `raw`, processing it into the search text.
    #[must_use]
    pub fn new(raw: &str, normalized_text: impl Into<String>) -> Self {
        let search_text = process_name(raw);
        Self {
            id: NormalizedNameId::for_search_text(&search_text),
            search_text,
            normalized_text: normalized_text.into(),
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for NormalizedNameEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.search_text, self.normalized_text)
    }
}
