use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::bounded::call_with_timeout;
use crate::error::{ReconcileError, ReconcileResult};
use crate::matcher::{process_name, strings_match};
use crate::storage::{EntityStore, NormalizedNameStore};

use super::service::NormalizationService;

/// Cascade step that produced a canonical title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalizationStep {
    /// Normalization cache hit.
    Cache,
    /// Existing registry entity with a matching title.
    Registry,
    /// External normalization service.
    Service,
}

impl fmt::Display for NormalizationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Registry => write!(f, "registry"),
            Self::Service => write!(f, "service"),
        }
    }
}

/// A canonical title and the step that found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub title: String,
    pub step: NormalizationStep,
}

/// Resolves raw titles to canonical titles.
///
/// Steps run cheapest first and stop at the first verified match:
/// normalization cache, registry title search, external service. A candidate
/// is only accepted if its processed form fuzzy-matches the processed raw
/// title. A failing or timed-out step is logged and skipped. Nothing is
/// written back, so resolution is a pure read of cache and registry state.
#[derive(Clone)]
pub struct TitleNormalizer {
    names: Arc<dyn NormalizedNameStore>,
    entities: Arc<dyn EntityStore>,
    service: Arc<dyn NormalizationService>,
    min_match_percentage: f64,
    call_timeout: Option<Duration>,
}

impl fmt::Debug for TitleNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TitleNormalizer")
            .field("service", &self.service.name())
            .field("min_match_percentage", &self.min_match_percentage)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl TitleNormalizer {
    #[must_use]
    pub fn new(
        names: Arc<dyn NormalizedNameStore>,
        entities: Arc<dyn EntityStore>,
        service: Arc<dyn NormalizationService>,
        min_match_percentage: f64,
    ) -> Self {
        Self {
            names,
            entities,
            service,
            min_match_percentage,
            call_timeout: None,
        }
    }

    /// Bounds every collaborator call by `timeout`.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Returns the canonical title for `raw_title`.
    ///
    /// # Errors
    ///
    /// `NormalizationFailed` if no step produced a verified match. The caller
    /// should fall back to the raw title.
    pub fn resolve(&self, raw_title: &str) -> ReconcileResult<String> {
        self.normalize(raw_title).map(|n| n.title)
    }

    /// Like [`TitleNormalizer::resolve`], also reporting which step matched.
    ///
    /// # Errors
    ///
    /// `NormalizationFailed` if no step produced a verified match.
    pub fn normalize(&self, raw_title: &str) -> ReconcileResult<Normalized> {
        let processed = process_name(raw_title);
        let failed = || ReconcileError::NormalizationFailed {
            title: raw_title.to_string(),
        };
        if processed.is_empty() {
            return Err(failed());
        }

        let steps = [
            NormalizationStep::Cache,
            NormalizationStep::Registry,
            NormalizationStep::Service,
        ];
        for step in steps {
            let attempt = match step {
                NormalizationStep::Cache => self.from_cache(raw_title, &processed),
                NormalizationStep::Registry => self.from_registry(raw_title, &processed),
                NormalizationStep::Service => self.from_service(raw_title, &processed),
            };
            match attempt {
                Ok(Some(title)) => {
                    debug!(raw = raw_title, canonical = %title, %step, "title normalized");
                    return Ok(Normalized { title, step });
                }
                Ok(None) => {}
                Err(err) => warn!(raw = raw_title, %step, error = %err, "normalization step failed"),
            }
        }

        debug!(raw = raw_title, "title could not be normalized");
        Err(failed())
    }

    fn accepts(&self, processed: &str, candidate: &str) -> bool {
        strings_match(processed, candidate, self.min_match_percentage)
    }

    fn from_cache(&self, raw_title: &str, processed: &str) -> ReconcileResult<Option<String>> {
        let names = Arc::clone(&self.names);
        let text = raw_title.to_string();
        let rows = call_with_timeout("normalization cache lookup", self.call_timeout, move || {
            names.lookup(&text, 1)
        })??;

        Ok(rows
            .into_iter()
            .find(|row| self.accepts(processed, &row.search_text))
            .map(|row| row.normalized_text))
    }

    fn from_registry(&self, raw_title: &str, processed: &str) -> ReconcileResult<Option<String>> {
        let entities = Arc::clone(&self.entities);
        let text = raw_title.to_string();
        let hits = call_with_timeout("registry title search", self.call_timeout, move || {
            entities.search(&text, &[], 1, 0)
        })??;

        Ok(hits
            .into_iter()
            .map(|e| e.title().to_string())
            .find(|title| !title.is_empty() && self.accepts(processed, &process_name(title))))
    }

    fn from_service(&self, raw_title: &str, processed: &str) -> ReconcileResult<Option<String>> {
        let service = Arc::clone(&self.service);
        let text = raw_title.to_string();
        let answer = call_with_timeout("normalization service", self.call_timeout, move || {
            service.normalize(&text)
        })?;

        match answer {
            Ok(name) if self.accepts(processed, &process_name(&name)) => Ok(Some(name)),
            Ok(name) => {
                debug!(raw = raw_title, candidate = %name, "service answer rejected by matcher");
                Ok(None)
            }
            Err(err) => {
                debug!(raw = raw_title, error = %err, "normalization service gave no answer");
                Ok(None)
            }
        }
    }
}
