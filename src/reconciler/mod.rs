//! Entity reconciliation.
//!
//! The [`Reconciler`] is the write path of the registry. It decides whether an
//! incoming record is a new entity or an update to one already stored, and
//! records terminations. Reads are passed through to the store so callers
//! only need one handle.

mod add;
mod terminate;

pub use terminate::TerminateOutcome;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ReconcilerConfig;
use crate::entity::{Entity, EntityId};
use crate::error::ReconcileResult;
use crate::normalizer::{NormalizationService, TitleNormalizer};
use crate::policy::CompatibilityPolicy;
use crate::storage::{EntityStats, EntityStore, NormalizedNameStore};
use crate::temporal::TemporalResolver;
use crate::trust::{SourceVerifier, VerifiedSourceList};

/// Whether [`Reconciler::add`] stored a new entity or merged into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReconcileStatus {
    /// No compatible entity existed; the record was stored as a new entity.
    Created,
    /// The record was merged into an existing entity.
    Updated,
}

impl ReconcileStatus {
    /// HTTP status an adapter should answer with.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::Created => 201,
            Self::Updated => 202,
        }
    }
}

impl fmt::Display for ReconcileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
        }
    }
}

/// Entity registry write path.
///
/// Holds its collaborators explicitly; there is no global state. Cloning is
/// cheap and clones share the same stores.
#[derive(Clone)]
pub struct Reconciler {
    entities: Arc<dyn EntityStore>,
    names: Arc<dyn NormalizedNameStore>,
    service: Arc<dyn NormalizationService>,
    normalizer: TitleNormalizer,
    resolver: TemporalResolver,
    policy: Arc<dyn CompatibilityPolicy>,
    verifier: Arc<dyn SourceVerifier>,
    config: ReconcilerConfig,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("normalizer", &self.normalizer)
            .field("policy", &self.policy.name())
            .field("verifier", &self.verifier.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Create a reconciler with the default configuration.
    #[must_use]
    pub fn new(
        entities: Arc<dyn EntityStore>,
        names: Arc<dyn NormalizedNameStore>,
        service: Arc<dyn NormalizationService>,
        policy: Arc<dyn CompatibilityPolicy>,
    ) -> Self {
        let config = ReconcilerConfig::default();
        let normalizer = Self::build_normalizer(&entities, &names, &service, &config);
        let verifier = Arc::new(VerifiedSourceList::new(config.verified_sources.clone()));
        Self {
            resolver: TemporalResolver::new(Arc::clone(&entities)),
            entities,
            names,
            service,
            normalizer,
            policy,
            verifier,
            config,
        }
    }

    /// Replace the configuration.
    ///
    /// The verifier is rebuilt from `verified_sources`; call
    /// [`Reconciler::with_source_verifier`] afterwards to override it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration does not validate.
    pub fn with_config(mut self, config: ReconcilerConfig) -> ReconcileResult<Self> {
        config.validate()?;
        self.normalizer =
            Self::build_normalizer(&self.entities, &self.names, &self.service, &config);
        self.verifier = Arc::new(VerifiedSourceList::new(config.verified_sources.clone()));
        self.config = config;
        Ok(self)
    }

    /// Replace the source verifier.
    #[must_use]
    pub fn with_source_verifier(mut self, verifier: Arc<dyn SourceVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    fn build_normalizer(
        entities: &Arc<dyn EntityStore>,
        names: &Arc<dyn NormalizedNameStore>,
        service: &Arc<dyn NormalizationService>,
        config: &ReconcilerConfig,
    ) -> TitleNormalizer {
        TitleNormalizer::new(
            Arc::clone(names),
            Arc::clone(entities),
            Arc::clone(service),
            config.min_match_percentage,
        )
        .with_call_timeout(config.call_timeout())
    }

    #[must_use]
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    #[must_use]
    pub const fn normalizer(&self) -> &TitleNormalizer {
        &self.normalizer
    }

    /// Returns the entity that carried `title` at `as_of`.
    ///
    /// # Errors
    ///
    /// `NoMatchingEntity` if none did; store failures propagate.
    pub fn resolve_as_of(&self, title: &str, as_of: DateTime<Utc>) -> ReconcileResult<Entity> {
        self.resolver.resolve_as_of(title, as_of)
    }

    /// Persists a modified entity as is.
    ///
    /// # Errors
    ///
    /// Store failures propagate unchanged.
    pub fn update(&self, entity: Entity) -> ReconcileResult<()> {
        Ok(self.entities.update(entity)?)
    }

    /// Removes an entity.
    ///
    /// # Errors
    ///
    /// Store failures propagate unchanged.
    pub fn delete(&self, entity: &Entity) -> ReconcileResult<()> {
        Ok(self.entities.delete(entity.id)?)
    }

    /// # Errors
    ///
    /// Store failures propagate unchanged.
    pub fn get_entity(&self, id: EntityId) -> ReconcileResult<Option<Entity>> {
        Ok(self.entities.get(id)?)
    }

    /// Looks up an entity by its current title.
    ///
    /// # Errors
    ///
    /// Store failures propagate unchanged.
    pub fn get_entity_by_title(&self, title: &str) -> ReconcileResult<Option<Entity>> {
        Ok(self.entities.find_by_title(title)?)
    }

    /// Searches entities by title, optionally restricted to entities in all
    /// of `categories`.
    ///
    /// # Errors
    ///
    /// Store failures propagate unchanged.
    pub fn get_entities(
        &self,
        search: &str,
        categories: &[String],
        limit: usize,
        offset: usize,
    ) -> ReconcileResult<Vec<Entity>> {
        Ok(self.entities.search(search, categories, limit, offset)?)
    }

    /// Entities that link to `entity` by its title.
    ///
    /// # Errors
    ///
    /// Store failures propagate unchanged.
    pub fn get_related_entities(
        &self,
        entity: &Entity,
        limit: usize,
        offset: usize,
    ) -> ReconcileResult<Vec<Entity>> {
        Ok(self.entities.find_linking_to(entity.title(), limit, offset)?)
    }

    /// # Errors
    ///
    /// Store failures propagate unchanged.
    pub fn stats(&self) -> ReconcileResult<EntityStats> {
        Ok(self.entities.stats()?)
    }
}
