//! Abstract storage traits.
//!
//! The reconciliation core depends only on these contracts. Production
//! adapters wrap a real database; [`crate::storage::memory`] provides the
//! in-memory implementations used for embedded use and tests.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::{Entity, EntityId};
use crate::normalized_name::NormalizedNameEntry;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Entity not found.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),

    /// Backend temporarily unreachable.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// True if the failure may clear up on retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Aggregate counts over the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStats {
    pub total_entities: usize,
    pub terminated_entities: usize,
    pub category_counts: BTreeMap<String, usize>,
    pub attribute_counts: BTreeMap<String, usize>,
    pub link_count: usize,
    pub generated_at: Option<DateTime<Utc>>,
}

/// Storage trait for Entity operations.
///
/// Implementations assign ids on [`EntityStore::create`] and are the last line
/// of defence against duplicates: reconciliation reads then writes without
/// compare-and-swap.
pub trait EntityStore: Send + Sync {
    /// Stores a new entity, assigning its id. Returns the stored entity.
    fn create(&self, entity: Entity) -> Result<Entity, StorageError>;

    /// Replaces an existing entity. Returns `EntityNotFound` if absent.
    fn update(&self, entity: Entity) -> Result<(), StorageError>;

    /// Deletes an entity by id. Returns `EntityNotFound` if absent.
    fn delete(&self, id: EntityId) -> Result<(), StorageError>;

    /// Get an entity by id.
    fn get(&self, id: EntityId) -> Result<Option<Entity>, StorageError>;

    /// Finds the entity whose current title is exactly `title`.
    fn find_by_title(&self, title: &str) -> Result<Option<Entity>, StorageError>;

    /// Pre-filter for temporal resolution: entities with a `titles` value
    /// equal to `title` that was effective on or before `as_of` (or undated).
    ///
    /// Callers re-verify; implementations may return extra candidates.
    fn find_by_title_history(
        &self,
        title: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Entity>, StorageError>;

    /// Title search, best match first. Entities must carry every category in
    /// `categories`. An empty query lists all entities.
    fn search(
        &self,
        query: &str,
        categories: &[String],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Entity>, StorageError>;

    /// Entities whose links contain `title`.
    fn find_linking_to(
        &self,
        title: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Entity>, StorageError>;

    /// Aggregate counts over all stored entities.
    fn stats(&self) -> Result<EntityStats, StorageError>;
}

/// Storage trait for the normalization cache.
pub trait NormalizedNameStore: Send + Sync {
    /// Up to `limit` cache rows for `text`, closest first.
    fn lookup(&self, text: &str, limit: usize) -> Result<Vec<NormalizedNameEntry>, StorageError>;

    /// Inserts a row. Re-inserting the same search text replaces the row.
    fn insert(&self, entry: NormalizedNameEntry) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test: ensure traits are object-safe
    fn _assert_entity_store_object_safe(_: &dyn EntityStore) {}
    fn _assert_normalized_name_store_object_safe(_: &dyn NormalizedNameStore) {}

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::EntityNotFound(EntityId::new());
        assert!(err.to_string().contains("Entity not found"));

        let err = StorageError::BackendError("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
        assert!(!err.is_transient());
        assert!(StorageError::Unavailable("x".into()).is_transient());
    }
}
