//! # gig-reconcile - Entity registry reconciliation
//!
//! Decides whether an incoming record describes an entity the registry
//! already knows, and keeps the registry's title history consistent over
//! real-world time.
//!
//! ## Core Concepts
//!
//! - **Entity**: A registry record whose attributes keep a dated value history
//! - **Title normalization**: Mapping a raw title onto its canonical spelling
//!   through a cache, the registry itself and an external service
//! - **Temporal resolution**: Finding the entity that carried a title at a date
//! - **Reconciliation**: Create-or-merge of incoming records, and termination
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use gig_reconcile::{
//!     Entity, InMemoryEntityStore, InMemoryNormalizedNameStore, MergingPolicy,
//!     NoopNormalizationService, ReconcileStatus, Reconciler,
//! };
//!
//! let reconciler = Reconciler::new(
//!     Arc::new(InMemoryEntityStore::new()),
//!     Arc::new(InMemoryNormalizedNameStore::new()),
//!     Arc::new(NoopNormalizationService),
//!     Arc::new(MergingPolicy::new().ignoring("arbitrary-entities")),
//! );
//!
//! let record = Entity::builder().title("Acme Co").source("gazette").build();
//! let (_, status) = reconciler.add(record)?;
//! assert_eq!(status, ReconcileStatus::Created);
//!
//! let again = Entity::builder().title("ACME CO.").source("news").build();
//! let (entity, status) = reconciler.add(again)?;
//! assert_eq!(status, ReconcileStatus::Updated);
//! assert_eq!(entity.title(), "Acme Co");
//! # Ok::<(), gig_reconcile::ReconcileError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod attribute;
pub mod entity;
pub mod error;
pub mod normalized_name;
pub mod value;

// Collaborators and configuration
pub mod config;
pub mod policy;
pub mod storage;
pub mod trust;

// Reconciliation
pub mod bounded;
pub mod matcher;
pub mod normalizer;
pub mod reconciler;
pub mod temporal;

// Re-export primary types at crate root for convenience
pub use attribute::Attribute;
pub use config::ReconcilerConfig;
pub use entity::{Entity, EntityBuilder, EntityId};
pub use error::{ReconcileError, ReconcileResult, ValidationError};
pub use normalized_name::{NormalizedNameEntry, NormalizedNameId};
pub use value::{TimedValue, Value, ValueType};

pub use matcher::{match_percentage, process_name, strings_match};
pub use normalizer::{
    DictionaryNormalizationService, NoopNormalizationService, Normalized, NormalizationError,
    NormalizationService, NormalizationStep, TitleNormalizer,
};
pub use policy::{Compatibility, CompatibilityPolicy, MergingPolicy};
pub use reconciler::{ReconcileStatus, Reconciler, TerminateOutcome};
pub use storage::{
    EntityStats, EntityStore, InMemoryEntityStore, InMemoryNormalizedNameStore,
    NormalizedNameStore, StorageError,
};
pub use temporal::TemporalResolver;
pub use trust::{SourceVerifier, VerifiedSourceList};
