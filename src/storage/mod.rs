//! Storage contracts and in-memory backends.

pub mod memory;
mod traits;

pub use memory::{InMemoryEntityStore, InMemoryNormalizedNameStore};
pub use traits::{EntityStats, EntityStore, NormalizedNameStore, StorageError};
