//! Title normalization.
//!
//! Maps raw incoming titles onto canonical titles through a cascade of
//! increasingly expensive lookups.

mod cascade;
mod service;

pub use cascade::{Normalized, NormalizationStep, TitleNormalizer};
pub use service::{
    DictionaryNormalizationService, NoopNormalizationService, NormalizationError,
    NormalizationService,
};
