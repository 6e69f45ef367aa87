//! Compatibility policies.
//!
//! A policy judges whether an incoming record describes the same real-world
//! entity as an existing one and, if so, produces the merge target that the
//! reconciler persists. Scoring heuristics live outside this crate; this
//! module defines the seam and ships [`MergingPolicy`] as a reference
//! implementation for embedded use and tests.

use std::collections::BTreeSet;

use crate::entity::Entity;

/// Outcome of a compatibility check.
#[derive(Debug, Clone, PartialEq)]
pub enum Compatibility {
    /// Same real-world entity; the payload is the accepted merge target.
    Compatible(Entity),

    /// Different entities.
    Incompatible,
}

impl Compatibility {
    #[must_use]
    pub const fn is_compatible(&self) -> bool {
        matches!(self, Self::Compatible(_))
    }
}

/// Decides whether two records describe the same entity.
pub trait CompatibilityPolicy: Send + Sync {
    /// Name of the policy (for audit/debugging).
    fn name(&self) -> &str;

    /// Judges `incoming` against the stored `existing` entity.
    ///
    /// A compatible result must keep `existing.id`.
    fn check(&self, existing: &Entity, incoming: &Entity) -> Compatibility;
}

/// Reference policy: compatible unless the records' categories conflict.
///
/// Two records conflict when both carry classifying categories and share
/// none of them. Categories listed as `ignored` (such as the unnormalized
/// marker) do not classify. A compatible merge appends every incoming
/// attribute value to the existing history, and unions categories and links.
#[derive(Debug, Clone, Default)]
pub struct MergingPolicy {
    ignored: BTreeSet<String>,
}

impl MergingPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Excludes a category from the conflict test.
    #[must_use]
    pub fn ignoring(mut self, category: impl Into<String>) -> Self {
        self.ignored.insert(category.into());
        self
    }

    fn classifying<'a>(&'a self, entity: &'a Entity) -> impl Iterator<Item = &'a String> {
        entity.categories.iter().filter(|c| !self.ignored.contains(*c))
    }
}

impl CompatibilityPolicy for MergingPolicy {
    fn name(&self) -> &str {
        "merging"
    }

    fn check(&self, existing: &Entity, incoming: &Entity) -> Compatibility {
        let ours: BTreeSet<&String> = self.classifying(existing).collect();
        let theirs: BTreeSet<&String> = self.classifying(incoming).collect();
        if !ours.is_empty() && !theirs.is_empty() && ours.is_disjoint(&theirs) {
            return Compatibility::Incompatible;
        }

        let mut merged = existing.clone();
        for (name, attribute) in &incoming.attributes {
            for value in attribute.values() {
                merged.set_attribute(name, value.clone());
            }
        }
        for category in &incoming.categories {
            merged.add_category(category.clone());
        }
        for link in &incoming.links {
            merged.add_link(link.clone());
        }
        Compatibility::Compatible(merged)
    }
}
