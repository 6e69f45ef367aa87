//! Temporal entity resolution.
//!
//! Entities change over real-world time: a company is renamed, a post is
//! vacated. The [`TemporalResolver`] finds the entity that carried a given
//! title at a given date, so a fact can be attributed to the entity as it
//! existed then rather than as it exists now.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::entity::{Entity, TITLES};
use crate::error::{ReconcileError, ReconcileResult};
use crate::storage::EntityStore;
use crate::value::TimedValue;

/// Resolves a title to the entity version valid at a date.
#[derive(Clone)]
pub struct TemporalResolver {
    entities: Arc<dyn EntityStore>,
}

impl fmt::Debug for TemporalResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporalResolver").finish_non_exhaustive()
    }
}

impl TemporalResolver {
    #[must_use]
    pub fn new(entities: Arc<dyn EntityStore>) -> Self {
        Self { entities }
    }

    /// Returns the entity titled `title` as of `as_of`.
    ///
    /// For every candidate the title history is probed twice: the value
    /// effective at `as_of`, and the value superseded exactly at `as_of`
    /// (so a rename that takes effect at `as_of` still attributes the old
    /// title to its entity). Among matches the greatest effective date wins;
    /// on equal dates the first match is kept, exact probe before boundary
    /// probe. An undated match is only a fallback while no dated value has
    /// matched.
    ///
    /// # Errors
    ///
    /// - `NoMatchingEntity` if no candidate carried the title at that date.
    /// - `Storage` if the candidate query fails.
    pub fn resolve_as_of(&self, title: &str, as_of: DateTime<Utc>) -> ReconcileResult<Entity> {
        let candidates = self.entities.find_by_title_history(title, as_of)?;
        debug!(title, %as_of, candidates = candidates.len(), "resolving title as of date");

        let mut best: Option<(Option<DateTime<Utc>>, Entity)> = None;
        for candidate in candidates {
            let Some(titles) = candidate.attribute(TITLES) else {
                continue;
            };
            let probes = [titles.value_at(as_of), titles.value_before(as_of)];

            let mut pick: Option<Option<DateTime<Utc>>> = None;
            for value in probes.into_iter().flatten() {
                if value.as_str() != Some(title) {
                    continue;
                }
                if improves(best.as_ref().map(|(d, _)| *d), pick, value) {
                    pick = Some(value.date);
                }
            }

            if let Some(date) = pick {
                best = Some((date, candidate));
            }
        }

        best.map(|(_, entity)| entity)
            .ok_or_else(|| ReconcileError::NoMatchingEntity {
                title: title.to_string(),
                as_of,
            })
    }
}

/// True if `value` should replace the current best match.
///
/// `best` is the date of the best match across earlier candidates and
/// `pick` the best match within the current candidate so far.
fn improves(
    best: Option<Option<DateTime<Utc>>>,
    pick: Option<Option<DateTime<Utc>>>,
    value: &TimedValue,
) -> bool {
    match (value.date, pick.or(best)) {
        // Nothing matched yet: anything qualifies.
        (_, None) => true,
        (Some(date), Some(Some(current))) => date > current,
        (Some(_), Some(None)) => true,
        // Undated values are only a fallback; ties keep the first match.
        (None, Some(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::storage::InMemoryEntityStore;

    fn date(s: &str) -> DateTime<Utc> {
        format!("{s}T00:00:00Z").parse().unwrap()
    }

    fn store_with(entities: Vec<Entity>) -> (Arc<InMemoryEntityStore>, Vec<Entity>) {
        let store = Arc::new(InMemoryEntityStore::new());
        let created = entities.into_iter().map(|e| store.create(e).unwrap()).collect();
        (store, created)
    }

    fn titled(title: &str, at: Option<&str>) -> Entity {
        let mut e = Entity::new();
        e.set_title(TimedValue::text(title, "gazette", at.map(date)));
        e
    }

    #[test]
    fn resolves_at_most_recent_title_date() {
        let (store, created) = store_with(vec![titled("Acme Co", Some("2020-01-01"))]);
        let resolver = TemporalResolver::new(store);
        let found = resolver.resolve_as_of("Acme Co", date("2020-01-01")).unwrap();
        assert_eq!(found.id, created[0].id);
    }

    #[test]
    fn before_first_title_is_no_match() {
        let (store, _) = store_with(vec![titled("Acme Co", Some("2020-01-01"))]);
        let resolver = TemporalResolver::new(store);
        let err = resolver.resolve_as_of("Acme Co", date("2019-12-31")).unwrap_err();
        assert!(err.is_no_match());
    }

    #[test]
    fn prefers_most_recent_holder_of_title() {
        // A post held by two successive office holders.
        let (store, created) = store_with(vec![
            titled("Minister of Health", Some("2015-01-01")),
            titled("Minister of Health", Some("2019-01-01")),
        ]);
        let resolver = TemporalResolver::new(store);

        let now = resolver.resolve_as_of("Minister of Health", date("2020-01-01")).unwrap();
        assert_eq!(now.id, created[1].id);

        let then = resolver.resolve_as_of("Minister of Health", date("2016-01-01")).unwrap();
        assert_eq!(then.id, created[0].id);
    }

    #[test]
    fn renamed_entity_matches_old_title_only_before_rename() {
        let mut e = titled("Acme Co", Some("2020-01-01"));
        e.set_title(TimedValue::text("Acme Holdings", "gazette", Some(date("2022-01-01"))));
        let (store, created) = store_with(vec![e]);
        let resolver = TemporalResolver::new(store);

        assert_eq!(resolver.resolve_as_of("Acme Co", date("2021-06-01")).unwrap().id, created[0].id);
        // At the rename instant the superseded title still resolves.
        assert_eq!(resolver.resolve_as_of("Acme Co", date("2022-01-01")).unwrap().id, created[0].id);
        assert!(resolver.resolve_as_of("Acme Co", date("2023-01-01")).is_err());
        assert_eq!(
            resolver.resolve_as_of("Acme Holdings", date("2023-01-01")).unwrap().id,
            created[0].id
        );
    }

    #[test]
    fn undated_title_is_fallback_only() {
        let (store, created) = store_with(vec![
            titled("Acme Co", None),
            titled("Acme Co", Some("2020-01-01")),
        ]);
        let resolver = TemporalResolver::new(store);

        let dated = resolver.resolve_as_of("Acme Co", date("2021-01-01")).unwrap();
        assert_eq!(dated.id, created[1].id);

        let undated = resolver.resolve_as_of("Acme Co", date("2019-01-01")).unwrap();
        assert_eq!(undated.id, created[0].id);
    }

    #[test]
    fn equal_dates_keep_first_candidate() {
        let (store, created) = store_with(vec![
            titled("Acme Co", Some("2020-01-01")),
            titled("Acme Co", Some("2020-01-01")),
        ]);
        let resolver = TemporalResolver::new(store);
        let found = resolver.resolve_as_of("Acme Co", date("2020-06-01")).unwrap();
        assert_eq!(found.id, created[0].id);
    }

    #[test]
    fn several_undated_candidates_keep_first() {
        let (store, created) = store_with(vec![
            titled("Acme Co", None),
            titled("Acme Co", None),
            titled("Acme Co", None),
        ]);
        let resolver = TemporalResolver::new(store);
        let found = resolver.resolve_as_of("Acme Co", date("2020-06-01")).unwrap();
        assert_eq!(found.id, created[0].id);
    }

    #[test]
    fn title_comparison_is_exact() {
        let (store, _) = store_with(vec![titled("Acme Co", Some("2020-01-01"))]);
        let resolver = TemporalResolver::new(store);
        assert!(resolver.resolve_as_of("ACME CO", date("2021-01-01")).is_err());
    }
}
