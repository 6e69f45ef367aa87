//! In-memory storage backend.
//!
//! Thread-safe in-memory implementations of the storage traits. They are
//! intended for embedded usage, tests, and as a reference implementation of
//! the store contracts.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::entity::{Entity, EntityId, TITLES};
use crate::matcher::{match_percentage, process_name};
use crate::normalized_name::NormalizedNameEntry;
use crate::storage::traits::{EntityStats, EntityStore, NormalizedNameStore, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

#[derive(Debug, Default)]
struct EntityState {
    // Keyed by insertion sequence so scans return entities in creation order.
    by_seq: BTreeMap<u64, Entity>,
    seq_of: HashMap<EntityId, u64>,
    by_title: HashMap<String, BTreeSet<u64>>,
    next_seq: u64,
}

impl EntityState {
    fn index_title(&mut self, title: &str, seq: u64) {
        self.by_title.entry(title.to_string()).or_default().insert(seq);
    }

    fn unindex_title(&mut self, title: &str, seq: u64) {
        if let Some(set) = self.by_title.get_mut(title) {
            set.remove(&seq);
            if set.is_empty() {
                self.by_title.remove(title);
            }
        }
    }

    fn title_taken(&self, title: &str, except: Option<u64>) -> bool {
        self.by_title
            .get(title)
            .is_some_and(|set| set.iter().any(|s| Some(*s) != except))
    }
}

fn page(mut scored: Vec<(f64, u64, Entity)>, limit: usize, offset: usize) -> Vec<Entity> {
    scored.sort_by(|(sa, qa, _), (sb, qb, _)| sb.total_cmp(sa).then_with(|| qa.cmp(qb)));
    scored
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|(_, _, e)| e)
        .collect()
}

/// Thread-safe in-memory entity store.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    state: RwLock<EntityState>,
    unique_titles: bool,
    writes: AtomicU64,
}

impl InMemoryEntityStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects two entities sharing a current title.
    #[must_use]
    pub fn with_unique_titles() -> Self {
        Self {
            unique_titles: true,
            ..Self::default()
        }
    }

    /// Number of successful create/update/delete calls.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of stored entities.
    pub fn len(&self) -> Result<usize, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("entity.len"))?;
        Ok(state.by_seq.len())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }
}

impl EntityStore for InMemoryEntityStore {
    fn create(&self, mut entity: Entity) -> Result<Entity, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("entity.create"))?;

        if entity.id.is_nil() {
            entity.id = EntityId::new();
        } else if state.seq_of.contains_key(&entity.id) {
            return Err(StorageError::DuplicateKey(entity.id.to_string()));
        }

        let title = entity.title().to_string();
        if self.unique_titles && state.title_taken(&title, None) {
            return Err(StorageError::DuplicateKey(title));
        }

        let now = Utc::now();
        entity.created_at = Some(now);
        entity.updated_at = Some(now);

        let seq = state.next_seq;
        state.next_seq += 1;
        state.index_title(&title, seq);
        state.seq_of.insert(entity.id, seq);
        state.by_seq.insert(seq, entity.clone());
        drop(state);

        self.record_write();
        Ok(entity)
    }

    fn update(&self, mut entity: Entity) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("entity.update"))?;
        let seq = *state
            .seq_of
            .get(&entity.id)
            .ok_or(StorageError::EntityNotFound(entity.id))?;

        let prev_title = state
            .by_seq
            .get(&seq)
            .map(|e| e.title().to_string())
            .unwrap_or_default();
        let new_title = entity.title().to_string();

        if prev_title != new_title {
            if self.unique_titles && state.title_taken(&new_title, Some(seq)) {
                return Err(StorageError::DuplicateKey(new_title));
            }
            state.unindex_title(&prev_title, seq);
            state.index_title(&new_title, seq);
        }

        entity.updated_at = Some(Utc::now());
        state.by_seq.insert(seq, entity);
        drop(state);

        self.record_write();
        Ok(())
    }

    fn delete(&self, id: EntityId) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("entity.delete"))?;
        let seq = state
            .seq_of
            .remove(&id)
            .ok_or(StorageError::EntityNotFound(id))?;
        if let Some(prev) = state.by_seq.remove(&seq) {
            state.unindex_title(prev.title(), seq);
        }
        drop(state);

        self.record_write();
        Ok(())
    }

    fn get(&self, id: EntityId) -> Result<Option<Entity>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("entity.get"))?;
        Ok(state
            .seq_of
            .get(&id)
            .and_then(|seq| state.by_seq.get(seq))
            .cloned())
    }

    fn find_by_title(&self, title: &str) -> Result<Option<Entity>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("entity.find_by_title"))?;
        Ok(state
            .by_title
            .get(title)
            .and_then(|set| set.iter().next())
            .and_then(|seq| state.by_seq.get(seq))
            .cloned())
    }

    fn find_by_title_history(
        &self,
        title: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Entity>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("entity.find_by_title_history"))?;

        Ok(state
            .by_seq
            .values()
            .filter(|e| {
                e.attribute(TITLES).is_some_and(|titles| {
                    titles.values().iter().any(|v| {
                        v.as_str() == Some(title) && v.date.map_or(true, |d| d <= as_of)
                    })
                })
            })
            .cloned()
            .collect())
    }

    fn search(
        &self,
        query: &str,
        categories: &[String],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Entity>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query_key = process_name(query);
        let query_tokens: HashSet<&str> = query_key.split(' ').filter(|t| !t.is_empty()).collect();

        let state = self.state.read().map_err(|_| lock_err("entity.search"))?;
        let mut scored: Vec<(f64, u64, Entity)> = Vec::new();
        for (seq, entity) in &state.by_seq {
            if !categories.iter().all(|c| entity.has_category(c)) {
                continue;
            }
            if query_key.is_empty() {
                scored.push((0.0, *seq, entity.clone()));
                continue;
            }

            let title_key = process_name(entity.title());
            let shares_token = title_key.split(' ').any(|t| query_tokens.contains(t));
            if shares_token || title_key.contains(&query_key) {
                scored.push((match_percentage(&query_key, &title_key), *seq, entity.clone()));
            }
        }

        Ok(page(scored, limit, offset))
    }

    fn find_linking_to(
        &self,
        title: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Entity>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("entity.find_linking_to"))?;
        Ok(state
            .by_seq
            .values()
            .filter(|e| e.links.iter().any(|l| l == title))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn stats(&self) -> Result<EntityStats, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("entity.stats"))?;
        let mut stats = EntityStats {
            total_entities: state.by_seq.len(),
            generated_at: Some(Utc::now()),
            ..EntityStats::default()
        };

        for entity in state.by_seq.values() {
            if entity.is_terminated() {
                stats.terminated_entities += 1;
            }
            for category in &entity.categories {
                *stats.category_counts.entry(category.clone()).or_default() += 1;
            }
            for name in entity.attributes.keys() {
                *stats.attribute_counts.entry(name.clone()).or_default() += 1;
            }
            stats.link_count += entity.links.len();
        }

        Ok(stats)
    }
}

/// Thread-safe in-memory normalization cache.
#[derive(Debug, Default)]
pub struct InMemoryNormalizedNameStore {
    entries: RwLock<HashMap<String, NormalizedNameEntry>>,
    writes: AtomicU64,
}

impl InMemoryNormalizedNameStore {
    /// Create a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful inserts.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> Result<usize, StorageError> {
        let entries = self.entries.read().map_err(|_| lock_err("names.len"))?;
        Ok(entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

impl NormalizedNameStore for InMemoryNormalizedNameStore {
    fn lookup(&self, text: &str, limit: usize) -> Result<Vec<NormalizedNameEntry>, StorageError> {
        let key = process_name(text);
        if key.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let entries = self.entries.read().map_err(|_| lock_err("names.lookup"))?;
        if let Some(exact) = entries.get(&key) {
            if limit == 1 {
                return Ok(vec![exact.clone()]);
            }
        }

        let mut scored: Vec<(f64, &NormalizedNameEntry)> = entries
            .values()
            .map(|e| (match_percentage(&key, &e.search_text), e))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|(sa, ea), (sb, eb)| {
            sb.total_cmp(sa)
                .then_with(|| ea.search_text.cmp(&eb.search_text))
        });

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, e)| e.clone())
            .collect())
    }

    fn insert(&self, entry: NormalizedNameEntry) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| lock_err("names.insert"))?;
        entries.insert(entry.search_text.clone(), entry);
        drop(entries);

        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::entity::LIFE_STATUS;
    use crate::value::TimedValue;

    fn date(s: &str) -> DateTime<Utc> {
        format!("{s}T00:00:00Z").parse().unwrap()
    }

    fn acme() -> Entity {
        Entity::builder()
            .title("Acme Co")
            .source("gazette")
            .source_date(date("2020-01-01"))
            .category("organization")
            .build()
    }

    #[test]
    fn entity_create_get_update_delete_and_title_index() {
        let store = InMemoryEntityStore::new();

        let created = store.create(acme()).unwrap();
        assert!(!created.id.is_nil());
        assert!(created.created_at.is_some());
        let id = created.id;

        assert_eq!(store.get(id).unwrap().unwrap().title(), "Acme Co");
        assert_eq!(store.find_by_title("Acme Co").unwrap().unwrap().id, id);
        // Title lookup is exact.
        assert!(store.find_by_title("acme co").unwrap().is_none());

        // Update reindexes by current title.
        let mut renamed = created.clone();
        renamed.set_title(TimedValue::text("Acme Holdings", "gazette", Some(date("2022-01-01"))));
        store.update(renamed).unwrap();
        assert!(store.find_by_title("Acme Co").unwrap().is_none());
        assert_eq!(store.find_by_title("Acme Holdings").unwrap().unwrap().id, id);

        store.delete(id).unwrap();
        assert!(store.get(id).unwrap().is_none());
        assert!(store.find_by_title("Acme Holdings").unwrap().is_none());
        assert_eq!(store.write_count(), 3);
    }

    #[test]
    fn update_and_delete_require_existing_entity() {
        let store = InMemoryEntityStore::new();
        let missing = acme();
        assert!(matches!(store.update(missing), Err(StorageError::EntityNotFound(_))));
        assert!(matches!(
            store.delete(EntityId::new()),
            Err(StorageError::EntityNotFound(_))
        ));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn create_rejects_reused_id() {
        let store = InMemoryEntityStore::new();
        let created = store.create(acme()).unwrap();
        assert!(matches!(store.create(created), Err(StorageError::DuplicateKey(_))));
    }

    #[test]
    fn unique_titles_reject_second_create() {
        let store = InMemoryEntityStore::with_unique_titles();
        store.create(acme()).unwrap();
        assert!(matches!(store.create(acme()), Err(StorageError::DuplicateKey(t)) if t == "Acme Co"));

        let plain = InMemoryEntityStore::new();
        plain.create(acme()).unwrap();
        plain.create(acme()).unwrap();
        assert_eq!(plain.len().unwrap(), 2);
    }

    #[test]
    fn title_history_prefilter() {
        let store = InMemoryEntityStore::new();
        let mut e = acme();
        e.set_title(TimedValue::text("Acme Holdings", "gazette", Some(date("2022-01-01"))));
        let id = store.create(e).unwrap().id;

        let hits = store.find_by_title_history("Acme Co", date("2021-01-01")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, id);

        assert!(store.find_by_title_history("Acme Co", date("2019-01-01")).unwrap().is_empty());
        assert!(store.find_by_title_history("Acme Holdings", date("2021-01-01")).unwrap().is_empty());
    }

    #[test]
    fn search_ranks_and_filters_by_category() {
        let store = InMemoryEntityStore::new();
        store.create(acme()).unwrap();
        store
            .create(Entity::builder().title("Acme Corporation Holdings").category("organization").build())
            .unwrap();
        store
            .create(Entity::builder().title("Acme Co").category("person").build())
            .unwrap();
        store
            .create(Entity::builder().title("Globex").category("organization").build())
            .unwrap();

        let hits = store.search("ACME CO.", &[], 10, 0).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].title(), "Acme Co");
        assert_eq!(hits[0].categories.iter().next().map(String::as_str), Some("organization"));

        let orgs = store.search("acme", &["organization".to_string()], 10, 0).unwrap();
        assert_eq!(orgs.len(), 2);

        let paged = store.search("acme", &[], 1, 1).unwrap();
        assert_eq!(paged.len(), 1);

        assert_eq!(store.search("", &[], 10, 0).unwrap().len(), 4);
        assert!(store.search("acme", &[], 0, 0).unwrap().is_empty());
    }

    #[test]
    fn linking_and_stats() {
        let store = InMemoryEntityStore::new();
        store.create(acme()).unwrap();
        store
            .create(Entity::builder().title("Jane Doe").category("person").link("Acme Co").build())
            .unwrap();
        let mut gone = Entity::builder().title("Old Corp").category("organization").build();
        gone.set_attribute(LIFE_STATUS, TimedValue::text("Terminated", "gazette", None));
        store.create(gone).unwrap();

        let linking = store.find_linking_to("Acme Co", 10, 0).unwrap();
        assert_eq!(linking.len(), 1);
        assert_eq!(linking[0].title(), "Jane Doe");

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_entities, 3);
        assert_eq!(stats.terminated_entities, 1);
        assert_eq!(stats.category_counts.get("organization"), Some(&2));
        assert_eq!(stats.attribute_counts.get(TITLES), Some(&3));
        assert_eq!(stats.link_count, 1);
    }

    #[test]
    fn normalized_names_lookup_prefers_exact_key() {
        let names = InMemoryNormalizedNameStore::new();
        names.insert(NormalizedNameEntry::new("Acme Co", "Acme Co")).unwrap();
        names.insert(NormalizedNameEntry::new("Acme Corporation", "Acme Corporation")).unwrap();

        let hit = names.lookup("ACME CO.", 1).unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].normalized_text, "Acme Co");

        let near = names.lookup("acme corporatio", 1).unwrap();
        assert_eq!(near[0].normalized_text, "Acme Corporation");

        assert!(names.lookup("   ", 1).unwrap().is_empty());
    }

    #[test]
    fn normalized_names_insert_is_idempotent() {
        let names = InMemoryNormalizedNameStore::new();
        names.insert(NormalizedNameEntry::new("Acme Co", "Acme Co")).unwrap();
        names.insert(NormalizedNameEntry::new("ACME CO.", "Acme Co")).unwrap();
        assert_eq!(names.len().unwrap(), 1);
        assert_eq!(names.write_count(), 2);
    }
}
