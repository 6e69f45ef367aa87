//! Reconcile path: create or merge an incoming record.

use tracing::{debug, info, warn};

use crate::entity::Entity;
use crate::error::{ReconcileResult, ValidationError};
use crate::normalized_name::NormalizedNameEntry;
use crate::policy::Compatibility;
use crate::value::TimedValue;

use super::{ReconcileStatus, Reconciler};

impl Reconciler {
    /// Adds an incoming record to the registry.
    ///
    /// The title is canonicalized first: records from verified sources define
    /// the canonical name and seed the normalization cache, all others go
    /// through the normalization cascade. If an existing entity carried the
    /// canonical title (as of the record's source date, when it has one) and
    /// the policy accepts the pair, the policy's merge target is updated.
    /// Otherwise the record is created.
    ///
    /// # Errors
    ///
    /// - `EmptyTitle` for a blank title; nothing is written.
    /// - `Storage` if a store call fails.
    pub fn add(&self, mut record: Entity) -> ReconcileResult<(Entity, ReconcileStatus)> {
        let raw_title = record.title().trim().to_string();
        if raw_title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }

        record.refresh_snippet(self.config.snippet_length);

        let title = self.canonical_title(&mut record, &raw_title);
        let title_source = if title == raw_title {
            record.source.clone()
        } else {
            self.config.normalizer_source.clone()
        };
        record.replace_title(TimedValue::text(title.as_str(), title_source, record.source_date));

        if let Some(existing) = self.find_existing(&title, &record)? {
            if let Compatibility::Compatible(mut merged) = self.policy.check(&existing, &record) {
                fill_if_empty(&mut merged.image_url, &record.image_url);
                fill_if_empty(&mut merged.source, &record.source);
                fill_if_empty(&mut merged.source_signature, &record.source_signature);
                merged.refresh_snippet(self.config.snippet_length);

                info!(id = %merged.id, title = merged.title(), "entity exists, updating");
                self.entities.update(merged.clone())?;
                return Ok((merged, ReconcileStatus::Updated));
            }
            debug!(
                id = %existing.id,
                title = %title,
                policy = self.policy.name(),
                "existing entity rejected by policy"
            );
        }

        info!(title = %title, source = %record.source, "creating new entity");
        let created = self.entities.create(record)?;
        Ok((created, ReconcileStatus::Created))
    }

    /// Resolves the title to record `record` under.
    fn canonical_title(&self, record: &mut Entity, raw_title: &str) -> String {
        if self.verifier.is_verified(&record.source) {
            let entry = NormalizedNameEntry::new(raw_title, raw_title);
            if let Err(err) = self.names.insert(entry) {
                warn!(title = raw_title, error = %err, "failed to cache verified title");
            }
            return raw_title.to_string();
        }

        match self.normalizer.resolve(raw_title) {
            Ok(title) => title,
            Err(err) => {
                debug!(title = raw_title, error = %err, "keeping unnormalized title");
                record.add_category(self.config.unnormalized_category.clone());
                raw_title.to_string()
            }
        }
    }

    fn find_existing(&self, title: &str, record: &Entity) -> ReconcileResult<Option<Entity>> {
        let Some(as_of) = record.source_date else {
            return Ok(self.entities.find_by_title(title)?);
        };
        match self.resolver.resolve_as_of(title, as_of) {
            Ok(entity) => Ok(Some(entity)),
            Err(err) if err.is_no_match() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

fn fill_if_empty(field: &mut String, incoming: &str) {
    if field.is_empty() {
        *field = incoming.to_string();
    }
}
