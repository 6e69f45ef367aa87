//! Entity types and identity management.
//!
//! An [`Entity`] is the canonical registry record for a real-world subject.
//! Its identity is the store-assigned [`EntityId`]; everything else, the title
//! included, is a value that can change over real-world time and is kept as a
//! dated history in [`Attribute`]s.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attribute::Attribute;
use crate::value::{TimedValue, Value};

/// Attribute holding the title history.
pub const TITLES: &str = "titles";

/// Attribute holding the life status history.
pub const LIFE_STATUS: &str = "lifeStatus";

/// Attribute holding the body text the snippet is derived from.
pub const CONTENT: &str = "content";

/// `lifeStatus` value marking an entity as terminated.
pub const TERMINATED: &str = "Terminated";

/// Stable entity identifier assigned by the store.
///
/// A record that has not been stored yet carries the nil id.
///
/// # Examples
///
/// ```
/// use gig_reconcile::EntityId;
///
/// let id = EntityId::new();
/// assert!(!id.is_nil());
/// assert!(EntityId::nil().is_nil());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Creates a new random entity ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// The id of a record that has not been stored yet.
    #[must_use]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Canonical registry record.
///
/// Incoming records from ingestion sources use the same type; they carry the
/// nil id until the store creates them.
///
/// # Examples
///
/// ```
/// use gig_reconcile::Entity;
///
/// let entity = Entity::builder()
///     .title("Acme Co")
///     .source("gazette")
///     .category("organization")
///     .build();
/// assert_eq!(entity.title(), "Acme Co");
/// assert!(entity.id.is_nil());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub id: EntityId,

    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,

    #[serde(default)]
    pub categories: BTreeSet<String>,

    /// Titles of entities this record refers to.
    #[serde(default)]
    pub links: Vec<String>,

    #[serde(default)]
    pub image_url: String,

    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub source_signature: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub snippet: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity {
    /// Creates an empty, unstored record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn builder() -> EntityBuilder {
        EntityBuilder::default()
    }

    /// The current title, or an empty string if none has been recorded.
    #[must_use]
    pub fn title(&self) -> &str {
        self.attribute(TITLES)
            .and_then(Attribute::latest)
            .and_then(TimedValue::as_str)
            .unwrap_or_default()
    }

    /// Appends a value to the title history.
    pub fn set_title(&mut self, value: TimedValue) {
        self.set_attribute(TITLES, value);
    }

    /// Replaces the current title with `value`, keeping earlier titles.
    pub fn replace_title(&mut self, value: TimedValue) {
        if let Some(titles) = self.attributes.get_mut(TITLES) {
            titles.pop_latest();
        }
        self.set_title(value);
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Records a fact under `name`, creating the attribute if needed.
    pub fn set_attribute(&mut self, name: &str, value: TimedValue) {
        self.attributes
            .entry(name.to_string())
            .or_insert_with(|| Attribute::new(name))
            .insert(value);
    }

    /// Removes an attribute and its whole history.
    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute> {
        self.attributes.remove(name)
    }

    pub fn add_category(&mut self, category: impl Into<String>) {
        self.categories.insert(category.into());
    }

    #[must_use]
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.contains(category)
    }

    pub fn add_link(&mut self, title: impl Into<String>) {
        let title = title.into();
        if !self.links.contains(&title) {
            self.links.push(title);
        }
    }

    /// True once a `lifeStatus` of "Terminated" is the current status.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.attribute(LIFE_STATUS)
            .and_then(Attribute::latest)
            .and_then(TimedValue::as_str)
            == Some(TERMINATED)
    }

    /// Recomputes the snippet from the latest `content` value.
    ///
    /// HTML tags are stripped, whitespace collapsed and the result cut to at
    /// most `max_chars` characters. Records without content keep their
    /// current snippet.
    pub fn refresh_snippet(&mut self, max_chars: usize) {
        let Some(content) = self
            .attribute(CONTENT)
            .and_then(Attribute::latest)
            .map(|v| &v.value)
        else {
            return;
        };

        let text = match content {
            Value::Html(html) => strip_tags(html),
            Value::String(s) => s.clone(),
            _ => return,
        };

        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        self.snippet = match collapsed.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", collapsed[..cut].trim_end()),
            None => collapsed,
        };
    }
}

fn strip_tags(html: &str) -> String {
    static TAGS: OnceLock<Option<Regex>> = OnceLock::new();
    match TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]*>").ok()) {
        Some(re) => re.replace_all(html, " ").into_owned(),
        None => html.to_string(),
    }
}

/// Fluent constructor for incoming records.
#[derive(Debug, Clone, Default)]
pub struct EntityBuilder {
    entity: Entity,
    title: Option<String>,
}

impl EntityBuilder {
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.entity.source = source.into();
        self
    }

    #[must_use]
    pub fn source_signature(mut self, signature: impl Into<String>) -> Self {
        self.entity.source_signature = signature.into();
        self
    }

    #[must_use]
    pub fn source_date(mut self, date: DateTime<Utc>) -> Self {
        self.entity.source_date = Some(date);
        self
    }

    #[must_use]
    pub fn image_url(mut self, url: impl Into<String>) -> Self {
        self.entity.image_url = url.into();
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.entity.add_category(category);
        self
    }

    #[must_use]
    pub fn link(mut self, title: impl Into<String>) -> Self {
        self.entity.add_link(title);
        self
    }

    /// Records an extra fact. Values without a source inherit the record's.
    #[must_use]
    pub fn attribute(mut self, name: &str, mut value: TimedValue) -> Self {
        if value.source.is_empty() {
            value.source.clone_from(&self.entity.source);
        }
        self.entity.set_attribute(name, value);
        self
    }

    #[must_use]
    pub fn content(self, text: impl Into<String>) -> Self {
        self.attribute(CONTENT, TimedValue::new(Value::String(text.into())))
    }

    /// Builds the record. The title, if given, becomes a title value dated
    /// with the record's source date.
    #[must_use]
    pub fn build(self) -> Entity {
        let mut entity = self.entity;
        if let Some(title) = self.title {
            let value = TimedValue::text(title, entity.source.clone(), entity.source_date);
            entity.set_title(value);
        }
        entity
    }
}
