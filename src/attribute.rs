//! Attribute histories.
//!
//! An [`Attribute`] is the ordered history of facts asserted for one named
//! property of an entity. Values are kept sorted by effective date, undated
//! values first, so the last value is the current one and "as of" lookups are
//! a scan from the end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::TimedValue;

/// Ordered history of timed facts for a single attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,

    #[serde(default)]
    values: Vec<TimedValue>,
}

impl Attribute {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Inserts a value at its date-ordered position.
    ///
    /// Values with equal dates keep insertion order. Returns false (and leaves
    /// the history unchanged) if the same payload is already recorded for the
    /// same date.
    pub fn insert(&mut self, value: TimedValue) -> bool {
        if self.values.iter().any(|v| v.same_fact(&value)) {
            return false;
        }
        // Option<DateTime> orders None first, which places undated values at
        // the start of the history.
        let at = self.values.partition_point(|v| v.date <= value.date);
        self.values.insert(at, value);
        true
    }

    /// All values, oldest effective date first.
    #[must_use]
    pub fn values(&self) -> &[TimedValue] {
        &self.values
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// The current value (greatest effective date).
    #[must_use]
    pub fn latest(&self) -> Option<&TimedValue> {
        self.values.last()
    }

    /// Removes and returns the current value.
    pub fn pop_latest(&mut self) -> Option<TimedValue> {
        self.values.pop()
    }

    /// The value effective at `at`: the greatest date not after `at`.
    ///
    /// Falls back to the most recent undated value when no dated value
    /// qualifies.
    #[must_use]
    pub fn value_at(&self, at: DateTime<Utc>) -> Option<&TimedValue> {
        self.find_effective(|date| date <= at)
    }

    /// The value effective immediately before `at`: the greatest date strictly
    /// before `at`.
    ///
    /// When a new value takes effect exactly at `at`, this returns the value it
    /// superseded. Falls back to undated values like [`Attribute::value_at`].
    #[must_use]
    pub fn value_before(&self, at: DateTime<Utc>) -> Option<&TimedValue> {
        self.find_effective(|date| date < at)
    }

    fn find_effective(&self, qualifies: impl Fn(DateTime<Utc>) -> bool) -> Option<&TimedValue> {
        let dated = self
            .values
            .iter()
            .rev()
            .find(|v| v.date.is_some_and(&qualifies));
        dated.or_else(|| self.values.iter().rev().find(|v| v.date.is_none()))
    }
}
