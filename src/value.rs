//! Typed values and the timed facts that carry them.
//!
//! Every attribute of an entity is a history of [`TimedValue`]s: a payload,
//! where it came from, and the real-world date it became true.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of payload a [`Value`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Number,
    Date,
    Boolean,
    Html,
    Json,
    Null,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::Html => "html",
            Self::Json => "json",
            Self::Null => "null",
        };
        f.write_str(name)
    }
}

/// Payload of a timed fact.
///
/// # Examples
///
/// ```
/// use gig_reconcile::{Value, ValueType};
///
/// let v = Value::from("Acme Co");
/// assert_eq!(v.value_type(), ValueType::String);
/// assert_eq!(v.as_str(), Some("Acme Co"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    String(String),
    Number(f64),
    Date(DateTime<Utc>),
    Boolean(bool),
    Html(String),
    Json(serde_json::Value),
    Null,
}

impl Value {
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::String(_) => ValueType::String,
            Self::Number(_) => ValueType::Number,
            Self::Date(_) => ValueType::Date,
            Self::Boolean(_) => ValueType::Boolean,
            Self::Html(_) => ValueType::Html,
            Self::Json(_) => ValueType::Json,
            Self::Null => ValueType::Null,
        }
    }

    /// Returns the text of string and HTML values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) | Self::Html(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(v) | Self::Html(v) => write!(f, "{v}"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Json(v) => write!(f, "{v}"),
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Date(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

/// An immutable fact asserted at a point in time.
///
/// `date` is the real-world effective date and is distinct from
/// `updated_at`, the moment the system recorded the fact. A missing `date`
/// means the fact is always valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedValue {
    pub value: Value,

    /// Ingestion source name, or the normalizer for system-derived values.
    #[serde(default)]
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,

    pub updated_at: DateTime<Utc>,
}

impl TimedValue {
    /// Creates an undated fact with no source.
    #[must_use]
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            source: String::new(),
            date: None,
            updated_at: Utc::now(),
        }
    }

    /// Creates a string fact with the given provenance and effective date.
    #[must_use]
    pub fn text(
        text: impl Into<String>,
        source: impl Into<String>,
        date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            value: Value::String(text.into()),
            source: source.into(),
            date,
            updated_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    #[must_use]
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.value.value_type()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// True if both facts assert the same payload for the same date.
    #[must_use]
    pub fn same_fact(&self, other: &Self) -> bool {
        self.value == other.value && self.date == other.date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types() {
        assert_eq!(Value::from("x").value_type(), ValueType::String);
        assert_eq!(Value::from(1.5).value_type(), ValueType::Number);
        assert_eq!(Value::from(true).value_type(), ValueType::Boolean);
        assert_eq!(Value::Html("<p>x</p>".into()).value_type(), ValueType::Html);
        assert_eq!(Value::Null.value_type(), ValueType::Null);
        assert_eq!(format!("{}", ValueType::Date), "date");
    }

    #[test]
    fn test_html_reads_as_str() {
        let v = Value::Html("<b>bold</b>".into());
        assert_eq!(v.as_str(), Some("<b>bold</b>"));
        assert!(Value::Number(2.0).as_str().is_none());
    }

    #[test]
    fn test_date_display() {
        let d: DateTime<Utc> = "2020-01-01T10:00:00Z".parse().unwrap();
        assert_eq!(format!("{}", Value::Date(d)), "2020-01-01");
    }

    #[test]
    fn test_same_fact_ignores_provenance() {
        let d: DateTime<Utc> = "2020-01-01T00:00:00Z".parse().unwrap();
        let a = TimedValue::text("Acme Co", "gazette", Some(d));
        let b = TimedValue::text("Acme Co", "normalizer", Some(d));
        let c = TimedValue::text("Acme Co", "gazette", None);
        assert!(a.same_fact(&b));
        assert!(!a.same_fact(&c));
    }

    #[test]
    fn test_timed_value_serialization_omits_missing_date() {
        let v = TimedValue::text("Acme Co", "gazette", None);
        let json = serde_json::to_string(&v).unwrap();
        assert!(!json.contains("\"date\""));
        let back: TimedValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
