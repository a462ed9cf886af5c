//! Field values held by entities.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde_json::Value as Json;

use crate::attachment::Attachment;

/// Wire format for date fields.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A value stored in an entity slot.
///
/// Each variant corresponds to one [`DataType`](crate::fields::DataType);
/// fields coerce compatible inputs (e.g. a date string) into their own
/// variant when a value is assigned.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Free text (text, textarea, regexp, dropdown keys).
    Text(String),
    /// Checkbox state.
    Boolean(bool),
    /// Whole number.
    Integer(i64),
    /// Floating point number.
    Decimal(f64),
    /// Calendar date without time.
    Date(NaiveDate),
    /// Timezone-aware instant.
    DateTime(DateTime<FixedOffset>),
    /// Multiselect keys.
    List(Vec<String>),
    /// Reference to a related record.
    Lookup(Related),
    /// Uploaded (or pending) file.
    Attachment(Attachment),
}

impl Value {
    /// Short name of the variant, used in type mismatch messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::List(_) => "list",
            Value::Lookup(_) => "lookup",
            Value::Attachment(_) => "attachment",
        }
    }

    /// Returns the text if this is a `Text` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Plain JSON form of the value, without any field-specific shaping.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Text(s) => Json::String(s.clone()),
            Value::Boolean(b) => Json::Bool(*b),
            Value::Integer(i) => Json::from(*i),
            Value::Decimal(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Date(d) => Json::String(d.format(DATE_FORMAT).to_string()),
            Value::DateTime(dt) => Json::String(dt.to_rfc3339()),
            Value::List(items) => Json::Array(items.iter().cloned().map(Json::String).collect()),
            Value::Lookup(related) => Json::String(related.id.clone()),
            Value::Attachment(attachment) => attachment.representation(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::List(items) => write!(f, "[{}]", items.join(", ")),
            Value::Lookup(related) => f.write_str(&related.id),
            Value::Attachment(attachment) => f.write_str(attachment.filename()),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

/// A reference to a record of another entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Related {
    /// Remote id of the related record.
    pub id: String,
    /// Type key of the related record, when known.
    pub type_key: Option<String>,
}

impl Related {
    /// Creates a reference to a record id with no type information.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_key: None,
        }
    }

    /// Creates a reference to a record of a known type.
    pub fn with_type(id: impl Into<String>, type_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_key: Some(type_key.into()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Decimal(f)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt.fixed_offset())
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Value::List(items.into_iter().map(str::to_string).collect())
    }
}

impl From<Related> for Value {
    fn from(related: Related) -> Self {
        Value::Lookup(related)
    }
}

impl From<Attachment> for Value {
    fn from(attachment: Attachment) -> Self {
        Value::Attachment(attachment)
    }
}
