//! System metadata carried by every record.
//!
//! These values are assigned by the platform; the client only echoes
//! them back and exposes them for filtering and display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Names of the system attributes, in display order.
pub const SYSTEM_FIELDS: [&str; 7] = [
    "id",
    "name",
    "created_at",
    "updated_at",
    "created_by_user_id",
    "updated_by_user_id",
    "external_id",
];

/// Timestamps, authorship and external id of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetadata {
    /// When the record was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// When the record was last updated.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    /// User that created the record (string or integer on the wire).
    #[serde(default, deserialize_with = "deserialize_optional_string_or_int")]
    pub created_by_user_id: Option<String>,

    /// User that last updated the record.
    #[serde(default, deserialize_with = "deserialize_optional_string_or_int")]
    pub updated_by_user_id: Option<String>,

    /// Caller-assigned identifier from an external system.
    #[serde(default, deserialize_with = "deserialize_optional_string_or_int")]
    pub external_id: Option<String>,
}

impl SystemMetadata {
    /// Overwrites every attribute that `other` carries.
    pub fn merge(&mut self, other: SystemMetadata) {
        if other.created_at.is_some() {
            self.created_at = other.created_at;
        }
        if other.updated_at.is_some() {
            self.updated_at = other.updated_at;
        }
        if other.created_by_user_id.is_some() {
            self.created_by_user_id = other.created_by_user_id;
        }
        if other.updated_by_user_id.is_some() {
            self.updated_by_user_id = other.updated_by_user_id;
        }
        if other.external_id.is_some() {
            self.external_id = other.external_id;
        }
    }

    /// Non-null attributes as JSON entries.
    pub fn entries(&self) -> Vec<(&'static str, Json)> {
        let mut entries = Vec::new();
        if let Some(at) = self.created_at {
            entries.push(("created_at", Json::String(at.to_rfc3339())));
        }
        if let Some(at) = self.updated_at {
            entries.push(("updated_at", Json::String(at.to_rfc3339())));
        }
        if let Some(ref user) = self.created_by_user_id {
            entries.push(("created_by_user_id", Json::String(user.clone())));
        }
        if let Some(ref user) = self.updated_by_user_id {
            entries.push(("updated_by_user_id", Json::String(user.clone())));
        }
        if let Some(ref external) = self.external_id {
            entries.push(("external_id", Json::String(external.clone())));
        }
        entries
    }
}

/// Deserializes an optional value that can be either a string or an integer into `Option<String>`.
pub(crate) fn deserialize_optional_string_or_int<'de, D>(
    deserializer: D,
) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct OptionalStringOrIntVisitor;

    impl<'de> Visitor<'de> for OptionalStringOrIntVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("null, a string, or an integer")
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            deserializer.deserialize_any(self)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }
    }

    deserializer.deserialize_any(OptionalStringOrIntVisitor)
}

/// Reads an id that may be a JSON string or integer.
pub(crate) fn json_id(value: &Json) -> Option<String> {
    match value {
        Json::String(s) if !s.is_empty() => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
