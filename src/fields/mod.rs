//! Field descriptors.
//!
//! A [`Field`] declares one attribute of an entity type: its wire name and
//! its [`FieldKind`]. The field owns everything kind-specific about that
//! attribute:
//!
//! - **validation**: [`Field::validate`] checks and coerces every value
//!   before it is stored, so a slot only ever holds its field's
//!   [`DataType`];
//! - **wire decoding/encoding**: reading values out of a record's
//!   `custom_object_fields` and writing them back;
//! - **representation**: the display-oriented JSON form;
//! - **definition**: the JSON describing the field to the platform.
//!
//! # Example
//!
//! ```
//! use tessera::fields::{Choices, Field};
//! use tessera::Value;
//!
//! let status = Field::dropdown("status", Choices::from_labels(["Open", "In Progress"]));
//! assert!(status.validate(Value::from("in_progress")).is_ok());
//! assert!(status.validate(Value::from("closed")).is_err());
//! ```

mod choices;
mod name;
mod temporal;

use std::fmt;

use regex::Regex;
use serde_json::{json, Map, Value as Json};

use crate::error::TesseraError;
use crate::models::{json_id, Related, Value};

pub use choices::{normalize_key, Choice, Choices};
pub use name::NameOptions;
pub(crate) use temporal::parse_datetime;

/// Prefix of a lookup field's relationship target type.
pub const RELATIONSHIP_TARGET_PREFIX: &str = "remote_object:";

/// Wire name of the record name field.
pub const NAME_FIELD: &str = "name";

/// The shape of value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// `Value::Text`
    Text,
    /// `Value::Boolean`
    Boolean,
    /// `Value::Integer`
    Integer,
    /// `Value::Decimal`
    Decimal,
    /// `Value::Date`
    Date,
    /// `Value::DateTime`
    DateTime,
    /// `Value::List`
    List,
    /// `Value::Lookup`
    Lookup,
    /// `Value::Attachment`
    Attachment,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Text => "text",
            DataType::Boolean => "boolean",
            DataType::Integer => "integer",
            DataType::Decimal => "decimal",
            DataType::Date => "date",
            DataType::DateTime => "datetime",
            DataType::List => "list",
            DataType::Lookup => "lookup",
            DataType::Attachment => "attachment",
        };
        f.write_str(name)
    }
}

/// A compiled regexp field pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    anchored: Regex,
}

impl Pattern {
    fn compile(field: &str, source: &str) -> Result<Self, TesseraError> {
        Regex::new(source).map_err(|e| TesseraError::RegexCompile {
            field: field.to_string(),
            source: e,
        })?;
        // Values must match from their first character.
        let anchored = Regex::new(&format!("^(?:{})", source)).map_err(|e| TesseraError::RegexCompile {
            field: field.to_string(),
            source: e,
        })?;
        Ok(Self {
            source: source.to_string(),
            anchored,
        })
    }

    /// The pattern as declared.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn matches(&self, value: &str) -> bool {
        self.anchored.is_match(value)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// What a lookup field points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelatedTarget {
    /// Another entity type, by type name.
    Entity(String),
    /// A literal type key.
    Key(String),
}

impl RelatedTarget {
    /// Type key of the related records.
    pub fn type_key(&self) -> String {
        match self {
            RelatedTarget::Entity(name) => name.to_lowercase(),
            RelatedTarget::Key(key) => key.clone(),
        }
    }
}

/// Names of the four record keys an attachment field is stored in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentSlots {
    /// `{name}_id`
    pub id: String,
    /// `{name}_url`
    pub url: String,
    /// `{name}_filename`
    pub filename: String,
    /// `{name}_size`
    pub size: String,
}

impl AttachmentSlots {
    fn for_field(name: &str) -> Self {
        Self {
            id: format!("{}_id", name),
            url: format!("{}_url", name),
            filename: format!("{}_filename", name),
            size: format!("{}_size", name),
        }
    }

    /// The four slot names.
    pub fn names(&self) -> [&str; 4] {
        [
            self.id.as_str(),
            self.url.as_str(),
            self.filename.as_str(),
            self.size.as_str(),
        ]
    }
}

/// Field kind with its kind-specific configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// The record name.
    Name(NameOptions),
    /// Single-line text.
    Text,
    /// Multi-line text.
    Textarea,
    /// Boolean.
    Checkbox,
    /// Calendar date.
    Date,
    /// Instant stored as `{name}` + `{name}_time`.
    DateTime,
    /// Whole number.
    Integer,
    /// Floating point number.
    Decimal,
    /// Text matching a pattern.
    Regexp(Pattern),
    /// One key out of a choice list.
    Dropdown(Choices),
    /// Reference to another record.
    Lookup(RelatedTarget),
    /// Several keys out of a choice list.
    Multiselect(Choices),
    /// Uploaded file stored across companion slots.
    Attachment(AttachmentSlots),
}

impl FieldKind {
    /// The platform's type name for this kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Name(_) => "name",
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Date => "date",
            FieldKind::DateTime => "datetime",
            FieldKind::Integer => "integer",
            FieldKind::Decimal => "decimal",
            FieldKind::Regexp(_) => "regexp",
            FieldKind::Dropdown(_) => "dropdown",
            FieldKind::Lookup(_) => "lookup",
            FieldKind::Multiselect(_) => "multiselect",
            FieldKind::Attachment(_) => "attachment",
        }
    }

    /// The data type values of this kind are stored as.
    pub fn data_type(&self) -> DataType {
        match self {
            FieldKind::Name(_)
            | FieldKind::Text
            | FieldKind::Textarea
            | FieldKind::Regexp(_)
            | FieldKind::Dropdown(_) => DataType::Text,
            FieldKind::Checkbox => DataType::Boolean,
            FieldKind::Date => DataType::Date,
            FieldKind::DateTime => DataType::DateTime,
            FieldKind::Integer => DataType::Integer,
            FieldKind::Decimal => DataType::Decimal,
            FieldKind::Lookup(_) => DataType::Lookup,
            FieldKind::Multiselect(_) => DataType::List,
            FieldKind::Attachment(_) => DataType::Attachment,
        }
    }
}

/// A typed field declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    kind: FieldKind,
}

impl Field {
    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// The record name field.
    pub fn name_field(options: NameOptions) -> Self {
        Self::new(NAME_FIELD, FieldKind::Name(options))
    }

    /// Single-line text.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    /// Multi-line text.
    pub fn textarea(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Textarea)
    }

    /// Boolean.
    pub fn checkbox(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Checkbox)
    }

    /// Calendar date.
    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Date)
    }

    /// Timezone-aware instant.
    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::DateTime)
    }

    /// Whole number.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    /// Floating point number.
    pub fn decimal(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Decimal)
    }

    /// Text validated against `pattern`.
    ///
    /// # Errors
    ///
    /// Returns `TesseraError::RegexCompile` if the pattern does not compile.
    pub fn regexp(name: impl Into<String>, pattern: &str) -> Result<Self, TesseraError> {
        let name = name.into();
        let pattern = Pattern::compile(&name, pattern)?;
        Ok(Self::new(name, FieldKind::Regexp(pattern)))
    }

    /// One key out of `choices`.
    pub fn dropdown(name: impl Into<String>, choices: Choices) -> Self {
        Self::new(name, FieldKind::Dropdown(choices))
    }

    /// Any number of keys out of `choices`.
    pub fn multiselect(name: impl Into<String>, choices: Choices) -> Self {
        Self::new(name, FieldKind::Multiselect(choices))
    }

    /// Reference to records of another entity type.
    pub fn lookup(name: impl Into<String>, related_type: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Lookup(RelatedTarget::Entity(related_type.into())))
    }

    /// Reference to records identified by a literal type key.
    pub fn lookup_key(name: impl Into<String>, type_key: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Lookup(RelatedTarget::Key(type_key.into())))
    }

    /// Uploaded file, stored in `{name}_id`, `{name}_url`,
    /// `{name}_filename` and `{name}_size`.
    pub fn attachment(name: impl Into<String>) -> Self {
        let name = name.into();
        let slots = AttachmentSlots::for_field(&name);
        Self::new(name, FieldKind::Attachment(slots))
    }

    /// Wire name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind and configuration.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// The data type values of this field are stored as.
    pub fn data_type(&self) -> DataType {
        self.kind.data_type()
    }

    /// Allowed choices, for dropdown and multiselect fields.
    pub fn choices(&self) -> Option<&Choices> {
        match &self.kind {
            FieldKind::Dropdown(choices) | FieldKind::Multiselect(choices) => Some(choices),
            _ => None,
        }
    }

    /// Companion slot names, for attachment fields.
    pub fn attachment_slots(&self) -> Option<&AttachmentSlots> {
        match &self.kind {
            FieldKind::Attachment(slots) => Some(slots),
            _ => None,
        }
    }

    /// Relationship target type string, for lookup fields.
    ///
    /// ```
    /// use tessera::fields::Field;
    ///
    /// let owner = Field::lookup("owner", "Customer");
    /// assert_eq!(owner.relationship_target_type().as_deref(), Some("remote_object:customer"));
    /// ```
    pub fn relationship_target_type(&self) -> Option<String> {
        match &self.kind {
            FieldKind::Lookup(target) => {
                Some(format!("{}{}", RELATIONSHIP_TARGET_PREFIX, target.type_key()))
            }
            _ => None,
        }
    }

    /// Wire keys this field occupies in `custom_object_fields`.
    pub fn wire_keys(&self) -> Vec<String> {
        match &self.kind {
            FieldKind::DateTime => vec![self.name.clone(), self.time_key()],
            FieldKind::Attachment(slots) => slots.names().iter().map(|s| s.to_string()).collect(),
            _ => vec![self.name.clone()],
        }
    }

    fn time_key(&self) -> String {
        format!("{}_time", self.name)
    }

    fn mismatch(&self, found: &Value) -> TesseraError {
        TesseraError::type_mismatch(&self.name, self.data_type(), found.kind_name())
    }

    /// Checks a value against this field and returns it in stored form.
    ///
    /// Compatible inputs are coerced: integers become decimals on decimal
    /// fields, strings are parsed on date and datetime fields.
    ///
    /// # Errors
    ///
    /// - `TypeMismatch` if the value has the wrong shape, or a lookup names
    ///   a different target type
    /// - `InvalidChoice` if a choice key is not allowed
    /// - `InvalidFormat` for malformed dates, non-matching regexp values
    ///   and lookups without an id
    pub fn validate(&self, value: Value) -> Result<Value, TesseraError> {
        match (&self.kind, value) {
            (
                FieldKind::Name(_) | FieldKind::Text | FieldKind::Textarea,
                value @ Value::Text(_),
            ) => Ok(value),
            (FieldKind::Checkbox, value @ Value::Boolean(_)) => Ok(value),
            (FieldKind::Integer, value @ Value::Integer(_)) => Ok(value),
            (FieldKind::Decimal, value @ Value::Decimal(_)) => Ok(value),
            (FieldKind::Decimal, Value::Integer(i)) => Ok(Value::Decimal(i as f64)),
            (FieldKind::Date, value @ Value::Date(_)) => Ok(value),
            (FieldKind::Date, Value::Text(s)) => temporal::parse_date(&self.name, &s).map(Value::Date),
            (FieldKind::DateTime, value @ Value::DateTime(_)) => Ok(value),
            (FieldKind::DateTime, Value::Text(s)) => {
                temporal::parse_datetime(&self.name, &s).map(Value::DateTime)
            }
            (FieldKind::Regexp(pattern), Value::Text(s)) => {
                if pattern.matches(&s) {
                    Ok(Value::Text(s))
                } else {
                    Err(TesseraError::invalid_format(
                        &self.name,
                        s,
                        format!("does not match pattern {}", pattern.as_str()),
                    ))
                }
            }
            (FieldKind::Dropdown(choices), Value::Text(s)) => {
                if choices.contains(&s) {
                    Ok(Value::Text(s))
                } else {
                    Err(TesseraError::invalid_choice(&self.name, s))
                }
            }
            (FieldKind::Multiselect(choices), Value::List(items)) => {
                if let Some(bad) = items.iter().find(|item| !choices.contains(item)) {
                    return Err(TesseraError::invalid_choice(&self.name, bad.as_str()));
                }
                Ok(Value::List(items))
            }
            (FieldKind::Lookup(target), Value::Lookup(related)) => {
                if related.id.is_empty() {
                    return Err(TesseraError::invalid_format(
                        &self.name,
                        "",
                        "related record has no id",
                    ));
                }
                let expected = target.type_key();
                if related.type_key.as_deref().is_some_and(|k| k != expected) {
                    return Err(TesseraError::type_mismatch(
                        &self.name,
                        DataType::Lookup,
                        "lookup to another type",
                    ));
                }
                Ok(Value::Lookup(Related {
                    id: related.id,
                    type_key: Some(expected),
                }))
            }
            (FieldKind::Attachment(_), value @ Value::Attachment(_)) => Ok(value),
            (_, other) => Err(self.mismatch(&other)),
        }
    }

    /// Reads this field's value out of a record's `custom_object_fields`.
    ///
    /// The result is *not* validated; callers pass it through
    /// [`Field::validate`] (the entity setter does this). Attachment fields
    /// are read from their companion slots by the entity and always decode
    /// to `None` here.
    pub fn decode(&self, fields: &Map<String, Json>) -> Result<Option<Value>, TesseraError> {
        let raw = fields.get(&self.name).unwrap_or(&Json::Null);
        if raw.is_null() {
            return Ok(None);
        }

        let value = match &self.kind {
            FieldKind::Attachment(_) => return Ok(None),
            FieldKind::DateTime => {
                let date = raw.as_str().ok_or_else(|| {
                    TesseraError::type_mismatch(&self.name, DataType::DateTime, json_kind(raw))
                })?;
                let time = fields.get(&self.time_key()).and_then(Json::as_str);
                Value::DateTime(temporal::join_datetime(&self.name, date, time)?)
            }
            FieldKind::Lookup(target) => {
                let id = json_id(raw).ok_or_else(|| {
                    TesseraError::type_mismatch(&self.name, DataType::Lookup, json_kind(raw))
                })?;
                Value::Lookup(Related::with_type(id, target.type_key()))
            }
            FieldKind::Dropdown(_) => match raw {
                Json::Object(_) => choice_key(raw)
                    .map(Value::Text)
                    .ok_or_else(|| self.json_mismatch(raw))?,
                _ => self.plain(raw)?,
            },
            FieldKind::Multiselect(_) => match raw {
                Json::Array(items) => {
                    let keys = items
                        .iter()
                        .map(|item| choice_key(item).ok_or_else(|| self.json_mismatch(item)))
                        .collect::<Result<Vec<_>, _>>()?;
                    Value::List(keys)
                }
                _ => return Err(self.json_mismatch(raw)),
            },
            FieldKind::Decimal => match raw.as_f64() {
                Some(f) => Value::Decimal(f),
                None => self.plain(raw)?,
            },
            FieldKind::Integer => match raw {
                Json::Number(n) => match n.as_i64() {
                    Some(i) => Value::Integer(i),
                    None => match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                            Value::Integer(f as i64)
                        }
                        _ => Value::Decimal(n.as_f64().unwrap_or(f64::NAN)),
                    },
                },
                _ => self.plain(raw)?,
            },
            _ => self.plain(raw)?,
        };

        Ok(Some(value))
    }

    /// Maps scalar JSON onto the closest value variant.
    fn plain(&self, raw: &Json) -> Result<Value, TesseraError> {
        match raw {
            Json::String(s) => Ok(Value::Text(s.clone())),
            Json::Bool(b) => Ok(Value::Boolean(*b)),
            Json::Number(n) => Ok(n
                .as_i64()
                .map(Value::Integer)
                .unwrap_or_else(|| Value::Decimal(n.as_f64().unwrap_or(f64::NAN)))),
            other => Err(self.json_mismatch(other)),
        }
    }

    fn json_mismatch(&self, raw: &Json) -> TesseraError {
        TesseraError::type_mismatch(&self.name, self.data_type(), json_kind(raw))
    }

    /// Writes this field's wire entries for `value` into `out`.
    ///
    /// Choice fields are written in their `{value, label}` form; datetime
    /// fields split into date and time-of-day keys; attachments fill their
    /// four companion keys.
    pub fn encode(&self, value: Option<&Value>, out: &mut Map<String, Json>) {
        match (&self.kind, value) {
            (FieldKind::DateTime, Some(Value::DateTime(dt))) => {
                let (date, time) = temporal::split_datetime(dt);
                out.insert(self.name.clone(), Json::String(date));
                out.insert(self.time_key(), Json::String(time));
            }
            (FieldKind::DateTime, _) => {
                out.insert(self.name.clone(), Json::Null);
                out.insert(self.time_key(), Json::Null);
            }
            (FieldKind::Attachment(slots), Some(Value::Attachment(attachment))) => {
                attachment.write_slots(slots, out);
            }
            (FieldKind::Attachment(slots), _) => {
                for name in slots.names() {
                    out.insert(name.to_string(), Json::Null);
                }
            }
            _ => {
                out.insert(self.name.clone(), self.represent(value));
            }
        }
    }

    /// Display form of `value`.
    pub fn represent(&self, value: Option<&Value>) -> Json {
        let Some(value) = value else {
            return Json::Null;
        };

        match (&self.kind, value) {
            (FieldKind::Dropdown(choices), Value::Text(key)) => choices.represent(key),
            (FieldKind::Multiselect(choices), Value::List(keys)) => {
                Json::Array(keys.iter().map(|key| choices.represent(key)).collect())
            }
            _ => value.to_json(),
        }
    }

    /// Definition describing this field to the platform.
    ///
    /// Datetime fields are stored as a date field plus a text field for the
    /// time of day; attachments as four companion fields. Both therefore
    /// produce more than one definition.
    pub fn definitions(&self) -> Vec<Json> {
        match &self.kind {
            FieldKind::DateTime => vec![
                definition("date", &self.name),
                definition("text", &self.time_key()),
            ],
            FieldKind::Attachment(slots) => vec![
                definition("text", &slots.id),
                definition("text", &slots.url),
                definition("text", &slots.filename),
                definition("integer", &slots.size),
            ],
            FieldKind::Name(options) => {
                let mut def = definition("text", &self.name);
                if let (Json::Object(map), Ok(Json::Object(extra))) =
                    (&mut def, serde_json::to_value(options))
                {
                    map.extend(extra);
                }
                vec![def]
            }
            FieldKind::Regexp(pattern) => {
                let mut def = definition("regexp", &self.name);
                def["regexp_for_validation"] = Json::String(pattern.as_str().to_string());
                vec![def]
            }
            FieldKind::Dropdown(choices) | FieldKind::Multiselect(choices) => {
                let mut def = definition(self.kind.type_name(), &self.name);
                def["custom_field_options"] = choices.options();
                vec![def]
            }
            FieldKind::Lookup(_) => {
                let mut def = definition("lookup", &self.name);
                def["relationship_target_type"] =
                    Json::String(self.relationship_target_type().unwrap_or_default());
                vec![def]
            }
            kind => vec![definition(kind.type_name(), &self.name)],
        }
    }
}

fn definition(type_name: &str, key: &str) -> Json {
    json!({"type": type_name, "key": key, "title": title_case(key)})
}

/// First character uppercased, the rest lowercased.
fn title_case(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Reads a choice key from either a bare string or a `{value, label}` object.
fn choice_key(raw: &Json) -> Option<String> {
    match raw {
        Json::String(s) => Some(s.clone()),
        Json::Object(map) => map.get("value").and_then(Json::as_str).map(str::to_string),
        _ => None,
    }
}

fn json_kind(raw: &Json) -> &'static str {
    match raw {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "text",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate};
    use pretty_assertions::assert_eq;

    fn status_field() -> Field {
        Field::dropdown("status", Choices::from_labels(["Open", "In Progress", "Não Iniciado"]))
    }

    #[test]
    fn test_text_accepts_text_only() {
        let field = Field::text("codigo");
        assert_eq!(field.validate(Value::from("1234")).unwrap(), Value::from("1234"));
        let err = field.validate(Value::from(1234)).unwrap_err();
        assert!(matches!(
            err,
            TesseraError::TypeMismatch {
                expected: DataType::Text,
                found: "integer",
                ..
            }
        ));
    }

    #[test]
    fn test_checkbox_rejects_text() {
        let field = Field::checkbox("ativo");
        assert!(field.validate(Value::from(true)).is_ok());
        assert!(field.validate(Value::from("true")).is_err());
    }

    #[test]
    fn test_decimal_coerces_integer() {
        let field = Field::decimal("price");
        assert_eq!(field.validate(Value::from(3)).unwrap(), Value::Decimal(3.0));
        assert_eq!(field.validate(Value::from(2.5)).unwrap(), Value::Decimal(2.5));
        assert!(field.validate(Value::from("2.5")).is_err());
    }

    #[test]
    fn test_integer_rejects_decimal() {
        let field = Field::integer("ticket_id");
        assert!(field.validate(Value::from(2.5)).is_err());
    }

    #[test]
    fn test_date_truncates_timestamp_string() {
        let field = Field::date("due");
        let stored = field.validate(Value::from("2023-07-15T10:30:45Z")).unwrap();
        assert_eq!(stored, Value::Date(NaiveDate::from_ymd_opt(2023, 7, 15).unwrap()));
        assert_eq!(stored.to_json(), Json::String("2023-07-15".to_string()));
    }

    #[test]
    fn test_date_rejects_bad_format() {
        let field = Field::date("due");
        let err = field.validate(Value::from("July 15th")).unwrap_err();
        assert!(matches!(err, TesseraError::InvalidFormat { .. }));
        assert!(field.validate(Value::from(true)).is_err());
    }

    #[test]
    fn test_datetime_accepts_rfc3339_string() {
        let field = Field::datetime("created_at");
        let stored = field.validate(Value::from("2023-07-15T10:30:45Z")).unwrap();
        let expected = DateTime::parse_from_rfc3339("2023-07-15T10:30:45+00:00").unwrap();
        assert_eq!(stored, Value::DateTime(expected));
    }

    #[test]
    fn test_regexp_compile_error_at_declaration() {
        let err = Field::regexp("code", r"([a-z]+").unwrap_err();
        assert!(matches!(err, TesseraError::RegexCompile { ref field, .. } if field == "code"));
    }

    #[test]
    fn test_regexp_matches_from_start() {
        let field = Field::regexp("code", r"[A-Z]{3}-\d+").unwrap();
        assert!(field.validate(Value::from("ABC-12")).is_ok());
        assert!(field.validate(Value::from("ABC-12 trailing")).is_ok());
        let err = field.validate(Value::from("x ABC-12")).unwrap_err();
        assert!(matches!(err, TesseraError::InvalidFormat { .. }));
    }

    #[test]
    fn test_dropdown_membership() {
        let field = status_field();
        assert!(field.validate(Value::from("nao_iniciado")).is_ok());
        let err = field.validate(Value::from("Open")).unwrap_err();
        assert!(matches!(err, TesseraError::InvalidChoice { ref value, .. } if value == "Open"));
    }

    #[test]
    fn test_multiselect_checks_every_element() {
        let field = Field::multiselect("tags", Choices::from_pairs([("a", "Alpha"), ("b", "Beta")]));
        assert!(field.validate(Value::from(vec!["a", "b"])).is_ok());
        assert!(field.validate(Value::from(Vec::<String>::new())).is_ok());
        let err = field.validate(Value::from(vec!["a", "c"])).unwrap_err();
        assert!(matches!(err, TesseraError::InvalidChoice { ref value, .. } if value == "c"));
        assert!(field.validate(Value::from("a")).is_err());
    }

    #[test]
    fn test_lookup_requires_id_and_fills_type() {
        let field = Field::lookup("customer", "Customer");
        let stored = field.validate(Value::from(Related::new("77"))).unwrap();
        assert_eq!(stored, Value::from(Related::with_type("77", "customer")));
        assert!(field.validate(Value::from(Related::new(""))).is_err());
    }

    #[test]
    fn test_lookup_rejects_other_type() {
        let field = Field::lookup("owner", "Customer");
        let err = field
            .validate(Value::from(Related::with_type("1", "agent")))
            .unwrap_err();
        assert!(matches!(
            err,
            TesseraError::TypeMismatch {
                expected: DataType::Lookup,
                ..
            }
        ));

        let same = field
            .validate(Value::from(Related::with_type("1", "customer")))
            .unwrap();
        assert_eq!(same, Value::from(Related::with_type("1", "customer")));
    }

    #[test]
    fn test_relationship_target_type() {
        assert_eq!(
            Field::lookup("owner", "Customer").relationship_target_type().as_deref(),
            Some("remote_object:customer")
        );
        assert_eq!(
            Field::lookup_key("owner", "zen_user").relationship_target_type().as_deref(),
            Some("remote_object:zen_user")
        );
        assert_eq!(Field::text("x").relationship_target_type(), None);
    }

    #[test]
    fn test_decode_dropdown_accepts_both_shapes() {
        let field = status_field();
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("open"));
        assert_eq!(field.decode(&fields).unwrap(), Some(Value::from("open")));
        fields.insert("status".to_string(), json!({"value": "open", "label": "open"}));
        assert_eq!(field.decode(&fields).unwrap(), Some(Value::from("open")));
    }

    #[test]
    fn test_decode_missing_is_none() {
        let fields = Map::new();
        assert_eq!(Field::text("codigo").decode(&fields).unwrap(), None);
        assert_eq!(Field::datetime("created_at").decode(&fields).unwrap(), None);
    }

    #[test]
    fn test_decode_datetime_joins_keys() {
        let field = Field::datetime("created_at");
        let mut fields = Map::new();
        fields.insert("created_at".to_string(), json!("2023-07-15"));
        fields.insert("created_at_time".to_string(), json!("10:30:45.187652+00:00"));
        let decoded = field.decode(&fields).unwrap().unwrap();
        let expected = DateTime::parse_from_rfc3339("2023-07-15T10:30:45.187652+00:00").unwrap();
        assert_eq!(decoded, Value::DateTime(expected));
    }

    #[test]
    fn test_decode_lookup_from_number() {
        let field = Field::lookup_key("customer", "customer");
        let mut fields = Map::new();
        fields.insert("customer".to_string(), json!(77));
        assert_eq!(
            field.decode(&fields).unwrap(),
            Some(Value::from(Related::with_type("77", "customer")))
        );
    }

    #[test]
    fn test_encode_datetime_splits() {
        let field = Field::datetime("created_at");
        let dt = DateTime::parse_from_rfc3339("2023-07-15T10:30:45+00:00").unwrap();
        let mut out = Map::new();
        field.encode(Some(&Value::DateTime(dt)), &mut out);
        assert_eq!(out.get("created_at"), Some(&json!("2023-07-15")));
        assert_eq!(out.get("created_at_time"), Some(&json!("10:30:45+00:00")));

        let mut empty = Map::new();
        field.encode(None, &mut empty);
        assert_eq!(empty.get("created_at"), Some(&Json::Null));
        assert_eq!(empty.get("created_at_time"), Some(&Json::Null));
    }

    #[test]
    fn test_encode_choice_uses_representation() {
        let field = Field::multiselect("tags", Choices::from_pairs([("a", "Alpha")]));
        let mut out = Map::new();
        field.encode(Some(&Value::from(vec!["a"])), &mut out);
        assert_eq!(out.get("tags"), Some(&json!([{"value": "a", "label": "Alpha"}])));
    }

    #[test]
    fn test_definitions() {
        let defs = Field::lookup("customer", "Customer").definitions();
        assert_eq!(
            defs,
            vec![json!({
                "type": "lookup",
                "key": "customer",
                "title": "Customer",
                "relationship_target_type": "remote_object:customer"
            })]
        );

        let defs = Field::datetime("closed_at").definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[1]["key"], "closed_at_time");
        assert_eq!(defs[0]["title"], "Closed_at");

        let defs = Field::attachment("contract").definitions();
        let keys: Vec<&str> = defs.iter().filter_map(|d| d["key"].as_str()).collect();
        assert_eq!(keys, vec!["contract_id", "contract_url", "contract_filename", "contract_size"]);
    }

    #[test]
    fn test_wire_keys() {
        assert_eq!(Field::text("a").wire_keys(), vec!["a"]);
        assert_eq!(Field::datetime("at").wire_keys(), vec!["at", "at_time"]);
        assert_eq!(Field::attachment("doc").wire_keys().len(), 4);
    }
}
