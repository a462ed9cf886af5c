//! Entity types and their records.
//!
//! An [`EntityType`] is the registry of fields for one custom object type.
//! It is built once and shared behind an `Arc` by every [`Entity`] of that
//! type. Entities hold one slot per declared field plus the identity and
//! system metadata the platform assigns.
//!
//! # Example
//!
//! ```
//! use tessera::fields::{Choices, Field};
//! use tessera::EntityType;
//!
//! let customer = EntityType::builder("Customer")
//!     .field(Field::text("codigo"))
//!     .field(Field::checkbox("ativo"))
//!     .field(Field::dropdown("status", Choices::from_labels(["Open", "Closed"])))
//!     .build()
//!     .unwrap();
//!
//! let mut record = customer.new_entity();
//! record.set("codigo", "1234").unwrap();
//! record.set("ativo", true).unwrap();
//! assert!(record.set("ativo", "yes").is_err());
//! assert_eq!(customer.records_path(), "/custom_objects/customer/records");
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use serde_json::{Map, Value as Json};

use crate::attachment::Attachment;
use crate::error::TesseraError;
use crate::fields::{DataType, Field, FieldKind, NameOptions, NAME_FIELD};
use crate::manager::RecordManager;
use crate::models::{
    error_detail, is_name_taken, RawRecord, RecordBody, RecordEnvelope, RecordPayload, Related,
    SystemMetadata, Value, SYSTEM_FIELDS,
};
use crate::transport::{validate_id, Transport};

/// Name sent for records created without one.
pub const UNNAMED_RECORD_NAME: &str = "Unnamed Object";

/// Pseudo-field accepted by [`Entity::set_many`] for the external id.
const EXTERNAL_ID_FIELD: &str = "external_id";

/// The field registry of one custom object type.
#[derive(Debug)]
pub struct EntityType {
    name: String,
    key: String,
    fields: Vec<Field>,
    name_options: Option<NameOptions>,
}

/// Builder for [`EntityType`].
#[derive(Debug)]
pub struct EntityTypeBuilder {
    name: String,
    fields: Vec<Field>,
}

impl EntityTypeBuilder {
    /// Declares a field.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Checks the declarations and builds the type.
    ///
    /// # Errors
    ///
    /// Returns `TesseraError::InvalidSchema` for an empty or unsafe type
    /// name, a second name field, a field using a reserved system name,
    /// a choice field without choices, out-of-range name options, or two
    /// fields occupying the same wire key.
    pub fn build(self) -> Result<Arc<EntityType>, TesseraError> {
        let type_name = self.name.trim().to_string();
        if type_name.is_empty() {
            return Err(TesseraError::invalid_schema("entity type name must not be empty"));
        }
        if !type_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(TesseraError::invalid_schema(format!(
                "entity type name '{}' must contain only ASCII letters, digits and underscores",
                type_name
            )));
        }

        let mut name_options: Option<NameOptions> = None;
        let mut fields = Vec::with_capacity(self.fields.len());
        let mut wire_keys: HashSet<String> = HashSet::new();

        for field in self.fields {
            if let FieldKind::Name(options) = field.kind() {
                if name_options.is_some() {
                    return Err(TesseraError::invalid_schema(format!(
                        "{} declares more than one name field",
                        type_name
                    )));
                }
                options.check()?;
                name_options = Some(options.clone());
                continue;
            }

            if field.name().is_empty() {
                return Err(TesseraError::invalid_schema(format!(
                    "{} declares a field with an empty name",
                    type_name
                )));
            }

            if field.choices().is_some_and(|c| c.is_empty()) {
                return Err(TesseraError::invalid_schema(format!(
                    "field '{}' of {} has no choices",
                    field.name(),
                    type_name
                )));
            }

            for key in field.wire_keys() {
                if SYSTEM_FIELDS.contains(&key.as_str()) {
                    return Err(TesseraError::invalid_schema(format!(
                        "'{}' is a reserved system field of {}",
                        key, type_name
                    )));
                }
                if !wire_keys.insert(key.clone()) {
                    return Err(TesseraError::invalid_schema(format!(
                        "wire key '{}' is declared twice on {}",
                        key, type_name
                    )));
                }
            }

            fields.push(field);
        }

        Ok(Arc::new(EntityType {
            key: type_name.to_lowercase(),
            name: type_name,
            fields,
            name_options,
        }))
    }
}

impl EntityType {
    /// Starts declaring a type. The type key is the lowercased name.
    pub fn builder(name: impl Into<String>) -> EntityTypeBuilder {
        EntityTypeBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Type name as declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type key used in paths and lookup targets.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Declared fields, excluding the name field.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Looks up a declared field.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub(crate) fn require_field(&self, name: &str) -> Result<&Field, TesseraError> {
        self.field(name).ok_or_else(|| TesseraError::UnknownField {
            entity: self.name.clone(),
            field: name.to_string(),
        })
    }

    /// Name field options, if a name field was declared.
    pub fn name_options(&self) -> Option<&NameOptions> {
        self.name_options.as_ref()
    }

    /// Returns true if the platform assigns record names.
    pub fn is_autoincrement(&self) -> bool {
        self.name_options
            .as_ref()
            .is_some_and(|o| o.autoincrement_enabled)
    }

    /// A lookup field pointing at records of this type.
    pub fn lookup(&self, field_name: impl Into<String>) -> Field {
        Field::lookup_key(field_name, self.key.clone())
    }

    /// Collection path of this type's records.
    pub fn records_path(&self) -> String {
        format!("/custom_objects/{}/records", self.key)
    }

    /// Path of one record.
    ///
    /// # Errors
    ///
    /// Returns `TesseraError::Validation` if the id is not path-safe.
    pub fn record_path(&self, id: &str) -> Result<String, TesseraError> {
        validate_id(id, "record_id")?;
        Ok(format!("{}/{}", self.records_path(), id))
    }

    /// Definitions of every declared field, name field first.
    pub fn definitions(&self) -> Vec<Json> {
        let name_defs = self
            .name_options
            .clone()
            .map(|options| Field::name_field(options).definitions())
            .unwrap_or_default();
        name_defs
            .into_iter()
            .chain(self.fields.iter().flat_map(Field::definitions))
            .collect()
    }

    /// A new, unsaved entity of this type.
    pub fn new_entity(self: &Arc<Self>) -> Entity {
        Entity::new(Arc::clone(self))
    }

    /// A record manager for this type over `transport`.
    pub fn manager(self: &Arc<Self>, transport: Arc<dyn Transport>) -> RecordManager {
        RecordManager::new(Arc::clone(self), transport)
    }

    /// Deletes a record by id.
    pub(crate) async fn delete_record(
        &self,
        transport: &dyn Transport,
        id: &str,
    ) -> Result<(), TesseraError> {
        let path = self.record_path(id)?;
        match transport.delete(&path).await {
            Ok(status) if status.is_success() => {
                tracing::info!(entity = %self.name, id = %id, "Deleted record");
                Ok(())
            }
            Ok(status) => Err(TesseraError::DeleteRecord {
                detail: format!("unexpected status {}", status),
            }),
            Err(TesseraError::HttpStatus { body, .. }) => Err(TesseraError::DeleteRecord {
                detail: error_detail(&body),
            }),
            Err(e) => Err(e),
        }
    }
}

/// Where an entity is in its remote lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Not created remotely yet.
    New,
    /// Created; has an id.
    Persisted,
    /// Deleted remotely. Terminal.
    Deleted,
}

/// One record of an [`EntityType`].
#[derive(Debug, Clone)]
pub struct Entity {
    ty: Arc<EntityType>,
    id: Option<String>,
    name: Option<String>,
    values: HashMap<String, Value>,
    // Attachment values, built from `companions` on first access.
    attachments: HashMap<String, OnceLock<Option<Value>>>,
    companions: Map<String, Json>,
    metadata: SystemMetadata,
    state: Lifecycle,
}

impl Entity {
    fn new(ty: Arc<EntityType>) -> Self {
        let attachments = ty
            .fields
            .iter()
            .filter(|f| f.attachment_slots().is_some())
            .map(|f| (f.name().to_string(), OnceLock::new()))
            .collect();
        Self {
            ty,
            id: None,
            name: None,
            values: HashMap::new(),
            attachments,
            companions: Map::new(),
            metadata: SystemMetadata::default(),
            state: Lifecycle::New,
        }
    }

    /// Materializes an entity from a record payload.
    ///
    /// Every declared value is decoded and validated; undeclared keys are
    /// ignored.
    pub fn from_record(ty: &Arc<EntityType>, raw: RawRecord) -> Result<Self, TesseraError> {
        let mut entity = Entity::new(Arc::clone(ty));
        entity.state = if raw.id.is_some() {
            Lifecycle::Persisted
        } else {
            Lifecycle::New
        };
        entity.id = raw.id;
        entity.name = raw.name;
        entity.metadata = raw.metadata;

        for field in &ty.fields {
            if let Some(slots) = field.attachment_slots() {
                for key in slots.names() {
                    if let Some(raw_value) = raw.custom_object_fields.get(key) {
                        entity.companions.insert(key.to_string(), raw_value.clone());
                    }
                }
                continue;
            }

            if let Some(value) = field.decode(&raw.custom_object_fields)? {
                let value = field.validate(value)?;
                entity.values.insert(field.name().to_string(), value);
            }
        }

        Ok(entity)
    }

    /// Materializes an entity from a record JSON object.
    pub fn from_json(ty: &Arc<EntityType>, record: &Json) -> Result<Self, TesseraError> {
        Self::from_record(ty, RawRecord::from_json(record)?)
    }

    /// The entity's type.
    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.ty
    }

    /// Remote id, once created.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Display name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Sets the display name. Ignored on save when the platform assigns names.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Platform-assigned metadata.
    pub fn metadata(&self) -> &SystemMetadata {
        &self.metadata
    }

    /// Sets the caller-assigned external id.
    pub fn set_external_id(&mut self, external_id: Option<String>) {
        self.metadata.external_id = external_id;
    }

    /// Lifecycle state.
    pub fn state(&self) -> Lifecycle {
        self.state
    }

    /// Returns true if the record exists remotely.
    pub fn is_persisted(&self) -> bool {
        self.state == Lifecycle::Persisted
    }

    /// Current value of a declared field.
    ///
    /// # Errors
    ///
    /// Returns `TesseraError::UnknownField` if no such field is declared.
    pub fn get(&self, field: &str) -> Result<Option<&Value>, TesseraError> {
        let field = self.ty.require_field(field)?;
        Ok(self.slot(field))
    }

    fn slot(&self, field: &Field) -> Option<&Value> {
        match field.attachment_slots() {
            Some(slots) => self.attachments.get(field.name()).and_then(|cell| {
                cell.get_or_init(|| {
                    Attachment::from_slots(slots, &self.companions).map(Value::Attachment)
                })
                .as_ref()
            }),
            None => self.values.get(field.name()),
        }
    }

    /// Assigns a declared field after validating the value.
    ///
    /// # Errors
    ///
    /// Returns `UnknownField` or the field's validation error; the slot is
    /// left unchanged on error.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), TesseraError> {
        let ty = Arc::clone(&self.ty);
        let field = ty.require_field(field)?;
        let value = field.validate(value.into())?;

        if let (Some(slots), Value::Attachment(attachment)) = (field.attachment_slots(), &value) {
            attachment.write_slots(slots, &mut self.companions);
            self.attachments
                .insert(field.name().to_string(), OnceLock::from(Some(value)));
            return Ok(());
        }

        self.values.insert(field.name().to_string(), value);
        Ok(())
    }

    /// Assigns `Some` value or empties the field on `None`.
    pub fn set_opt(&mut self, field: &str, value: Option<Value>) -> Result<(), TesseraError> {
        match value {
            Some(value) => self.set(field, value),
            None => self.clear(field),
        }
    }

    /// Assigns several values at once. `name` and `external_id` set the
    /// display name and external id.
    pub fn set_many<I, K>(&mut self, values: I) -> Result<(), TesseraError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        for (key, value) in values {
            match key.as_ref() {
                NAME_FIELD => self.name = Some(pseudo_text(NAME_FIELD, value)?),
                EXTERNAL_ID_FIELD => {
                    self.metadata.external_id = Some(pseudo_text(EXTERNAL_ID_FIELD, value)?)
                }
                field => self.set(field, value)?,
            }
        }
        Ok(())
    }

    /// Empties a declared field.
    pub fn clear(&mut self, field: &str) -> Result<(), TesseraError> {
        let ty = Arc::clone(&self.ty);
        let field = ty.require_field(field)?;

        if let Some(slots) = field.attachment_slots() {
            for key in slots.names() {
                self.companions.remove(key);
            }
            self.attachments.insert(field.name().to_string(), OnceLock::new());
            return Ok(());
        }

        self.values.remove(field.name());
        Ok(())
    }

    /// Mutable access to an attachment field's value, e.g. to upload it.
    ///
    /// # Errors
    ///
    /// Returns `UnknownField`, or `TypeMismatch` if the field is not an
    /// attachment field.
    pub fn attachment_mut(&mut self, field: &str) -> Result<Option<&mut Attachment>, TesseraError> {
        let ty = Arc::clone(&self.ty);
        let field = ty.require_field(field)?;
        let Some(slots) = field.attachment_slots() else {
            return Err(TesseraError::type_mismatch(
                field.name(),
                field.data_type(),
                "attachment",
            ));
        };

        let companions = &self.companions;
        let cell = self.attachments.entry(field.name().to_string()).or_default();
        cell.get_or_init(|| Attachment::from_slots(slots, companions).map(Value::Attachment));

        match cell.get_mut() {
            Some(Some(Value::Attachment(attachment))) => Ok(Some(attachment)),
            _ => Ok(None),
        }
    }

    /// This entity as a lookup value.
    ///
    /// # Errors
    ///
    /// Returns `TesseraError::NotPersisted` until the entity has an id.
    pub fn related(&self) -> Result<Related, TesseraError> {
        let id = self.id.as_ref().ok_or_else(|| self.not_persisted())?;
        Ok(Related::with_type(id.clone(), self.ty.key.clone()))
    }

    /// Value of a declared field or system attribute, used for filtering.
    pub fn value_for(&self, key: &str) -> Result<Option<Value>, TesseraError> {
        let text = |s: &Option<String>| s.clone().map(Value::Text);
        match key {
            "id" => Ok(text(&self.id)),
            NAME_FIELD => Ok(text(&self.name)),
            "created_at" => Ok(self.metadata.created_at.map(Value::from)),
            "updated_at" => Ok(self.metadata.updated_at.map(Value::from)),
            "created_by_user_id" => Ok(text(&self.metadata.created_by_user_id)),
            "updated_by_user_id" => Ok(text(&self.metadata.updated_by_user_id)),
            EXTERNAL_ID_FIELD => Ok(text(&self.metadata.external_id)),
            field => Ok(self.get(field)?.cloned()),
        }
    }

    /// Display form: every declared field (nulls included) plus the
    /// non-null system attributes.
    pub fn to_representation(&self) -> Json {
        let mut out = Map::new();
        for field in &self.ty.fields {
            out.insert(field.name().to_string(), field.represent(self.slot(field)));
        }
        self.merge_system(&mut out);
        Json::Object(out)
    }

    /// Wire form of the custom fields plus the non-null system attributes.
    ///
    /// Autoincrement types never carry a `name` entry; the platform assigns it.
    pub fn to_wire(&self) -> Map<String, Json> {
        let mut out = Map::new();
        for field in &self.ty.fields {
            field.encode(self.slot(field), &mut out);
        }
        self.merge_system(&mut out);
        if self.ty.is_autoincrement() {
            out.remove(NAME_FIELD);
        }
        out
    }

    fn merge_system(&self, out: &mut Map<String, Json>) {
        if let Some(ref id) = self.id {
            out.insert("id".to_string(), Json::String(id.clone()));
        }
        if let Some(ref name) = self.name {
            out.insert(NAME_FIELD.to_string(), Json::String(name.clone()));
        }
        for (key, value) in self.metadata.entries() {
            out.insert(key.to_string(), value);
        }
    }

    /// The create/update request body.
    pub fn payload(&self) -> Result<Json, TesseraError> {
        let name = if self.ty.is_autoincrement() {
            None
        } else {
            Some(
                self.name
                    .clone()
                    .unwrap_or_else(|| UNNAMED_RECORD_NAME.to_string()),
            )
        };

        let payload = RecordPayload {
            record: RecordBody {
                custom_object_fields: self.to_wire(),
                name,
                external_id: self.metadata.external_id.clone(),
            },
        };
        Ok(serde_json::to_value(&payload)?)
    }

    /// Creates the record, or updates it once it has an id. Returns the
    /// response body.
    ///
    /// # Errors
    ///
    /// - `RecordDeleted` after a successful [`Entity::delete`]
    /// - `UniqueConstraint` when a unique name is already taken
    /// - `CreateRecord` / `UpdateRecord` with the remote detail for other
    ///   rejections
    /// - transport errors unchanged
    pub async fn save(&mut self, transport: &dyn Transport) -> Result<Json, TesseraError> {
        self.ensure_live()?;
        let payload = self.payload()?;

        match self.id.clone() {
            None => self.create(transport, &payload).await,
            Some(id) => self.update(transport, &id, &payload).await,
        }
    }

    async fn create(&mut self, transport: &dyn Transport, payload: &Json) -> Result<Json, TesseraError> {
        let attempted = payload
            .pointer("/record/name")
            .and_then(Json::as_str)
            .unwrap_or_default()
            .to_string();

        let response = match transport.post(&self.ty.records_path(), payload).await {
            Ok(response) => response,
            Err(TesseraError::HttpStatus { body, .. }) if is_name_taken(&body) => {
                return Err(TesseraError::UniqueConstraint { name: attempted });
            }
            Err(TesseraError::HttpStatus { body, .. }) => {
                return Err(TesseraError::CreateRecord {
                    detail: error_detail(&body),
                });
            }
            Err(e) => return Err(e),
        };

        let envelope: RecordEnvelope = serde_json::from_value(response.clone())
            .map_err(|e| TesseraError::unexpected(format!("create response: {}", e)))?;
        let record = envelope.record;
        let id = record
            .id
            .ok_or_else(|| TesseraError::unexpected("created record has no id"))?;

        tracing::info!(entity = %self.ty.name, id = %id, "Created record");

        self.id = Some(id);
        if record.name.is_some() {
            self.name = record.name;
        }
        self.metadata.merge(record.metadata);
        self.state = Lifecycle::Persisted;
        Ok(response)
    }

    async fn update(
        &mut self,
        transport: &dyn Transport,
        id: &str,
        payload: &Json,
    ) -> Result<Json, TesseraError> {
        let path = self.ty.record_path(id)?;

        let response = match transport.patch(&path, payload).await {
            Ok(response) => response,
            Err(TesseraError::HttpStatus { body, .. }) => {
                return Err(TesseraError::UpdateRecord {
                    detail: error_detail(&body),
                });
            }
            Err(e) => return Err(e),
        };

        match serde_json::from_value::<RecordEnvelope>(response.clone()) {
            Ok(envelope) => {
                if envelope.record.name.is_some() {
                    self.name = envelope.record.name;
                }
                self.metadata.merge(envelope.record.metadata);
            }
            Err(e) => {
                tracing::warn!(entity = %self.ty.name, id = %id, error = %e, "Update response has no record");
            }
        }

        tracing::debug!(entity = %self.ty.name, id = %id, "Updated record");
        Ok(response)
    }

    /// Deletes the record. The entity accepts no remote operations afterwards.
    ///
    /// # Errors
    ///
    /// Returns `NotPersisted` for an entity without id, `RecordDeleted` if
    /// already deleted, `DeleteRecord` with the remote detail on rejection.
    pub async fn delete(&mut self, transport: &dyn Transport) -> Result<(), TesseraError> {
        self.ensure_live()?;
        let id = self.id.clone().ok_or_else(|| self.not_persisted())?;

        self.ty.delete_record(transport, &id).await?;
        self.state = Lifecycle::Deleted;
        Ok(())
    }

    fn ensure_live(&self) -> Result<(), TesseraError> {
        if self.state == Lifecycle::Deleted {
            return Err(TesseraError::RecordDeleted {
                entity: self.ty.name.clone(),
                id: self.id.clone().unwrap_or_default(),
            });
        }
        Ok(())
    }

    fn not_persisted(&self) -> TesseraError {
        TesseraError::NotPersisted {
            entity: self.ty.name.clone(),
        }
    }
}

fn pseudo_text(key: &str, value: Value) -> Result<String, TesseraError> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(TesseraError::type_mismatch(key, DataType::Text, other.kind_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Choices;
    use chrono::{DateTime, NaiveDate};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn customer_type() -> Arc<EntityType> {
        EntityType::builder("Customer")
            .field(Field::text("codigo"))
            .field(Field::checkbox("ativo"))
            .field(Field::date("data_nascimento"))
            .field(Field::datetime("contato_em"))
            .field(Field::decimal("limite"))
            .field(Field::dropdown(
                "status",
                Choices::from_pairs([("open", "Open"), ("closed", "Closed")]),
            ))
            .field(Field::multiselect("tags", Choices::from_labels(["VIP", "Novo Cliente"])))
            .field(Field::lookup_key("owner", "agent"))
            .field(Field::attachment("contrato"))
            .build()
            .unwrap()
    }

    fn record_json() -> Json {
        json!({
            "id": "01J5",
            "name": "Acme",
            "created_at": "2023-07-15T10:30:45Z",
            "updated_at": "2023-07-16T15:20:33Z",
            "created_by_user_id": 10001,
            "updated_by_user_id": "10002",
            "external_id": null,
            "custom_object_fields": {
                "codigo": "1234",
                "ativo": true,
                "data_nascimento": "1990-05-01",
                "contato_em": "2023-07-15",
                "contato_em_time": "10:30:45.187652+00:00",
                "limite": 1500,
                "status": {"value": "open", "label": "Open"},
                "tags": ["vip"],
                "owner": 42,
                "contrato_id": 498,
                "contrato_filename": "contrato.pdf",
                "contrato_url": "https://files.example.com/498",
                "contrato_size": 2048,
                "undeclared": "ignored"
            }
        })
    }

    #[test]
    fn test_builder_rejects_duplicates() {
        let err = EntityType::builder("Thing")
            .field(Field::text("a"))
            .field(Field::integer("a"))
            .build()
            .unwrap_err();
        assert!(matches!(err, TesseraError::InvalidSchema(_)));
    }

    #[test]
    fn test_builder_rejects_companion_collision() {
        let err = EntityType::builder("Thing")
            .field(Field::text("doc_id"))
            .field(Field::attachment("doc"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("doc_id"));
    }

    #[test]
    fn test_builder_rejects_reserved_and_second_name() {
        assert!(EntityType::builder("Thing").field(Field::text("id")).build().is_err());
        assert!(EntityType::builder("Thing").field(Field::text("created_at")).build().is_err());
        assert!(EntityType::builder("Thing")
            .field(Field::name_field(NameOptions::new()))
            .field(Field::name_field(NameOptions::new().unique()))
            .build()
            .is_err());
    }

    #[test]
    fn test_builder_rejects_empty_choices_and_bad_names() {
        assert!(EntityType::builder("Thing")
            .field(Field::dropdown("s", Choices::from_labels(Vec::<String>::new())))
            .build()
            .is_err());
        assert!(EntityType::builder("").build().is_err());
        assert!(EntityType::builder("a/b").build().is_err());
        assert!(EntityType::builder("Thing")
            .field(Field::name_field(NameOptions::new().autoincrement("X-", 12)))
            .build()
            .is_err());
    }

    #[test]
    fn test_key_and_paths() {
        let ty = customer_type();
        assert_eq!(ty.key(), "customer");
        assert_eq!(ty.record_path("01J5").unwrap(), "/custom_objects/customer/records/01J5");
        assert!(ty.record_path("../x").is_err());
    }

    #[test]
    fn test_unknown_field() {
        let mut entity = customer_type().new_entity();
        let err = entity.set("nope", "x").unwrap_err();
        assert!(matches!(err, TesseraError::UnknownField { ref field, .. } if field == "nope"));
        assert!(entity.get("nope").is_err());
    }

    #[test]
    fn test_set_rejects_and_keeps_previous() {
        let mut entity = customer_type().new_entity();
        entity.set("codigo", "1234").unwrap();
        assert!(entity.set("codigo", 1234).is_err());
        assert_eq!(entity.get("codigo").unwrap(), Some(&Value::from("1234")));
    }

    #[test]
    fn test_none_clears_every_kind() {
        let ty = customer_type();
        let mut entity = Entity::from_json(&ty, &record_json()).unwrap();
        for field in ty.fields() {
            entity.set_opt(field.name(), None).unwrap();
            assert_eq!(entity.get(field.name()).unwrap(), None, "{}", field.name());
        }

        let extra = EntityType::builder("Ledger")
            .field(Field::integer("parcelas"))
            .field(Field::textarea("observacoes"))
            .field(Field::regexp("cep", r"\d{5}-\d{3}").unwrap())
            .build()
            .unwrap();
        let mut entity = extra.new_entity();
        entity.set("parcelas", 12).unwrap();
        entity.set("observacoes", "linha 1\nlinha 2").unwrap();
        entity.set("cep", "01310-100").unwrap();
        for field in extra.fields() {
            entity.set_opt(field.name(), None).unwrap();
            assert_eq!(entity.get(field.name()).unwrap(), None, "{}", field.name());
        }
    }

    #[test]
    fn test_from_json_materializes() {
        let ty = customer_type();
        let entity = Entity::from_json(&ty, &record_json()).unwrap();

        assert_eq!(entity.id(), Some("01J5"));
        assert_eq!(entity.state(), Lifecycle::Persisted);
        assert_eq!(entity.get("ativo").unwrap(), Some(&Value::from(true)));
        assert_eq!(
            entity.get("data_nascimento").unwrap(),
            Some(&Value::from(NaiveDate::from_ymd_opt(1990, 5, 1).unwrap()))
        );
        assert_eq!(entity.get("limite").unwrap(), Some(&Value::Decimal(1500.0)));
        assert_eq!(entity.get("status").unwrap(), Some(&Value::from("open")));
        assert_eq!(
            entity.get("owner").unwrap(),
            Some(&Value::from(Related::with_type("42", "agent")))
        );
        assert_eq!(entity.metadata().created_by_user_id.as_deref(), Some("10001"));

        let expected = DateTime::parse_from_rfc3339("2023-07-15T10:30:45.187652+00:00").unwrap();
        assert_eq!(entity.get("contato_em").unwrap(), Some(&Value::DateTime(expected)));
    }

    #[test]
    fn test_attachment_built_lazily_from_companions() {
        let ty = customer_type();
        let entity = Entity::from_json(&ty, &record_json()).unwrap();
        match entity.get("contrato").unwrap() {
            Some(Value::Attachment(a)) => {
                assert_eq!(a.id(), Some("498"));
                assert_eq!(a.filename(), "contrato.pdf");
                assert!(a.is_saved());
            }
            other => panic!("expected attachment, got {:?}", other),
        }
    }

    #[test]
    fn test_attachment_absent_without_id() {
        let mut entity = customer_type().new_entity();
        assert_eq!(entity.get("contrato").unwrap(), None);
        assert!(entity.attachment_mut("contrato").unwrap().is_none());
        assert!(entity.attachment_mut("codigo").is_err());
    }

    #[test]
    fn test_set_attachment_fans_out() {
        let mut entity = customer_type().new_entity();
        entity
            .set("contrato", Attachment::from_remote("7", Some("a.pdf".into()), None, Some(3)))
            .unwrap();
        let wire = entity.to_wire();
        assert_eq!(wire.get("contrato_id"), Some(&json!("7")));
        assert_eq!(wire.get("contrato_filename"), Some(&json!("a.pdf")));
        assert_eq!(wire.get("contrato_size"), Some(&json!(3)));
        assert!(entity.set("contrato", "a.pdf").is_err());

        entity.clear("contrato").unwrap();
        assert_eq!(entity.get("contrato").unwrap(), None);
        assert_eq!(entity.to_wire().get("contrato_id"), Some(&Json::Null));
    }

    #[test]
    fn test_to_representation() {
        let ty = customer_type();
        let entity = Entity::from_json(&ty, &record_json()).unwrap();
        let repr = entity.to_representation();

        assert_eq!(repr["codigo"], json!("1234"));
        assert_eq!(repr["status"], json!({"value": "open", "label": "Open"}));
        assert_eq!(repr["tags"], json!([{"value": "vip", "label": "vip"}]));
        assert_eq!(repr["owner"], json!("42"));
        assert_eq!(repr["contrato"]["id"], json!("498"));
        assert_eq!(repr["id"], json!("01J5"));
        assert_eq!(repr["name"], json!("Acme"));
        assert_eq!(repr["created_by_user_id"], json!("10001"));
        assert!(repr.get("external_id").is_none());
    }

    #[test]
    fn test_to_representation_keeps_nulls() {
        let entity = customer_type().new_entity();
        let repr = entity.to_representation();
        assert_eq!(repr["codigo"], Json::Null);
        assert_eq!(repr["contrato"], Json::Null);
        assert!(repr.get("id").is_none());
    }

    #[test]
    fn test_to_wire() {
        let mut entity = customer_type().new_entity();
        entity.set("codigo", "1234").unwrap();
        entity.set("contato_em", "2023-07-15T10:30:45Z").unwrap();
        entity.set("status", "closed").unwrap();
        entity.set("owner", Related::new("42")).unwrap();

        let wire = entity.to_wire();
        assert_eq!(wire["codigo"], json!("1234"));
        assert_eq!(wire["contato_em"], json!("2023-07-15"));
        assert_eq!(wire["contato_em_time"], json!("10:30:45+00:00"));
        assert_eq!(wire["status"], json!({"value": "closed", "label": "Closed"}));
        assert_eq!(wire["tags"], Json::Null);
        assert_eq!(wire["owner"], json!("42"));
        assert!(wire.get("id").is_none());
    }

    #[test]
    fn test_payload_names() {
        let mut entity = customer_type().new_entity();
        let payload = entity.payload().unwrap();
        assert_eq!(payload["record"]["name"], json!(UNNAMED_RECORD_NAME));
        assert_eq!(payload["record"]["external_id"], Json::Null);

        entity.set_name("Acme");
        entity.set_external_id(Some("crm-1".into()));
        let payload = entity.payload().unwrap();
        assert_eq!(payload["record"]["name"], json!("Acme"));
        assert_eq!(payload["record"]["external_id"], json!("crm-1"));

        let ticketed = EntityType::builder("Order")
            .field(Field::name_field(NameOptions::new().autoincrement("ORD-", 4)))
            .field(Field::text("note"))
            .build()
            .unwrap();
        let mut order = ticketed.new_entity();
        order.set_name("ignored");
        let payload = order.payload().unwrap();
        assert_eq!(payload["record"]["name"], Json::Null);
        assert!(payload["record"]["custom_object_fields"].get("name").is_none());
        assert_eq!(payload["record"]["custom_object_fields"]["note"], Json::Null);
    }

    #[test]
    fn test_set_many_pseudo_fields() {
        let mut entity = customer_type().new_entity();
        entity
            .set_many([
                ("name", Value::from("Acme")),
                ("external_id", Value::from("crm-1")),
                ("codigo", Value::from("1")),
            ])
            .unwrap();
        assert_eq!(entity.name(), Some("Acme"));
        assert_eq!(entity.metadata().external_id.as_deref(), Some("crm-1"));
        assert!(entity.set_many([("name", Value::from(3))]).is_err());
    }

    #[test]
    fn test_related_requires_id() {
        let ty = customer_type();
        assert!(matches!(
            ty.new_entity().related(),
            Err(TesseraError::NotPersisted { .. })
        ));
        let entity = Entity::from_json(&ty, &record_json()).unwrap();
        assert_eq!(entity.related().unwrap(), Related::with_type("01J5", "customer"));
    }

    #[test]
    fn test_value_for_system_fields() {
        let ty = customer_type();
        let entity = Entity::from_json(&ty, &record_json()).unwrap();
        assert_eq!(entity.value_for("id").unwrap(), Some(Value::from("01J5")));
        assert_eq!(entity.value_for("external_id").unwrap(), None);
        assert!(matches!(entity.value_for("updated_at").unwrap(), Some(Value::DateTime(_))));
        assert_eq!(entity.value_for("codigo").unwrap(), Some(Value::from("1234")));
    }

    #[test]
    fn test_materialize_rejects_invalid_choice() {
        let ty = customer_type();
        let mut record = record_json();
        record["custom_object_fields"]["status"] = json!("archived");
        let err = Entity::from_json(&ty, &record).unwrap_err();
        assert!(matches!(err, TesseraError::InvalidChoice { .. }));
    }

    #[test]
    fn test_definitions_include_name_field() {
        let ty = EntityType::builder("Order")
            .field(Field::name_field(NameOptions::new().unique()))
            .field(Field::datetime("due"))
            .build()
            .unwrap();
        let defs = ty.definitions();
        assert_eq!(defs.len(), 3);
        assert_eq!(defs[0]["key"], json!("name"));
        assert_eq!(defs[0]["unique"], json!(true));
    }
}
