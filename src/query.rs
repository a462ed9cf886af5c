//! Query evaluation over fetched records.
//!
//! The platform's record listing has no server-side filtering that maps
//! onto field values, so [`QuerySet`] fetches the full collection and
//! evaluates [`Criteria`] in memory. Every call re-fetches; nothing is
//! cached between calls.

use std::sync::Arc;

use serde_json::Value as Json;

use crate::entity::{Entity, EntityType};
use crate::error::TesseraError;
use crate::fields::{parse_datetime, DataType};
use crate::models::{RawRecord, RecordsEnvelope, Value};
use crate::transport::Transport;

/// Query parameters selecting the most recently updated record.
const LAST_UPDATED_PARAMS: [(&str, &str); 2] = [("sort", "-updated_at"), ("page[size]", "1")];

/// Equality criteria, combined with AND.
///
/// ```
/// use tessera::query::Criteria;
///
/// let criteria = Criteria::new().eq("codigo", "1234").eq("ativo", true);
/// assert_eq!(criteria.len(), 2);
///
/// let same: Criteria = [("codigo", "1234")].into_iter().collect();
/// assert_eq!(same.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    terms: Vec<(String, Option<Value>)>,
}

impl Criteria {
    /// No criteria; matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `field` to equal `value`.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.terms.push((field.into(), Some(value.into())));
        self
    }

    /// Requires `field` to be empty.
    #[must_use]
    pub fn is_null(mut self, field: impl Into<String>) -> Self {
        self.terms.push((field.into(), None));
        self
    }

    /// Returns true if there are no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Terms in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.terms.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Coerces every term through the field it names so that comparisons
    /// happen between stored forms.
    fn resolve(&self, ty: &EntityType) -> Result<Vec<(String, Option<Value>)>, TesseraError> {
        self.terms
            .iter()
            .map(|(key, value)| {
                let coerced = match value {
                    None => None,
                    Some(value) => Some(coerce(ty, key, value.clone())?),
                };
                Ok((key.clone(), coerced))
            })
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Criteria
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Criteria::new(), |criteria, (k, v)| criteria.eq(k, v))
    }
}

fn coerce(ty: &EntityType, key: &str, value: Value) -> Result<Value, TesseraError> {
    match key {
        "id" | "name" | "created_by_user_id" | "updated_by_user_id" | "external_id" => match value {
            Value::Text(_) => Ok(value),
            Value::Integer(i) => Ok(Value::Text(i.to_string())),
            other => Err(TesseraError::type_mismatch(key, DataType::Text, other.kind_name())),
        },
        "created_at" | "updated_at" => match value {
            Value::DateTime(_) => Ok(value),
            Value::Text(s) => parse_datetime(key, &s).map(Value::DateTime),
            other => Err(TesseraError::type_mismatch(key, DataType::DateTime, other.kind_name())),
        },
        field => ty.require_field(field)?.validate(value),
    }
}

/// Read access to the records of one entity type.
#[derive(Clone)]
pub struct QuerySet {
    ty: Arc<EntityType>,
    transport: Arc<dyn Transport>,
}

impl QuerySet {
    /// Queries records of `ty` through `transport`.
    pub fn new(ty: Arc<EntityType>, transport: Arc<dyn Transport>) -> Self {
        Self { ty, transport }
    }

    /// The queried type.
    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.ty
    }

    /// Every record, in server order.
    pub async fn all(&self) -> Result<Vec<Entity>, TesseraError> {
        let body = self.transport.get(&self.ty.records_path(), &[]).await?;
        self.materialize(body)
    }

    /// Records matching every criterion, in server order.
    ///
    /// # Errors
    ///
    /// Criteria naming unknown fields or holding values the field rejects
    /// fail before any request is made.
    pub async fn filter(&self, criteria: &Criteria) -> Result<Vec<Entity>, TesseraError> {
        let terms = criteria.resolve(&self.ty)?;
        let records = self.all().await?;
        let total = records.len();

        let mut matched = Vec::new();
        for entity in records {
            if matches(&entity, &terms)? {
                matched.push(entity);
            }
        }

        tracing::debug!(
            entity = %self.ty.name(),
            total,
            matched = matched.len(),
            "Filtered records"
        );
        Ok(matched)
    }

    /// The only record matching `criteria`.
    ///
    /// # Errors
    ///
    /// Returns `DoesNotExist` for no match and `MultipleResults` for more
    /// than one.
    pub async fn get(&self, criteria: &Criteria) -> Result<Entity, TesseraError> {
        let mut matched = self.filter(criteria).await?;
        match matched.len() {
            0 => Err(TesseraError::DoesNotExist {
                entity: self.ty.name().to_string(),
            }),
            1 => Ok(matched.remove(0)),
            count => Err(TesseraError::MultipleResults {
                entity: self.ty.name().to_string(),
                count,
            }),
        }
    }

    /// The most recently updated record, if any.
    pub async fn last(&self) -> Result<Option<Entity>, TesseraError> {
        let body = self
            .transport
            .get(&self.ty.records_path(), &LAST_UPDATED_PARAMS)
            .await?;
        Ok(self.materialize(body)?.into_iter().next())
    }

    /// Builds entities from a `{"records": [...]}` body.
    pub(crate) fn materialize(&self, body: Json) -> Result<Vec<Entity>, TesseraError> {
        let envelope: RecordsEnvelope = serde_json::from_value(body)
            .map_err(|e| TesseraError::unexpected(format!("record list: {}", e)))?;

        envelope
            .records
            .iter()
            .map(|record| Entity::from_record(&self.ty, RawRecord::from_json(record)?))
            .collect()
    }
}

fn matches(entity: &Entity, terms: &[(String, Option<Value>)]) -> Result<bool, TesseraError> {
    for (key, expected) in terms {
        if entity.value_for(key)?.as_ref() != expected.as_ref() {
            return Ok(false);
        }
    }
    Ok(true)
}
