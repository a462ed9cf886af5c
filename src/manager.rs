//! Record manager: the entry point for working with one entity type.

use std::fmt;
use std::sync::Arc;

use reqwest::StatusCode;

use crate::entity::{Entity, EntityType};
use crate::error::TesseraError;
use crate::models::{RecordEnvelope, Value};
use crate::query::{Criteria, QuerySet};
use crate::transport::Transport;

/// Creates, fetches and deletes records of one entity type.
///
/// Holds the type and a shared transport; it has no other state.
#[derive(Clone)]
pub struct RecordManager {
    ty: Arc<EntityType>,
    transport: Arc<dyn Transport>,
    query: QuerySet,
}

impl fmt::Debug for RecordManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordManager")
            .field("entity", &self.ty.name())
            .finish_non_exhaustive()
    }
}

impl RecordManager {
    /// A manager for `ty` over `transport`.
    pub fn new(ty: Arc<EntityType>, transport: Arc<dyn Transport>) -> Self {
        let query = QuerySet::new(Arc::clone(&ty), Arc::clone(&transport));
        Self {
            ty,
            transport,
            query,
        }
    }

    /// The managed type.
    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.ty
    }

    /// The transport records are saved through.
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// The underlying query set.
    pub fn query(&self) -> &QuerySet {
        &self.query
    }

    /// A new, unsaved entity.
    pub fn new_entity(&self) -> Entity {
        self.ty.new_entity()
    }

    /// Builds an entity from `values` and saves it.
    ///
    /// The pseudo-fields `name` and `external_id` set the display name and
    /// external id.
    ///
    /// # Errors
    ///
    /// Validation errors fail before any request; save errors as in
    /// [`Entity::save`].
    pub async fn create<I, K>(&self, values: I) -> Result<Entity, TesseraError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut entity = self.new_entity();
        entity.set_many(values)?;
        entity.save(self.transport.as_ref()).await?;
        Ok(entity)
    }

    /// Fetches one record by id.
    ///
    /// # Errors
    ///
    /// - `Validation` for an unsafe id
    /// - `BadRequest` with the remote body when the platform answers 400
    /// - `NotFound` when it answers 404
    /// - any other transport error unchanged
    pub async fn get(&self, id: &str) -> Result<Entity, TesseraError> {
        let path = self.ty.record_path(id)?;

        let body = match self.transport.get(&path, &[]).await {
            Ok(body) => body,
            Err(TesseraError::HttpStatus { status, body }) if status == StatusCode::BAD_REQUEST => {
                return Err(TesseraError::BadRequest {
                    entity: self.ty.name().to_string(),
                    id: id.to_string(),
                    body,
                });
            }
            Err(TesseraError::HttpStatus { status, .. }) if status == StatusCode::NOT_FOUND => {
                return Err(TesseraError::NotFound {
                    entity: self.ty.name().to_string(),
                    id: id.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        let envelope: RecordEnvelope = serde_json::from_value(body)
            .map_err(|e| TesseraError::unexpected(format!("record response: {}", e)))?;
        Entity::from_record(&self.ty, envelope.record)
    }

    /// The only record matching `criteria`.
    ///
    /// # Errors
    ///
    /// `DoesNotExist` for no match, `MultipleResults` for several.
    pub async fn get_by(&self, criteria: &Criteria) -> Result<Entity, TesseraError> {
        self.query.get(criteria).await
    }

    /// Records matching every criterion, in server order.
    pub async fn filter(&self, criteria: &Criteria) -> Result<Vec<Entity>, TesseraError> {
        self.query.filter(criteria).await
    }

    /// Every record, in server order.
    pub async fn all(&self) -> Result<Vec<Entity>, TesseraError> {
        self.query.all().await
    }

    /// The most recently updated record, if any.
    pub async fn last(&self) -> Result<Option<Entity>, TesseraError> {
        self.query.last().await
    }

    /// Deletes a record by id without fetching it.
    ///
    /// # Errors
    ///
    /// `Validation` for an unsafe id, `DeleteRecord` with the remote detail
    /// on rejection.
    pub async fn delete(&self, id: &str) -> Result<(), TesseraError> {
        self.ty.delete_record(self.transport.as_ref(), id).await
    }
}
