//! Uploaded files.
//!
//! An [`Attachment`] is either local content waiting to be uploaded or a
//! reference to a file the platform already stores. Uploading happens on
//! [`Attachment::save`]; once saved the attachment can be attached to a
//! parent resource such as a ticket with [`Attachment::save_with_parent`].

use std::fmt;

use serde_json::{json, Map, Value as Json};

use crate::error::TesseraError;
use crate::fields::AttachmentSlots;
use crate::models::{json_id, AttachmentEnvelope, RemoteAttachment, UploadEnvelope};
use crate::transport::{validate_id, Transport};

/// Comment body used when attaching without an explicit comment.
pub const DEFAULT_ATTACH_COMMENT: &str = "Attachment added.";

/// The resource an attachment is attached to.
///
/// Attaching PUTs `{<key>: {"comment": ...}}` to `/{collection}/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentResource {
    collection: String,
    key: String,
}

impl ParentResource {
    /// A parent living under `/{collection}/{id}` whose body is wrapped in `key`.
    pub fn new(collection: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// Tickets: `/tickets/{id}` with a `ticket` body.
    pub fn tickets() -> Self {
        Self::new("tickets", "ticket")
    }

    fn path(&self, id: &str) -> String {
        format!("/{}/{}", self.collection, id)
    }
}

impl Default for ParentResource {
    fn default() -> Self {
        Self::tickets()
    }
}

/// A file attached to a record.
#[derive(Clone, PartialEq)]
pub struct Attachment {
    id: Option<String>,
    filename: String,
    url: Option<String>,
    size: Option<u64>,
    content: Option<Vec<u8>>,
    token: Option<String>,
    saved: bool,
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("id", &self.id)
            .field("filename", &self.filename)
            .field("url", &self.url)
            .field("size", &self.size)
            .field("content", &self.content.as_ref().map(|c| format!("<{} bytes>", c.len())))
            .field("saved", &self.saved)
            .finish()
    }
}

impl Default for Attachment {
    fn default() -> Self {
        Self::new()
    }
}

impl Attachment {
    /// An empty attachment with a random file name.
    pub fn new() -> Self {
        Self {
            id: None,
            filename: random_filename(),
            url: None,
            size: None,
            content: None,
            token: None,
            saved: false,
        }
    }

    /// Local content to be uploaded. Without a file name a random UUID is used.
    pub fn from_content(content: impl Into<Vec<u8>>, filename: Option<&str>) -> Self {
        let content = content.into();
        Self {
            filename: filename.map(str::to_string).unwrap_or_else(random_filename),
            size: Some(content.len() as u64),
            content: Some(content),
            ..Self::new()
        }
    }

    /// A file the platform already stores.
    pub fn from_remote(
        id: impl Into<String>,
        filename: Option<String>,
        url: Option<String>,
        size: Option<u64>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            filename: filename.unwrap_or_else(random_filename),
            url,
            size,
            saved: true,
            ..Self::new()
        }
    }

    /// Remote id, once uploaded.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// File name.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Download URL, once uploaded.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Size in bytes.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Local content, if any.
    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    /// Upload token, available after this attachment uploaded its content.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Returns true if the platform holds the current content.
    pub fn is_saved(&self) -> bool {
        self.saved
    }

    /// Returns true if there is neither a remote id nor local content.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.content.as_ref().is_none_or(|c| c.is_empty())
    }

    /// Replaces the local content. The attachment must be saved again.
    pub fn set_content(&mut self, content: impl Into<Vec<u8>>) {
        let content = content.into();
        self.size = Some(content.len() as u64);
        self.content = Some(content);
        self.saved = false;
    }

    /// Uploads the content unless it is already saved.
    ///
    /// # Errors
    ///
    /// Returns `TesseraError::MissingContent` if there is nothing to upload,
    /// `UnexpectedResponse` if the upload answer cannot be read, or the
    /// transport error.
    pub async fn save(&mut self, transport: &dyn Transport) -> Result<(), TesseraError> {
        if self.saved {
            return Ok(());
        }

        let Some(content) = self.content.as_deref() else {
            return Err(TesseraError::MissingContent {
                filename: self.filename.clone(),
            });
        };

        let body = transport.upload(&self.filename, content).await?;
        let envelope: UploadEnvelope = serde_json::from_value(body)
            .map_err(|e| TesseraError::unexpected(format!("upload response: {}", e)))?;
        let upload = envelope.upload;

        self.apply_remote(upload.attachment);
        self.token = Some(upload.token);
        self.saved = true;

        tracing::info!(
            attachment_id = self.id.as_deref().unwrap_or_default(),
            filename = %self.filename,
            "Uploaded attachment"
        );
        Ok(())
    }

    /// Uploads if needed, then attaches the upload to a parent resource
    /// through a comment. Returns the parent's response body.
    ///
    /// # Errors
    ///
    /// Fails like [`Attachment::save`]; additionally returns
    /// `TesseraError::Validation` for an unsafe parent id or when the
    /// attachment has no upload token (it was never uploaded by this
    /// client).
    pub async fn save_with_parent(
        &mut self,
        transport: &dyn Transport,
        parent: &ParentResource,
        parent_id: &str,
        comment: Option<&str>,
    ) -> Result<Json, TesseraError> {
        validate_id(parent_id, "parent_id")?;
        self.save(transport).await?;

        let token = self.token.as_deref().ok_or_else(|| {
            TesseraError::validation(format!(
                "attachment '{}' has no upload token to attach",
                self.filename
            ))
        })?;

        let mut inner = Map::new();
        inner.insert(
            "comment".to_string(),
            json!({
                "body": comment.unwrap_or(DEFAULT_ATTACH_COMMENT),
                "uploads": [token],
            }),
        );
        let mut body = Map::new();
        body.insert(parent.key.clone(), Json::Object(inner));

        transport.put(&parent.path(parent_id), &Json::Object(body)).await
    }

    /// [`Attachment::save_with_parent`] for a ticket.
    pub async fn save_with_ticket(
        &mut self,
        transport: &dyn Transport,
        ticket_id: &str,
        comment: Option<&str>,
    ) -> Result<Json, TesseraError> {
        self.save_with_parent(transport, &ParentResource::tickets(), ticket_id, comment)
            .await
    }

    /// Fetches the details of a stored attachment.
    ///
    /// # Errors
    ///
    /// Returns `TesseraError::Validation` for an unsafe id,
    /// `UnexpectedResponse` if the answer cannot be read, or the transport
    /// error.
    pub async fn fetch(transport: &dyn Transport, id: &str) -> Result<Self, TesseraError> {
        validate_id(id, "attachment_id")?;

        let body = transport.get(&format!("/attachments/{}", id), &[]).await?;
        let envelope: AttachmentEnvelope = serde_json::from_value(body)
            .map_err(|e| TesseraError::unexpected(format!("attachment response: {}", e)))?;

        let mut attachment = Self {
            id: Some(id.to_string()),
            saved: true,
            ..Self::new()
        };
        attachment.apply_remote(envelope.attachment);
        Ok(attachment)
    }

    fn apply_remote(&mut self, remote: RemoteAttachment) {
        if let Some(id) = remote.id {
            self.id = Some(id);
        }
        if let Some(filename) = remote.file_name {
            self.filename = filename;
        }
        self.url = remote.content_url;
        self.size = remote.size;
    }

    /// Rebuilds an attachment from its companion slots.
    ///
    /// Returns `None` unless the id slot holds an id.
    pub(crate) fn from_slots(slots: &AttachmentSlots, values: &Map<String, Json>) -> Option<Self> {
        let id = values.get(&slots.id).and_then(json_id)?;
        let filename = values
            .get(&slots.filename)
            .and_then(Json::as_str)
            .map(str::to_string);
        let url = values.get(&slots.url).and_then(Json::as_str).map(str::to_string);
        let size = values.get(&slots.size).and_then(|raw| match raw {
            Json::Number(n) => n.as_u64(),
            Json::String(s) => s.parse().ok(),
            _ => None,
        });
        Some(Self::from_remote(id, filename, url, size))
    }

    /// Writes the four companion slots.
    pub(crate) fn write_slots(&self, slots: &AttachmentSlots, out: &mut Map<String, Json>) {
        out.insert(slots.id.clone(), opt_string(self.id.as_deref()));
        out.insert(slots.url.clone(), opt_string(self.url.as_deref()));
        out.insert(slots.filename.clone(), Json::String(self.filename.clone()));
        out.insert(slots.size.clone(), self.size.map(Json::from).unwrap_or(Json::Null));
    }

    /// `{id, filename, url, size}`.
    pub fn representation(&self) -> Json {
        json!({
            "id": self.id,
            "filename": self.filename,
            "url": self.url,
            "size": self.size,
        })
    }
}

fn random_filename() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn opt_string(value: Option<&str>) -> Json {
    value.map(|s| Json::String(s.to_string())).unwrap_or(Json::Null)
}
