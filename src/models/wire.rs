//! JSON envelopes exchanged with the platform.
//!
//! Record endpoints wrap a single record in `{"record": ...}` and a
//! collection in `{"records": [...]}`; uploads answer with
//! `{"upload": {"attachment": ..., "token": ...}}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use super::metadata::{deserialize_optional_string_or_int, SystemMetadata};
use crate::error::TesseraError;

/// A record as returned by the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    /// Remote id (string or integer on the wire).
    #[serde(default, deserialize_with = "deserialize_optional_string_or_int")]
    pub id: Option<String>,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Custom field values keyed by wire name.
    #[serde(default)]
    pub custom_object_fields: Map<String, Json>,

    /// Timestamps, authorship and external id.
    #[serde(flatten)]
    pub metadata: SystemMetadata,
}

impl RawRecord {
    /// Decodes a record from a JSON value.
    pub fn from_json(value: &Json) -> Result<Self, TesseraError> {
        serde_json::from_value(value.clone()).map_err(TesseraError::Serialization)
    }
}

/// Response wrapper for single record operations.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordEnvelope {
    /// The record.
    pub record: RawRecord,
}

/// Response wrapper for record collections.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordsEnvelope {
    /// Records in server order.
    #[serde(default)]
    pub records: Vec<Json>,
}

/// Body sent on create and update.
#[derive(Debug, Clone, Serialize)]
pub struct RecordPayload {
    /// The record being written.
    pub record: RecordBody,
}

/// Inner part of [`RecordPayload`].
#[derive(Debug, Clone, Serialize)]
pub struct RecordBody {
    /// Custom field values keyed by wire name.
    pub custom_object_fields: Map<String, Json>,

    /// Display name; `null` lets the platform assign one.
    pub name: Option<String>,

    /// Caller-assigned identifier from an external system.
    pub external_id: Option<String>,
}

/// Attachment details as returned by upload and attachment endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteAttachment {
    /// Attachment id (string or integer on the wire).
    #[serde(default, deserialize_with = "deserialize_optional_string_or_int")]
    pub id: Option<String>,

    /// Stored file name.
    #[serde(default)]
    pub file_name: Option<String>,

    /// Download URL.
    #[serde(default)]
    pub content_url: Option<String>,

    /// Size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
}

/// Upload result: the stored attachment plus a token used to attach it elsewhere.
#[derive(Debug, Clone, Deserialize)]
pub struct Upload {
    /// Stored attachment.
    pub attachment: RemoteAttachment,

    /// Token referencing the upload.
    pub token: String,
}

/// Response wrapper for uploads.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadEnvelope {
    /// The upload.
    pub upload: Upload,
}

/// Response wrapper for attachment details.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentEnvelope {
    /// The attachment.
    pub attachment: RemoteAttachment,
}

/// Extracts a human-readable detail from an error body.
///
/// The platform reports failures as `{"details": ...}`, `{"description": ...}`
/// or `{"error": ...}`; anything else is returned verbatim.
pub fn error_detail(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Json>(body) else {
        return body.to_string();
    };

    for key in ["details", "description", "error"] {
        match json.get(key) {
            Some(Json::String(s)) => return s.clone(),
            Some(Json::Null) | None => continue,
            Some(other) => return other.to_string(),
        }
    }

    body.to_string()
}

/// Returns true if an error body reports a unique name collision.
pub fn is_name_taken(body: &str) -> bool {
    serde_json::from_str::<Json>(body)
        .ok()
        .and_then(|json| {
            json.pointer("/details/base/0/description")
                .and_then(Json::as_str)
                .map(|description| description == crate::error::NAME_TAKEN_DETAIL)
        })
        .unwrap_or(false)
}
