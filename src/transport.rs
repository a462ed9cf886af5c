//! The transport capability consumed by entities, queries and attachments.
//!
//! Everything above this trait speaks JSON values and paths relative to the
//! API base URL. Implementations signal non-success responses with
//! `TesseraError::HttpStatus` so callers can read the status and body.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::error::TesseraError;

/// HTTP capability used by the record layer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `path` with ordered query parameters and return the decoded JSON body.
    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, TesseraError>;

    /// POST a JSON body.
    async fn post(&self, path: &str, body: &Value) -> Result<Value, TesseraError>;

    /// PATCH a JSON body.
    async fn patch(&self, path: &str, body: &Value) -> Result<Value, TesseraError>;

    /// PUT a JSON body.
    async fn put(&self, path: &str, body: &Value) -> Result<Value, TesseraError>;

    /// DELETE `path` and return the response status.
    async fn delete(&self, path: &str) -> Result<StatusCode, TesseraError>;

    /// Upload raw file content and return the decoded JSON body.
    async fn upload(&self, filename: &str, content: &[u8]) -> Result<Value, TesseraError>;
}

/// Checks that an identifier is safe to interpolate into a path segment.
///
/// Record and attachment ids are opaque strings of ASCII alphanumerics,
/// dashes and underscores. Anything else could escape the intended path.
///
/// # Errors
///
/// Returns `TesseraError::Validation` if the id is empty or contains
/// other characters.
pub fn validate_id(id: &str, field_name: &str) -> Result<(), TesseraError> {
    if id.is_empty()
        || !id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(TesseraError::validation(format!(
            "{} must be alphanumeric, got: {:?}",
            field_name,
            id.chars().take(50).collect::<String>()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id_valid() {
        assert!(validate_id("12345", "test").is_ok());
        assert!(validate_id("01GDXYD7ZTWYP542BA8MDDTE36", "test").is_ok());
        assert!(validate_id("rec_01-a", "test").is_ok());
    }

    #[test]
    fn test_validate_id_rejects_empty() {
        let err = validate_id("", "record_id").unwrap_err();
        assert!(err.to_string().contains("record_id"));
        assert!(err.to_string().contains("alphanumeric"));
    }

    #[test]
    fn test_validate_id_rejects_path_characters() {
        assert!(validate_id("12/34", "id").is_err());
        assert!(validate_id("../etc/passwd", "id").is_err());
        assert!(validate_id("12 34", "id").is_err());
        assert!(validate_id("1?x=2", "id").is_err());
    }
}
