//! Error types for tessera.
//!
//! This module defines `TesseraError`, the unified error type used throughout
//! the crate: field validation, record persistence, queries and transport.
//!
//! # Security
//!
//! Error bodies coming back from the remote platform are sanitized so the
//! API token never ends up in logs or error messages. Use
//! `sanitize_message()` when building messages from external sources.

use std::time::Duration;
use thiserror::Error;

use crate::fields::DataType;

/// Detail text the platform returns when a unique name is already taken.
pub const NAME_TAKEN_DETAIL: &str = "Name already exists. Try another one.";

/// Unified error type for all tessera operations.
#[derive(Error, Debug)]
pub enum TesseraError {
    /// Configuration error - missing or invalid environment variables.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP request failed during transmission.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// HTTP client initialization failed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// HTTP response returned a non-success status code.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// The HTTP status code returned.
        status: reqwest::StatusCode,
        /// The response body, potentially containing error details.
        body: String,
    },

    /// Request timed out.
    #[error("request timed out after {duration:?} ({operation})")]
    Timeout {
        /// How long we waited before timing out.
        duration: Duration,
        /// The operation that timed out.
        operation: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Input validation failed (identifiers, arguments).
    #[error("validation error: {0}")]
    Validation(String),

    /// An entity type declaration is inconsistent.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// The entity type declares no field with this name.
    #[error("{entity} has no field named '{field}'")]
    UnknownField {
        /// Entity type name.
        entity: String,
        /// The field that was asked for.
        field: String,
    },

    /// A value does not have the data type the field holds.
    #[error("field '{field}' expects {expected}, got {found}")]
    TypeMismatch {
        /// Field name.
        field: String,
        /// The declared data type.
        expected: DataType,
        /// Short description of what was supplied.
        found: &'static str,
    },

    /// A value is not one of the field's allowed choices.
    #[error("'{value}' is not a valid choice for field '{field}'")]
    InvalidChoice {
        /// Field name.
        field: String,
        /// The rejected value.
        value: String,
    },

    /// A string has the right type but the wrong shape.
    #[error("invalid value '{value}' for field '{field}': {reason}")]
    InvalidFormat {
        /// Field name.
        field: String,
        /// The rejected value.
        value: String,
        /// What was expected.
        reason: String,
    },

    /// A regexp field was declared with a pattern that does not compile.
    #[error("could not compile pattern for field '{field}': {source}")]
    RegexCompile {
        /// Field name.
        field: String,
        /// The compiler error.
        #[source]
        source: regex::Error,
    },

    /// The platform rejected a create.
    #[error("could not create record: {detail}")]
    CreateRecord {
        /// Remote detail, verbatim.
        detail: String,
    },

    /// The platform rejected an update.
    #[error("could not update record: {detail}")]
    UpdateRecord {
        /// Remote detail, verbatim.
        detail: String,
    },

    /// The platform rejected a delete.
    #[error("could not delete record: {detail}")]
    DeleteRecord {
        /// Remote detail, verbatim.
        detail: String,
    },

    /// A create collided with an existing unique name.
    #[error("a record named '{name}' already exists")]
    UniqueConstraint {
        /// The name that was attempted.
        name: String,
    },

    /// Single-record fetch answered 400.
    #[error("bad request for {entity} record {id}: {body}")]
    BadRequest {
        /// Entity type name.
        entity: String,
        /// Requested id.
        id: String,
        /// Remote error body.
        body: String,
    },

    /// Single-record fetch answered 404.
    #[error("{entity} record {id} not found")]
    NotFound {
        /// Entity type name.
        entity: String,
        /// Requested id.
        id: String,
    },

    /// A criteria lookup matched nothing.
    #[error("{entity} matching query does not exist")]
    DoesNotExist {
        /// Entity type name.
        entity: String,
    },

    /// A criteria lookup matched more than one record.
    #[error("{count} {entity} records returned; expected exactly one")]
    MultipleResults {
        /// Entity type name.
        entity: String,
        /// How many records matched.
        count: usize,
    },

    /// The operation needs a record id and the entity was never saved.
    #[error("{entity} has not been saved yet")]
    NotPersisted {
        /// Entity type name.
        entity: String,
    },

    /// The entity was deleted and accepts no further remote operations.
    #[error("{entity} record {id} has been deleted")]
    RecordDeleted {
        /// Entity type name.
        entity: String,
        /// Id of the deleted record.
        id: String,
    },

    /// An attachment was saved without content to upload.
    #[error("attachment '{filename}' has no content to upload")]
    MissingContent {
        /// Local file name.
        filename: String,
    },

    /// A success response did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl TesseraError {
    /// Creates a configuration error for a missing environment variable.
    pub fn missing_env(var_name: &str) -> Self {
        TesseraError::Config(format!(
            "missing required environment variable: {}",
            var_name
        ))
    }

    /// Creates a configuration error for an invalid value.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        TesseraError::Config(message.into())
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        TesseraError::Validation(message.into())
    }

    /// Creates a schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        TesseraError::InvalidSchema(message.into())
    }

    /// Creates a timeout error.
    pub fn timeout(duration: Duration, operation: impl Into<String>) -> Self {
        TesseraError::Timeout {
            duration,
            operation: operation.into(),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(field: impl Into<String>, expected: DataType, found: &'static str) -> Self {
        TesseraError::TypeMismatch {
            field: field.into(),
            expected,
            found,
        }
    }

    /// Creates an invalid choice error.
    pub fn invalid_choice(field: impl Into<String>, value: impl Into<String>) -> Self {
        TesseraError::InvalidChoice {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        TesseraError::InvalidFormat {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unexpected response error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        TesseraError::UnexpectedResponse(message.into())
    }

    /// Returns the status code if this error is a non-success HTTP response.
    #[must_use]
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            TesseraError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for the two outcomes of a criteria lookup that did not
    /// resolve to exactly one record.
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            TesseraError::DoesNotExist { .. } | TesseraError::MultipleResults { .. }
        )
    }

    /// Returns true if this error came from validating a value or a declaration.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TesseraError::TypeMismatch { .. }
                | TesseraError::InvalidChoice { .. }
                | TesseraError::InvalidFormat { .. }
                | TesseraError::RegexCompile { .. }
                | TesseraError::UnknownField { .. }
                | TesseraError::Validation(_)
        )
    }

    /// Sanitizes an error message to remove any occurrence of the API token.
    ///
    /// # Returns
    ///
    /// The message with any occurrence of the token replaced with `[REDACTED]`
    #[must_use]
    pub fn sanitize_message(message: &str, api_token: &str) -> String {
        if api_token.is_empty() {
            return message.to_string();
        }
        message.replace(api_token, "[REDACTED]")
    }

    /// Creates a sanitized version of this error's display message.
    #[must_use]
    pub fn sanitized_display(&self, api_token: &str) -> String {
        Self::sanitize_message(&self.to_string(), api_token)
    }
}
