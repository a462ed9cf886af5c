//! HTTP client for the platform REST API.
//!
//! This module provides `ApiClient`, the reqwest-backed implementation of
//! [`Transport`]. It authenticates every request with the agent email and
//! API token, applies the configured timeout and turns non-success
//! responses into `TesseraError::HttpStatus`.
//!
//! There is no retry logic: every remote failure is returned to the caller
//! as-is.
//!
//! # Security
//!
//! The API token is never logged. Error bodies are sanitized before they
//! are stored in an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;

use crate::config::Config;
use crate::error::TesseraError;
use crate::transport::Transport;

/// Maximum length for HTTP error response bodies kept in errors.
const MAX_ERROR_BODY_LEN: usize = 2000;

/// Path used for the connectivity check.
const CONNECTION_TEST_PATH: &str = "/custom_objects";

/// HTTP client for the platform API.
///
/// # Example
///
/// ```ignore
/// let config = Config::from_env()?;
/// let client = ApiClient::new(&config)?;
///
/// let body = client.get("/custom_objects/ticket/records", &[]).await?;
/// ```
#[derive(Clone)]
pub struct ApiClient {
    /// The underlying HTTP client (cloning is cheap).
    http: Client,

    /// Base URL for the API, without trailing slash.
    base_url: String,

    /// User name for basic auth (`{email}/token`).
    username: String,

    /// API token for authentication.
    /// SECURITY: Never log this value!
    api_token: String,

    /// Timeout applied to each request.
    timeout: Duration,
}

impl ApiClient {
    /// Creates a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `TesseraError::HttpClient` if the HTTP client fails to initialize.
    pub fn new(config: &Config) -> Result<Self, TesseraError> {
        let http = Client::builder()
            .build()
            .map_err(TesseraError::HttpClient)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: format!("{}/token", config.email),
            api_token: config.api_token().to_string(),
            timeout: config.timeout,
        })
    }

    /// Returns a copy of this client that uses a different timeout.
    ///
    /// The copy shares the connection pool with the original.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    /// Returns the timeout applied to each request.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Tests connectivity to the platform.
    ///
    /// Lists custom objects as a cheap authenticated call.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if the call fails.
    pub async fn test_connection(&self) -> Result<Vec<String>, TesseraError> {
        tracing::debug!("Testing connection to platform API");

        let body = self.get(CONNECTION_TEST_PATH, &[]).await?;
        let keys = body
            .get("custom_objects")
            .and_then(Value::as_array)
            .map(|objects| {
                objects
                    .iter()
                    .filter_map(|o| o.get("key").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        tracing::info!("Connection test successful");
        Ok(keys)
    }

    /// Starts an authenticated request for `path`.
    fn builder(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);

        tracing::debug!(
            method = %method,
            path = %path,
            "Making API request"
        );

        self.http
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.api_token))
            .header("Accept", "application/json")
            .timeout(self.timeout)
    }

    /// Sends a request and returns the raw response, mapping transport
    /// failures and non-success statuses to errors.
    async fn send(
        &self,
        req: RequestBuilder,
        operation: String,
    ) -> Result<reqwest::Response, TesseraError> {
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                return TesseraError::timeout(self.timeout, operation.clone());
            }
            TesseraError::Http(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.handle_http_error(status, response).await);
        }

        Ok(response)
    }

    /// Sends a request and decodes the JSON body. An empty body decodes to `null`.
    async fn send_json(&self, req: RequestBuilder, operation: String) -> Result<Value, TesseraError> {
        let response = self.send(req, operation).await?;
        let body = response.text().await.map_err(TesseraError::Http)?;

        tracing::trace!(body = %body, "API response");

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(TesseraError::Serialization)
    }

    /// Converts a non-success response into `TesseraError::HttpStatus`.
    async fn handle_http_error(&self, status: StatusCode, response: reqwest::Response) -> TesseraError {
        let body = response.text().await.unwrap_or_default();
        let body = TesseraError::sanitize_message(&body, &self.api_token);
        let body = if body.len() > MAX_ERROR_BODY_LEN {
            let mut end = MAX_ERROR_BODY_LEN;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...[truncated]", &body[..end])
        } else {
            body
        };

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            tracing::warn!(status = %status, "Platform API returned an error status");
        }

        TesseraError::HttpStatus { status, body }
    }

    async fn send_with_body(&self, method: Method, path: &str, body: &Value) -> Result<Value, TesseraError> {
        let operation = format!("{} {}", method, path);
        let req = self.builder(method, path).json(body);
        self.send_json(req, operation).await
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, TesseraError> {
        let operation = format!("GET {}", path);
        let mut req = self.builder(Method::GET, path);
        if !params.is_empty() {
            req = req.query(params);
        }
        self.send_json(req, operation).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, TesseraError> {
        self.send_with_body(Method::POST, path, body).await
    }

    async fn patch(&self, path: &str, body: &Value) -> Result<Value, TesseraError> {
        self.send_with_body(Method::PATCH, path, body).await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value, TesseraError> {
        self.send_with_body(Method::PUT, path, body).await
    }

    async fn delete(&self, path: &str) -> Result<StatusCode, TesseraError> {
        let operation = format!("DELETE {}", path);
        let req = self.builder(Method::DELETE, path);
        let response = self.send(req, operation).await?;
        Ok(response.status())
    }

    async fn upload(&self, filename: &str, content: &[u8]) -> Result<Value, TesseraError> {
        let operation = format!("POST /uploads ({} bytes)", content.len());
        let req = self
            .builder(Method::POST, "/uploads")
            .query(&[("filename", filename)])
            .header("Content-Type", "application/binary")
            .body(content.to_vec());
        self.send_json(req, operation).await
    }
}
