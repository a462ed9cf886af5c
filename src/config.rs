//! Configuration management for tessera.
//!
//! This module handles loading connection settings from environment
//! variables, with validation to ensure all required values are present.

use std::env;
use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::TesseraError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for connecting to the platform API.
///
/// The API token is stored but never logged or exposed in error messages;
/// the `Debug` implementation redacts it.
#[derive(Clone)]
pub struct Config {
    /// Base URL of the API (e.g., `https://acme.example.com/api/v2`).
    pub base_url: String,

    /// Agent email used for token authentication.
    pub email: String,

    /// API token. This value must never be logged or included in error messages.
    api_token: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl Config {
    /// Builds a configuration from explicit values.
    ///
    /// # Errors
    ///
    /// Returns `TesseraError::Config` if the base URL or token fail validation.
    pub fn new(
        base_url: impl Into<String>,
        email: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Result<Self, TesseraError> {
        let base_url = Self::validate_base_url(base_url.into())?;
        let api_token = api_token.into();
        Self::validate_api_token(&api_token)?;

        Ok(Config {
            base_url,
            email: email.into(),
            api_token,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Loads configuration from environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `TESSERA_BASE_URL`: API base URL
    /// - `TESSERA_EMAIL`: agent email used for authentication
    /// - `TESSERA_API_TOKEN`: API token
    ///
    /// # Optional
    ///
    /// - `TESSERA_TIMEOUT_SECS`: request timeout in seconds (default 10)
    ///
    /// # Errors
    ///
    /// Returns `TesseraError::Config` if any required variable is missing
    /// or if values fail validation.
    pub fn from_env() -> Result<Self, TesseraError> {
        let base_url = Self::get_required_env("TESSERA_BASE_URL")?;
        let email = Self::get_required_env("TESSERA_EMAIL")?;
        let api_token = Self::get_required_env("TESSERA_API_TOKEN")?;

        let mut config = Self::new(base_url, email, api_token)?;

        if let Ok(raw) = env::var("TESSERA_TIMEOUT_SECS") {
            config.timeout = Self::parse_timeout(&raw)?;
        }

        Ok(config)
    }

    /// Returns the API token. Only the transport should call this.
    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    /// Replaces the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Gets a required environment variable, returning an error if missing or empty.
    fn get_required_env(name: &str) -> Result<String, TesseraError> {
        env::var(name)
            .map_err(|_| TesseraError::missing_env(name))
            .and_then(|value| {
                if value.trim().is_empty() {
                    Err(TesseraError::missing_env(name))
                } else {
                    Ok(value)
                }
            })
    }

    /// Validates and normalizes the base URL.
    fn validate_base_url(url: String) -> Result<String, TesseraError> {
        let url = url.trim().trim_end_matches('/').to_string();

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(TesseraError::invalid_config(
                "TESSERA_BASE_URL must start with http:// or https://",
            ));
        }

        let parsed = Url::parse(&url).map_err(|e| {
            TesseraError::invalid_config(format!("TESSERA_BASE_URL is not a valid URL: {}", e))
        })?;
        if parsed.host_str().is_none() {
            return Err(TesseraError::invalid_config(
                "TESSERA_BASE_URL must include a host",
            ));
        }

        Ok(url)
    }

    /// Validates the API token is not a placeholder value.
    fn validate_api_token(token: &str) -> Result<(), TesseraError> {
        if token.trim().is_empty() {
            return Err(TesseraError::missing_env("TESSERA_API_TOKEN"));
        }

        let token_lower = token.to_lowercase();
        let placeholder_patterns = [
            "your_api_token",
            "your_token",
            "placeholder",
            "xxx",
            "changeme",
        ];

        for pattern in placeholder_patterns {
            if token_lower.contains(pattern) {
                return Err(TesseraError::invalid_config(
                    "TESSERA_API_TOKEN appears to be a placeholder value",
                ));
            }
        }

        Ok(())
    }

    fn parse_timeout(raw: &str) -> Result<Duration, TesseraError> {
        match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(TesseraError::invalid_config(
                "TESSERA_TIMEOUT_SECS must be a positive number of seconds",
            )),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("api_token", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}
