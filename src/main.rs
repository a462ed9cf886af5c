//! Tessera connectivity check
//!
//! Loads the configuration, authenticates against the platform and lists
//! the custom object types the account can see.
//!
//! # Configuration
//!
//! Set the following environment variables (or use a `.env` file):
//!
//! - `TESSERA_BASE_URL`: API base URL
//! - `TESSERA_EMAIL`: Agent email
//! - `TESSERA_API_TOKEN`: API token
//!
//! # Usage
//!
//! ```bash
//! TESSERA_BASE_URL=https://acme.example.com/api/v2 TESSERA_EMAIL=agent@acme.test \
//!     TESSERA_API_TOKEN=<token> ./tessera
//! ```

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use tessera::{api_client::ApiClient, config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore errors if not found)
    dotenvy::dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tessera=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting tessera v{}", env!("CARGO_PKG_VERSION"));

    let config = config::Config::from_env().context("Failed to load configuration")?;

    tracing::debug!("Configuration loaded, base_url: {}", config.base_url);

    let client = ApiClient::new(&config).context("Failed to create API client")?;

    tracing::info!("Testing connection to the platform...");
    let keys = client
        .test_connection()
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "Connection test failed");
        })
        .context("Connection test failed")?;

    if keys.is_empty() {
        tracing::warn!("Connected, but no custom objects are visible to this account");
    }
    for key in &keys {
        println!("{}", key);
    }

    tracing::info!(count = keys.len(), "Connection OK");

    Ok(())
}
