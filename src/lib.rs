//! # Tessera
//!
//! Tessera maps the "custom object" records of a hosted ticketing platform
//! onto typed local entities.
//!
//! Each entity type declares its fields once. The fields validate every
//! assignment, translate values to and from the platform's JSON wire
//! format, and describe themselves as schema definitions. A small query
//! layer fetches records and evaluates equality filters in memory.
//!
//! ## Features
//!
//! - **Typed fields**: text, textarea, checkbox, integer, decimal, date,
//!   datetime, regexp, dropdown, multiselect, lookup, attachment and the
//!   record name
//! - **Records**: create, update, delete, and fetch by id
//! - **Queries**: `filter`, `get_by`, `all` and `last`
//! - **Attachments**: upload files and attach them to tickets
//! - **Security**: the API token is never logged or exposed in error messages
//!
//! ## Architecture
//!
//! - [`config`] - Configuration loading from environment variables
//! - [`error`] - Error types with security-conscious message sanitization
//! - [`transport`] - The HTTP capability the record layer is written against
//! - [`api_client`] - reqwest implementation of [`Transport`]
//! - [`fields`] - Field descriptors
//! - [`entity`] - Entity types and records
//! - [`query`] / [`manager`] - Queries and record management
//! - [`attachment`] - Uploaded files
//! - [`models`] - Values and wire envelopes
//!
//! ## Configuration
//!
//! - `TESSERA_BASE_URL`: API base URL, e.g. `https://acme.example.com/api/v2`
//! - `TESSERA_EMAIL`: Agent email used for token authentication
//! - `TESSERA_API_TOKEN`: API token
//!
//! Optional:
//! - `TESSERA_TIMEOUT_SECS`: Request timeout in seconds (default 10)
//! - `RUST_LOG`: Log level (e.g., `tessera=debug`)
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tessera::fields::{Choices, Field};
//! use tessera::query::Criteria;
//! use tessera::{ApiClient, Config, EntityType, Value};
//!
//! async fn example() -> Result<(), tessera::TesseraError> {
//!     let config = Config::from_env()?;
//!     let client = Arc::new(ApiClient::new(&config)?);
//!
//!     let customer = EntityType::builder("Customer")
//!         .field(Field::text("codigo"))
//!         .field(Field::checkbox("ativo"))
//!         .field(Field::dropdown("status", Choices::from_labels(["Open", "Closed"])))
//!         .build()?;
//!     let customers = customer.manager(client);
//!
//!     let created = customers
//!         .create([("name", Value::from("Acme")), ("codigo", Value::from("1234"))])
//!         .await?;
//!     println!("created {:?}", created.id());
//!
//!     let active = customers.filter(&Criteria::new().eq("ativo", true)).await?;
//!     for record in active {
//!         println!("{}", record.to_representation());
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod api_client;
pub mod attachment;
pub mod config;
pub mod entity;
pub mod error;
pub mod fields;
pub mod manager;
pub mod models;
pub mod query;
pub mod transport;

pub use api_client::ApiClient;
pub use attachment::{Attachment, ParentResource};
pub use config::Config;
pub use entity::{Entity, EntityType, Lifecycle};
pub use error::TesseraError;
pub use fields::Field;
pub use manager::RecordManager;
pub use models::{Related, Value};
pub use transport::Transport;
