//! Shared fixtures for the HTTP tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use tessera::fields::{Choices, Field};
use tessera::{ApiClient, Config, EntityType};
use wiremock::MockServer;

pub const EMAIL: &str = "agent@acme.test";
pub const TOKEN: &str = "tok_integration_secret";

/// A mock platform and a client pointed at it.
pub async fn setup() -> (MockServer, Arc<ApiClient>) {
    let server = MockServer::start().await;
    let config = Config::new(server.uri(), EMAIL, TOKEN).expect("mock server config");
    let client = ApiClient::new(&config).expect("client");
    (server, Arc::new(client))
}

pub fn customer_type() -> Arc<EntityType> {
    EntityType::builder("Customer")
        .field(Field::text("codigo"))
        .field(Field::checkbox("ativo"))
        .field(Field::datetime("contato_em"))
        .field(Field::dropdown(
            "status",
            Choices::from_pairs([("open", "Open"), ("closed", "Closed")]),
        ))
        .field(Field::attachment("contrato"))
        .build()
        .expect("customer type")
}

pub fn record(id: &str, name: &str, fields: Value) -> Value {
    json!({
        "id": id,
        "name": name,
        "custom_object_fields": fields,
        "created_at": "2023-07-15T10:30:45Z",
        "updated_at": "2023-07-16T15:20:33Z",
        "created_by_user_id": "10001",
        "updated_by_user_id": "10001",
        "external_id": null
    })
}

pub fn upload_body() -> Value {
    json!({
        "upload": {
            "attachment": {
                "id": 498,
                "file_name": "report.pdf",
                "content_url": "https://files.example.com/498/report.pdf",
                "size": 11
            },
            "token": "tok_abc"
        }
    })
}
