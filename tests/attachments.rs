//! Attachment upload, attach-to-ticket and detail lookup against a mock platform.

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use tessera::{Attachment, ParentResource, TesseraError, Value};
use tokio_test::assert_ok;
use wiremock::matchers::{body_bytes, body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use common::{customer_type, setup, upload_body};

#[tokio::test]
async fn test_save_uploads_once() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/uploads"))
        .and(query_param("filename", "report.pdf"))
        .and(header("content-type", "application/binary"))
        .and(body_bytes(b"hello world".to_vec()))
        .respond_with(ResponseTemplate::new(201).set_body_json(upload_body()))
        .expect(1)
        .mount(&server)
        .await;

    let mut attachment = Attachment::from_content(b"hello world".to_vec(), Some("report.pdf"));
    assert!(!attachment.is_saved());

    assert_ok!(attachment.save(&*client).await);
    assert_ok!(attachment.save(&*client).await);

    assert!(attachment.is_saved());
    assert_eq!(attachment.id(), Some("498"));
    assert_eq!(attachment.token(), Some("tok_abc"));
    assert_eq!(attachment.url(), Some("https://files.example.com/498/report.pdf"));
    assert_eq!(attachment.size(), Some(11));
}

#[tokio::test]
async fn test_save_without_content() {
    let (_server, client) = setup().await;

    let mut attachment = Attachment::new();
    let err = attachment.save(&*client).await.unwrap_err();
    assert!(matches!(err, TesseraError::MissingContent { .. }));
}

#[tokio::test]
async fn test_save_with_parent_attaches_to_ticket() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/uploads"))
        .respond_with(ResponseTemplate::new(201).set_body_json(upload_body()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/tickets/35436"))
        .and(body_json(json!({
            "ticket": {"comment": {"body": "Attachment added.", "uploads": ["tok_abc"]}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ticket": {"id": 35436}})))
        .expect(1)
        .mount(&server)
        .await;

    let mut attachment = Attachment::from_content(b"hello world".to_vec(), Some("report.pdf"));
    let response = attachment
        .save_with_ticket(&*client, "35436", None)
        .await
        .unwrap();
    assert_eq!(response, json!({"ticket": {"id": 35436}}));
}

#[tokio::test]
async fn test_save_with_parent_custom_comment() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/uploads"))
        .respond_with(ResponseTemplate::new(201).set_body_json(upload_body()))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/requests/12"))
        .and(body_json(json!({
            "request": {"comment": {"body": "Signed contract", "uploads": ["tok_abc"]}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let mut attachment = Attachment::from_content(b"pdf".to_vec(), None);
    let parent = ParentResource::new("requests", "request");
    assert_ok!(
        attachment
            .save_with_parent(&*client, &parent, "12", Some("Signed contract"))
            .await
    );
}

#[tokio::test]
async fn test_fetch_details() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/attachments/498"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "attachment": {
                "id": 498,
                "file_name": "report.pdf",
                "content_url": "https://files.example.com/498/report.pdf",
                "size": 2048
            }
        })))
        .mount(&server)
        .await;

    let attachment = Attachment::fetch(&*client, "498").await.unwrap();
    assert!(attachment.is_saved());
    assert_eq!(attachment.filename(), "report.pdf");
    assert_eq!(attachment.size(), Some(2048));
    assert_eq!(attachment.token(), None);
}

#[tokio::test]
async fn test_entity_attachment_field_upload() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/uploads"))
        .respond_with(ResponseTemplate::new(201).set_body_json(upload_body()))
        .expect(1)
        .mount(&server)
        .await;

    let mut entity = customer_type().new_entity();
    entity
        .set(
            "contrato",
            Attachment::from_content(b"hello world".to_vec(), Some("report.pdf")),
        )
        .unwrap();
    assert_eq!(entity.to_wire().get("contrato_id"), Some(&json!(null)));

    let attachment = entity.attachment_mut("contrato").unwrap().unwrap();
    attachment.save(&*client).await.unwrap();

    let wire = entity.to_wire();
    assert_eq!(wire.get("contrato_id"), Some(&json!("498")));
    assert_eq!(wire.get("contrato_filename"), Some(&json!("report.pdf")));
    match entity.get("contrato").unwrap() {
        Some(Value::Attachment(a)) => assert!(a.is_saved()),
        other => panic!("expected attachment, got {:?}", other),
    }
}
