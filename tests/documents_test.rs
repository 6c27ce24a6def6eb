mod common;

use axum::{
    body,
    http::{Method, StatusCode},
};
use serde_json::{json, Value};
use uuid::Uuid;

use common::{data_id, error_fields, read_json, Part, TestApp};

async fn seeded_order(app: &TestApp) -> Uuid {
    let parties = app.seed_parties().await;
    let order = app.create_order(parties.order_form("PO-DOC-1")).await;
    order["id"].as_str().unwrap().parse().unwrap()
}

async fn upload(app: &TestApp, order_id: Uuid, file_name: &str, bytes: &[u8]) -> axum::response::Response {
    app.post_multipart(
        &format!("/api/v1/orders/{}/documents", order_id),
        &[Part::File {
            name: "file",
            file_name,
            content_type: "application/pdf",
            bytes,
        }],
    )
    .await
}

#[tokio::test]
async fn uploaded_document_is_listed_and_served() {
    let app = TestApp::new().await;
    let order_id = seeded_order(&app).await;

    let response = upload(&app, order_id, "invoice.pdf", b"invoice bytes").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let document = read_json(response).await["data"].clone();
    assert_eq!(document["name"], "invoice.pdf");
    assert_eq!(document["file_url"], format!("{}/invoice.pdf", order_id));
    assert_eq!(
        document["public_url"],
        format!("/files/{}/invoice.pdf", order_id)
    );

    let listed = read_json(
        app.request_authenticated(
            Method::GET,
            &format!("/api/v1/orders/{}/documents", order_id),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    let response = app
        .request(
            Method::GET,
            document["public_url"].as_str().unwrap(),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let served = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&served[..], b"invoice bytes");
}

#[tokio::test]
async fn same_file_name_gets_a_numbered_suffix() {
    let app = TestApp::new().await;
    let order_id = seeded_order(&app).await;

    upload(&app, order_id, "invoice.pdf", b"first").await;
    let second = read_json(upload(&app, order_id, "invoice.pdf", b"second").await).await;
    assert_eq!(second["data"]["name"], "invoice_2.pdf");

    let dir = app.storage_dir.path().join(order_id.to_string());
    assert_eq!(std::fs::read(dir.join("invoice.pdf")).unwrap(), b"first");
    assert_eq!(std::fs::read(dir.join("invoice_2.pdf")).unwrap(), b"second");
}

#[tokio::test]
async fn path_segments_in_file_names_are_dropped() {
    let app = TestApp::new().await;
    let order_id = seeded_order(&app).await;

    let body = read_json(upload(&app, order_id, "../../secrets.pdf", b"x").await).await;
    assert_eq!(body["data"]["name"], "secrets.pdf");
    assert!(app
        .storage_dir
        .path()
        .join(order_id.to_string())
        .join("secrets.pdf")
        .exists());
}

#[tokio::test]
async fn rename_keeps_the_stored_path() {
    let app = TestApp::new().await;
    let order_id = seeded_order(&app).await;
    let uploaded = read_json(upload(&app, order_id, "bl.pdf", b"bl").await).await;
    let document_id = data_id(&uploaded);

    let response = app
        .request_authenticated(
            Method::PATCH,
            &format!("/api/v1/documents/{}", document_id),
            Some(json!({ "name": "Bill of lading (signed).pdf" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let renamed = read_json(response).await;
    assert_eq!(renamed["data"]["name"], "Bill of lading (signed).pdf");
    assert_eq!(renamed["data"]["file_url"], uploaded["data"]["file_url"]);

    let response = app
        .request_authenticated(
            Method::PATCH,
            &format!("/api/v1/documents/{}", document_id),
            Some(json!({ "name": "  " })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_fields(&read_json(response).await), vec!["name"]);
}

#[tokio::test]
async fn deleting_a_document_removes_record_and_object() {
    let app = TestApp::new().await;
    let order_id = seeded_order(&app).await;
    let uploaded = read_json(upload(&app, order_id, "bl.pdf", b"bl").await).await;
    let document_id = data_id(&uploaded);

    let response = app
        .request_authenticated(
            Method::DELETE,
            &format!("/api/v1/documents/{}", document_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!app
        .storage_dir
        .path()
        .join(order_id.to_string())
        .join("bl.pdf")
        .exists());

    let listed: Value = read_json(
        app.request_authenticated(
            Method::GET,
            &format!("/api/v1/orders/{}/documents", order_id),
            None,
        )
        .await,
    )
    .await;
    assert!(listed["data"].as_array().unwrap().is_empty());

    let response = app
        .request_authenticated(
            Method::DELETE,
            &format!("/api/v1/documents/{}", document_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bad_uploads_are_rejected() {
    let app = TestApp::new().await;
    let order_id = seeded_order(&app).await;

    let response = upload(&app, order_id, "empty.pdf", b"").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let too_big = vec![b'x'; 64 * 1024 + 1];
    let response = upload(&app, order_id, "big.pdf", &too_big).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = upload(&app, Uuid::new_v4(), "orphan.pdf", b"data").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .post_multipart(
            &format!("/api/v1/orders/{}/documents", order_id),
            &[Part::Json {
                name: "note",
                value: json!("no file here"),
            }],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_fields(&read_json(response).await), vec!["file"]);
}

#[tokio::test]
async fn reserved_characters_in_names_still_resolve() {
    let app = TestApp::new().await;
    let order_id = seeded_order(&app).await;

    let uploaded = read_json(upload(&app, order_id, "invoice #3.pdf", b"third").await).await;
    assert_eq!(uploaded["data"]["name"], "invoice #3.pdf");
    let url = uploaded["data"]["public_url"].as_str().unwrap().to_string();
    assert_eq!(url, format!("/files/{}/invoice%20%233.pdf", order_id));

    let response = app.request(Method::GET, &url, None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let served = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&served[..], b"third");
}

#[tokio::test]
async fn long_names_uploaded_twice_are_both_stored() {
    let app = TestApp::new().await;
    let order_id = seeded_order(&app).await;
    let name = format!("{}.pdf", "a".repeat(251));

    let response = upload(&app, order_id, &name, b"first").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = upload(&app, order_id, &name, b"second").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let second = read_json(response).await;
    let stored = second["data"]["name"].as_str().unwrap();
    assert_eq!(stored.len(), 255);
    assert!(stored.ends_with("_2.pdf"));
    let dir = app.storage_dir.path().join(order_id.to_string());
    assert_eq!(std::fs::read(dir.join(stored)).unwrap(), b"second");
}
