mod common;

use axum::http::{Method, StatusCode};
use rstest::rstest;
use serde_json::json;

use common::{data_id, error_fields, read_json, TestApp};

#[rstest]
#[case("suppliers")]
#[case("carriers")]
#[case("destinations")]
#[tokio::test]
async fn created_record_is_found_once_by_search(#[case] collection: &str) {
    let app = TestApp::new().await;
    app.create_reference(collection, "Acme Logistics").await;
    app.create_reference(collection, "Other Party").await;

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/{}?search=acme", collection),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    let rows = body["data"].as_array().expect("list payload");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Acme Logistics");
}

#[tokio::test]
async fn lists_are_sorted_by_name() {
    let app = TestApp::new().await;
    for name in ["Zeta", "alpha", "Mu"] {
        app.create_reference("suppliers", name).await;
    }

    let body = read_json(
        app.request_authenticated(Method::GET, "/api/v1/suppliers", None)
            .await,
    )
    .await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Mu", "Zeta", "alpha"]);
}

#[tokio::test]
async fn blank_email_is_accepted_and_invalid_email_rejected() {
    let app = TestApp::new().await;
    let created = read_json(
        app.request_authenticated(
            Method::POST,
            "/api/v1/suppliers",
            Some(json!({ "name": "Acme", "email": "" })),
        )
        .await,
    )
    .await;
    let id = data_id(&created);
    assert!(created["data"]["email"].is_null());

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/suppliers/{}", id),
            Some(json!({ "name": "Acme", "email": "  ", "country": "China" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json(response).await;
    assert_eq!(updated["data"]["country"], "China");

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/suppliers/{}", id),
            Some(json!({ "name": "Acme", "email": "not-an-email" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json(response).await;
    assert_eq!(error_fields(&body), vec!["email"]);
}

#[tokio::test]
async fn missing_name_is_a_field_error() {
    let app = TestApp::new().await;
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/carriers",
            Some(json!({ "name": "   " })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_fields(&read_json(response).await), vec!["name"]);
}

#[tokio::test]
async fn delete_requires_confirmation_then_removes_record() {
    let app = TestApp::new().await;
    let id = app.create_reference("destinations", "Port of Santos").await;
    let uri = format!("/api/v1/destinations/{}", id);

    let response = app.request_authenticated(Method::DELETE, &uri, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_authenticated(Method::DELETE, &format!("{}?confirm=true", uri), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.request_authenticated(Method::GET, &uri, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = read_json(
        app.request_authenticated(Method::GET, "/api/v1/destinations", None)
            .await,
    )
    .await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn referenced_supplier_cannot_be_deleted() {
    let app = TestApp::new().await;
    let parties = app.seed_parties().await;
    app.create_order(parties.order_form("PO-REF-1")).await;

    let response = app
        .request_authenticated(
            Method::DELETE,
            &format!("/api/v1/suppliers/{}?confirm=true", parties.supplier_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json(response).await;
    assert_eq!(
        body["message"],
        "This record is referenced by other records or references a missing record"
    );

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/suppliers/{}", parties.supplier_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn carrier_stats_count_transports() {
    let app = TestApp::new().await;
    let parties = app.seed_parties().await;
    let mut form = parties.order_form("PO-STAT-1");
    form["status"] = json!("in_transit");
    app.create_order(form).await;
    app.create_order(parties.order_form("PO-STAT-2")).await;

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/carriers/{}/stats", parties.carrier_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["total_transports"], 2);
    assert_eq!(body["data"]["active_transports"], 1);
}

#[tokio::test]
async fn container_types_are_seeded() {
    let app = TestApp::new().await;
    let body = read_json(
        app.request_authenticated(Method::GET, "/api/v1/container-types", None)
            .await,
    )
    .await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert!(names.contains(&"40ft HC"));
    assert!(names.contains(&"20ft"));
}
