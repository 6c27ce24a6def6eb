mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use futures::StreamExt;
use serde_json::json;

use common::{data_id, error_fields, read_json, TestApp, ADMIN_EMAIL, ADMIN_PASSWORD};

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::new().await;

    for uri in ["/api/v1/orders", "/api/v1/suppliers", "/api/v1/dashboard"] {
        let response = app.request(Method::GET, uri, None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }

    let response = app
        .request(Method::GET, "/api/v1/orders", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.request(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn sign_in_returns_a_working_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/sign-in",
            Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let token = body["data"]["access_token"]
        .as_str()
        .expect("access token")
        .to_string();
    assert_eq!(body["data"]["user"]["role"], "admin");

    let session = read_json(
        app.request(Method::GET, "/api/v1/auth/session", None, Some(&token))
            .await,
    )
    .await;
    assert_eq!(session["data"]["user"]["email"], ADMIN_EMAIL);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/sign-in",
            Some(json!({ "email": ADMIN_EMAIL, "password": "nope-nope" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sign_up_validates_and_creates_operator() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/sign-up",
            Some(json!({ "name": "Ana", "email": "ana", "password": "123" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let mut fields = error_fields(&read_json(response).await);
    fields.sort();
    assert_eq!(fields, vec!["email", "password"]);

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/sign-up",
            Some(json!({ "name": "Ana", "email": "Ana@Example.com", "password": "s3cret-pass" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["data"]["user"]["email"], "ana@example.com");
    assert_eq!(body["data"]["user"]["role"], "operator");

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/sign-up",
            Some(json!({ "name": "Ana again", "email": "ana@example.com", "password": "s3cret-pass" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn signed_out_token_is_revoked() {
    let app = TestApp::new().await;
    let token = app.operator_token().await;

    let response = app
        .request(Method::GET, "/api/v1/orders", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::POST, "/api/v1/auth/sign-out", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(Method::GET, "/api/v1/orders", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_management_is_admin_only() {
    let app = TestApp::new().await;
    let operator = app.operator_token().await;

    let response = app
        .request(Method::GET, "/api/v1/users", None, Some(&operator))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "name": "Bruno",
                "email": "bruno@shiptrack.test",
                "password": "bruno-pass",
                "role": "admin"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json(response).await;
    let bruno_id = data_id(&created);
    assert_eq!(created["data"]["role"], "admin");
    assert!(created["data"].get("password_hash").is_none());

    let listed = read_json(
        app.request_authenticated(Method::GET, "/api/v1/users", None)
            .await,
    )
    .await;
    let emails: Vec<&str> = listed["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["email"].as_str().unwrap())
        .collect();
    assert!(emails.contains(&"bruno@shiptrack.test"));
    assert!(emails.contains(&ADMIN_EMAIL));

    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/users/{}", bruno_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn admin_cannot_delete_own_account() {
    let app = TestApp::new().await;
    let session = read_json(
        app.request_authenticated(Method::GET, "/api/v1/auth/session", None)
            .await,
    )
    .await;
    let admin_id = session["data"]["user"]["user_id"].as_str().unwrap().to_string();

    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/users/{}", admin_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_stream_delivers_sign_out_then_closes() {
    let app = TestApp::new().await;
    let token = app.operator_token().await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/auth/session/events", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let mut stream = response.into_body().into_data_stream();

    let response = app
        .request(Method::POST, "/api/v1/auth/sign-out", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let mut received = String::new();
    while !received.contains("event: signed_out") {
        let chunk = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("event within timeout")
            .expect("stream still open")
            .expect("readable chunk");
        received.push_str(&String::from_utf8_lossy(&chunk));
    }

    app.state.sessions.shutdown();
    loop {
        let next = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("stream ends within timeout");
        match next {
            Some(chunk) => received.push_str(&String::from_utf8_lossy(&chunk.expect("chunk"))),
            None => break,
        }
    }
    assert!(received.contains("event: closed"));

    let response = app
        .request_authenticated(Method::GET, "/api/v1/auth/session/events", None)
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn operator_stream_only_carries_its_own_session() {
    let app = TestApp::new().await;
    let token = app.operator_token().await;

    let response = app
        .request(Method::GET, "/api/v1/auth/session/events", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let mut stream = response.into_body().into_data_stream();

    // another account signs up and in while the stream is open
    app.operator_token().await;

    let response = app
        .request(Method::POST, "/api/v1/auth/sign-out", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let mut received = String::new();
    loop {
        let next = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("stream ends after own sign-out");
        match next {
            Some(chunk) => received.push_str(&String::from_utf8_lossy(&chunk.expect("chunk"))),
            None => break,
        }
    }

    assert!(received.contains("event: signed_out"));
    assert!(!received.contains("event: signed_in"));
    assert!(!received.contains("event: user_created"));
    assert!(!received.contains("@shiptrack.test"));
}
