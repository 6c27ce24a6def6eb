#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use bytes::Bytes;
use serde_json::{json, Value};
use shiptrack_api::{
    app_router,
    auth::{session::SessionHub, SignInRequest, SignUpRequest},
    config::AppConfig,
    db::{self, DbConfig},
    events::{self, EventSender},
    storage::{FilesystemStorage, ObjectStorage, StorageError},
    AppState,
};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "a8Fq2LmZ7xR4pT9vW1cN6bY3kD5hJ0sG";
pub const ADMIN_EMAIL: &str = "admin@shiptrack.test";
pub const ADMIN_PASSWORD: &str = "admin-pass-123";
const MULTIPART_BOUNDARY: &str = "shiptrack-test-boundary";

/// Storage backend that refuses every write.
#[derive(Debug, Default)]
pub struct FailingStorage;

#[async_trait]
impl ObjectStorage for FailingStorage {
    async fn put_new(&self, _path: &str, _bytes: Bytes) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("storage offline".into()))
    }

    async fn delete(&self, _path: &str) -> Result<bool, StorageError> {
        Ok(false)
    }

    async fn exists(&self, _path: &str) -> Result<bool, StorageError> {
        Ok(false)
    }
}

/// One part of a multipart request body.
pub enum Part<'a> {
    Json { name: &'a str, value: Value },
    File { name: &'a str, file_name: &'a str, content_type: &'a str, bytes: &'a [u8] },
}

/// Helper harness running the full router over an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub storage_dir: TempDir,
    admin_token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(|_| {}, None).await
    }

    /// Test application with adjusted configuration.
    pub async fn with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        Self::build(customize, None).await
    }

    /// Test application writing documents to the given backend.
    pub async fn with_storage(storage: Arc<dyn ObjectStorage>) -> Self {
        Self::build(|_| {}, Some(storage)).await
    }

    async fn build(
        customize: impl FnOnce(&mut AppConfig),
        storage: Option<Arc<dyn ObjectStorage>>,
    ) -> Self {
        let storage_dir = TempDir::new().expect("create storage dir");

        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            "test".to_string(),
        );
        cfg.storage.root_dir = storage_dir.path().to_string_lossy().into_owned();
        cfg.storage.max_upload_bytes = 64 * 1024;
        customize(&mut cfg);

        let pool = db::establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(events::EVENT_CHANNEL_CAPACITY);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let storage = storage
            .unwrap_or_else(|| Arc::new(FilesystemStorage::new(cfg.storage.root_path())));

        let state = AppState::new(
            Arc::new(pool),
            cfg,
            event_sender,
            storage,
            SessionHub::init(),
        );

        state
            .services
            .users
            .ensure_admin(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .expect("bootstrap admin");
        let admin_token = state
            .auth
            .sign_in(SignInRequest {
                email: ADMIN_EMAIL.to_string(),
                password: ADMIN_PASSWORD.to_string(),
            })
            .await
            .expect("admin sign in")
            .token
            .access_token;

        let router = app_router(state.clone());

        Self {
            router,
            state,
            storage_dir,
            admin_token,
            _event_task: event_task,
        }
    }

    /// Bearer token of the bootstrap admin.
    pub fn token(&self) -> &str {
        &self.admin_token
    }

    /// Signs up a fresh operator and returns its bearer token.
    pub async fn operator_token(&self) -> String {
        let email = format!("operator-{}@shiptrack.test", Uuid::new_v4().simple());
        self.state
            .auth
            .sign_up(SignUpRequest {
                name: "Operator".to_string(),
                email,
                password: "operator-pass".to_string(),
            })
            .await
            .expect("operator sign up")
            .token
            .access_token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Convenience helper for requests made as the admin.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token()));
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::empty()).expect("failed to build request"))
            .await
    }

    /// Authenticated multipart POST.
    pub async fn post_multipart(&self, uri: &str, parts: &[Part<'_>]) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token()))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .expect("failed to build multipart request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Creates a supplier, carrier or destination and returns its id.
    pub async fn create_reference(&self, collection: &str, name: &str) -> Uuid {
        let response = self
            .request_authenticated(
                Method::POST,
                &format!("/api/v1/{}", collection),
                Some(json!({ "name": name })),
            )
            .await;
        assert_eq!(response.status(), 201, "creating {} {}", collection, name);
        let body = read_json(response).await;
        data_id(&body)
    }

    /// Supplier, destination and carrier for an order.
    pub async fn seed_parties(&self) -> Parties {
        Parties {
            supplier_id: self.create_reference("suppliers", "Acme Trading").await,
            destination_id: self.create_reference("destinations", "Santos Warehouse").await,
            carrier_id: self.create_reference("carriers", "Blue Ocean Lines").await,
        }
    }

    /// Creates an order through the API and returns the response data.
    pub async fn create_order(&self, form: Value) -> Value {
        let response = self
            .request_authenticated(Method::POST, "/api/v1/orders", Some(form))
            .await;
        assert_eq!(response.status(), 201, "creating order");
        read_json(response).await["data"].clone()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Parties {
    pub supplier_id: Uuid,
    pub destination_id: Uuid,
    pub carrier_id: Uuid,
}

impl Parties {
    /// A complete, valid order form.
    pub fn order_form(&self, reference: &str) -> Value {
        json!({
            "reference": reference,
            "supplier_id": self.supplier_id.to_string(),
            "destination_id": self.destination_id.to_string(),
            "carrier_id": self.carrier_id.to_string(),
            "product_description": "Ceramic tiles",
            "container_type": "40ft HC",
            "container_reference": "MSCU1234567",
            "transport_price": "1850.00",
            "order_value": "1000",
            "initial_payment_amount": "400",
            "status": "pending",
            "order_date": "2024-05-02",
            "expected_start_date": "2024-06-10"
        })
    }
}

pub async fn read_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response body")
}

pub fn data_id(body: &Value) -> Uuid {
    body["data"]["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .expect("response data carries an id")
}

/// Names of the fields reported in a 422 body.
pub fn error_fields(body: &Value) -> Vec<String> {
    body["fields"]
        .as_array()
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| f["field"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        match part {
            Part::Json { name, value } => {
                out.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\nContent-Type: application/json\r\n\r\n",
                        name
                    )
                    .as_bytes(),
                );
                out.extend_from_slice(value.to_string().as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                out.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                out.extend_from_slice(bytes);
            }
        }
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    out
}
