//! Shiptrack API Library
//!
//! Logistics order tracking: suppliers, carriers, destinations, purchase orders with
//! their shipping milestones, order documents and dashboard aggregates.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod i18n;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod storage;
pub mod tracing;

use axum::{
    extract::{DefaultBodyLimit, Extension, State},
    response::Json,
    routing::{delete, get, patch, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::services::ServeDir;
use utoipa::ToSchema;

use crate::auth::{user::UserRole, AuthConfig, AuthRouterExt, AuthService};
use crate::auth::session::SessionHub;
use crate::cache::QueryCache;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::storage::ObjectStorage;

/// Headroom for multipart framing and the `order` part on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub event_sender: Arc<EventSender>,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
    pub sessions: SessionHub,
    pub cache: QueryCache,
}

impl AppState {
    /// Wires every service around one pool, one event channel and one session hub.
    pub fn new(
        db: Arc<DbPool>,
        config: config::AppConfig,
        event_sender: Arc<EventSender>,
        storage: Arc<dyn ObjectStorage>,
        sessions: SessionHub,
    ) -> Self {
        let cache = QueryCache::new(&config.cache);
        let services = handlers::AppServices::new(
            db.clone(),
            event_sender.clone(),
            &config,
            cache.clone(),
            storage,
            sessions.clone(),
        );
        let auth = Arc::new(AuthService::new(
            AuthConfig::from(&config),
            services.users.as_ref().clone(),
            sessions.clone(),
        ));

        Self {
            db,
            config,
            event_sender,
            services,
            auth,
            sessions,
            cache,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Routes under `/api/v1`
pub fn api_v1_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .route("/auth/sign-in", post(handlers::auth::sign_in))
        .route("/auth/sign-up", post(handlers::auth::sign_up));

    let session = Router::new()
        .route("/auth/sign-out", post(handlers::auth::sign_out))
        .route("/auth/session", get(handlers::auth::current_session))
        .route("/auth/session/events", get(handlers::auth::session_events))
        .with_auth();

    let reference_data = Router::new()
        .route(
            "/suppliers",
            get(handlers::suppliers::list_suppliers).post(handlers::suppliers::create_supplier),
        )
        .route(
            "/suppliers/:id",
            get(handlers::suppliers::get_supplier)
                .put(handlers::suppliers::update_supplier)
                .delete(handlers::suppliers::delete_supplier),
        )
        .route(
            "/carriers",
            get(handlers::carriers::list_carriers).post(handlers::carriers::create_carrier),
        )
        .route(
            "/carriers/:id",
            get(handlers::carriers::get_carrier)
                .put(handlers::carriers::update_carrier)
                .delete(handlers::carriers::delete_carrier),
        )
        .route("/carriers/:id/stats", get(handlers::carriers::carrier_stats))
        .route(
            "/destinations",
            get(handlers::destinations::list_destinations)
                .post(handlers::destinations::create_destination),
        )
        .route(
            "/destinations/:id",
            get(handlers::destinations::get_destination)
                .put(handlers::destinations::update_destination)
                .delete(handlers::destinations::delete_destination),
        )
        .route("/container-types", get(handlers::lookups::list_container_types))
        .with_auth();

    let orders = Router::new()
        .route("/dashboard", get(handlers::dashboard::get_dashboard))
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/orders/new", get(handlers::orders::new_order_form))
        .route(
            "/orders/with-document",
            post(handlers::orders::save_order_with_document),
        )
        .route(
            "/orders/:id",
            get(handlers::orders::get_order)
                .put(handlers::orders::update_order)
                .delete(handlers::orders::delete_order),
        )
        .route("/orders/:id/form", get(handlers::orders::edit_order_form))
        .route(
            "/orders/:id/delete-preview",
            get(handlers::orders::delete_preview),
        )
        .route(
            "/orders/:id/documents",
            get(handlers::documents::list_documents).post(handlers::documents::upload_document),
        )
        .route(
            "/documents/:id",
            patch(handlers::documents::rename_document).delete(handlers::documents::delete_document),
        )
        .with_auth();

    let users = Router::new()
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route("/users/:id", delete(handlers::users::delete_user))
        .with_role(UserRole::Admin);

    Router::new()
        .merge(public)
        .merge(session)
        .merge(reference_data)
        .merge(orders)
        .merge(users)
}

/// Full application router without transport concerns like CORS or compression
pub fn app_router(state: AppState) -> Router {
    let body_limit = state.config.storage.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;
    let files = ServeDir::new(state.config.storage.root_path());

    Router::new()
        .nest("/api/v1", api_v1_routes())
        .nest_service("/files", files)
        .merge(openapi::swagger_ui())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(crate::tracing::configure_http_tracing())
        // Inject AuthService into request extensions for auth middleware
        .layer(Extension(state.auth.clone()))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "health",
    responses((status = 200, description = "Service metadata", body = ApiResponse<Value>))
)]
pub async fn api_status(State(state): State<AppState>) -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "shiptrack-api",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": state.config.environment,
    });

    Ok(Json(ApiResponse::success(status_data)))
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses((status = 200, description = "Dependency health", body = ApiResponse<Value>))
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };
    let sessions_status = if state.sessions.is_closed() {
        "closed"
    } else {
        "open"
    };

    let health_data = json!({
        "status": if db_status == "healthy" { "healthy" } else { "unhealthy" },
        "checks": {
            "database": db_status,
            "session_hub": sessions_status,
            "cache_entries": state.cache.len(),
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
