use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{error::DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Shown when a write collides with a unique constraint.
pub const UNIQUE_VIOLATION_MESSAGE: &str = "A record with the same unique value already exists";
/// Shown when a write or delete breaks a foreign key.
pub const REFERENTIAL_INTEGRITY_MESSAGE: &str =
    "This record is referenced by other records or references a missing record";
/// Shown for missing or insufficient authorization.
pub const AUTHORIZATION_MESSAGE: &str = "You are not authorized to perform this action";
/// Shown for anything unclassified.
pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred";

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// A validation failure attached to a single input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "email")]
    pub field: String,
    #[schema(example = "Must be a valid email address")]
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Conflict",
    "message": "A record with the same unique value already exists",
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category
    #[schema(example = "Not Found")]
    pub error: String,
    /// Human-readable error description
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Per-field validation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
    /// Order that was persisted before a later step failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(DbErr),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Foreign key violated: {0}")]
    ReferentialIntegrity(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid fields: {}", summarize_fields(.0))]
    InvalidFields(Vec<FieldError>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Order {order_id} was saved but the document step failed: {reason}")]
    PartialFailure { order_id: Uuid, reason: String },

    #[error("Hash error: {0}")]
    HashError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

fn summarize_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => ServiceError::UniqueViolation(detail),
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                ServiceError::ReferentialIntegrity(detail)
            }
            _ => ServiceError::DatabaseError(err),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::InvalidFields(field_errors(&errors))
    }
}

/// Flattens validator output into a stable, field-sorted list.
pub fn field_errors(errors: &validator::ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("is invalid ({})", e.code));
                FieldError::new(field, message)
            })
        })
        .collect();
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

impl ServiceError {
    /// Single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidFields(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UniqueViolation(_) | Self::ReferentialIntegrity(_) | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::PartialFailure { .. } => StatusCode::BAD_GATEWAY,
            Self::DatabaseError(_)
            | Self::StorageError(_)
            | Self::HashError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to a client. Store and internal details stay in the logs.
    pub fn response_message(&self) -> String {
        match self {
            Self::UniqueViolation(_) => UNIQUE_VIOLATION_MESSAGE.to_string(),
            Self::ReferentialIntegrity(_) => REFERENTIAL_INTEGRITY_MESSAGE.to_string(),
            Self::Unauthorized(_) | Self::Forbidden(_) => AUTHORIZATION_MESSAGE.to_string(),
            Self::InvalidFields(_) => "Validation failed".to_string(),
            Self::PartialFailure { order_id, .. } => format!(
                "Order {} was saved but its document could not be stored; retry the upload",
                order_id
            ),
            Self::DatabaseError(_)
            | Self::StorageError(_)
            | Self::HashError(_)
            | Self::InternalError(_) => FALLBACK_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "request failed");
        }

        let (fields, order_id, details) = match &self {
            Self::InvalidFields(fields) => (Some(fields.clone()), None, None),
            Self::PartialFailure { order_id, .. } => (
                None,
                Some(*order_id),
                Some(format!("POST /api/v1/orders/{}/documents", order_id)),
            ),
            _ => (None, None, None),
        };

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details,
            fields,
            order_id,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}
