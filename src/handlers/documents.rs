use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::common::{created, read_multipart, require_file};
use crate::{
    errors::ServiceError,
    services::documents::{DocumentResponse, RenameDocumentRequest},
    ApiResponse, ApiResult, AppState,
};

/// Multipart body of a document upload
#[derive(Debug, utoipa::ToSchema)]
#[allow(dead_code)]
pub struct DocumentUpload {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// List the documents of an order
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/documents",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Documents, oldest first", body = ApiResponse<Vec<DocumentResponse>>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_documents(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Vec<DocumentResponse>> {
    let documents = state.services.documents.list(order_id).await?;
    Ok(Json(ApiResponse::success(documents)))
}

/// Attach a document to an order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/documents",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body(content = DocumentUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Document stored", body = ApiResponse<DocumentResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 413, description = "File too large", body = crate::errors::ErrorResponse),
        (status = 422, description = "Missing or unusable file", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn upload_document(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<DocumentResponse>>), ServiceError> {
    let file = require_file(read_multipart(multipart).await?.file)?;
    let document = state.services.documents.upload(order_id, file).await?;
    Ok(created(document))
}

/// Rename a document
#[utoipa::path(
    patch,
    path = "/api/v1/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    request_body = RenameDocumentRequest,
    responses(
        (status = 200, description = "Document renamed", body = ApiResponse<DocumentResponse>),
        (status = 404, description = "Document not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Blank name", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn rename_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RenameDocumentRequest>,
) -> ApiResult<DocumentResponse> {
    let document = state.services.documents.rename(id, request).await?;
    Ok(Json(ApiResponse::success(document)))
}

/// Delete a document and its stored file
#[utoipa::path(
    delete,
    path = "/api/v1/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 404, description = "Document not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.documents.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
