use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

use super::common::{created, DeleteConfirmation, SearchParams};
use crate::{
    errors::ServiceError,
    services::reference_data::{ContactFields, ReferenceRecord},
    ApiResponse, ApiResult, AppState,
};

/// List suppliers
#[utoipa::path(
    get,
    path = "/api/v1/suppliers",
    tag = "suppliers",
    params(SearchParams),
    responses(
        (status = 200, description = "Suppliers ordered by name", body = ApiResponse<Vec<ReferenceRecord>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<ReferenceRecord>> {
    let suppliers = state.services.suppliers.list(params.search.as_deref()).await?;
    Ok(Json(ApiResponse::success(suppliers)))
}

/// Get a supplier
#[utoipa::path(
    get,
    path = "/api/v1/suppliers/{id}",
    tag = "suppliers",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier found", body = ApiResponse<ReferenceRecord>),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ReferenceRecord> {
    let supplier = state.services.suppliers.get(id).await?;
    Ok(Json(ApiResponse::success(supplier)))
}

/// Create a supplier
#[utoipa::path(
    post,
    path = "/api/v1/suppliers",
    tag = "suppliers",
    request_body = ContactFields,
    responses(
        (status = 201, description = "Supplier created", body = ApiResponse<ReferenceRecord>),
        (status = 409, description = "Duplicate supplier", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    Json(input): Json<ContactFields>,
) -> Result<(StatusCode, Json<ApiResponse<ReferenceRecord>>), ServiceError> {
    let supplier = state.services.suppliers.create(input).await?;
    info!(supplier_id = %supplier.id, "Supplier created");
    Ok(created(supplier))
}

/// Update a supplier
#[utoipa::path(
    put,
    path = "/api/v1/suppliers/{id}",
    tag = "suppliers",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    request_body = ContactFields,
    responses(
        (status = 200, description = "Supplier updated", body = ApiResponse<ReferenceRecord>),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ContactFields>,
) -> ApiResult<ReferenceRecord> {
    let supplier = state.services.suppliers.update(id, input).await?;
    Ok(Json(ApiResponse::success(supplier)))
}

/// Delete a supplier
#[utoipa::path(
    delete,
    path = "/api/v1/suppliers/{id}",
    tag = "suppliers",
    params(("id" = Uuid, Path, description = "Supplier ID"), DeleteConfirmation),
    responses(
        (status = 204, description = "Supplier deleted"),
        (status = 400, description = "Missing confirm=true", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Supplier is referenced by orders", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(confirmation): Query<DeleteConfirmation>,
) -> Result<StatusCode, ServiceError> {
    confirmation.require()?;
    state.services.suppliers.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
