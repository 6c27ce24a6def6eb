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

/// List destinations
#[utoipa::path(
    get,
    path = "/api/v1/destinations",
    tag = "destinations",
    params(SearchParams),
    responses(
        (status = 200, description = "Destinations ordered by name", body = ApiResponse<Vec<ReferenceRecord>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_destinations(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<ReferenceRecord>> {
    let destinations = state.services.destinations.list(params.search.as_deref()).await?;
    Ok(Json(ApiResponse::success(destinations)))
}

/// Get a destination
#[utoipa::path(
    get,
    path = "/api/v1/destinations/{id}",
    tag = "destinations",
    params(("id" = Uuid, Path, description = "Destination ID")),
    responses(
        (status = 200, description = "Destination found", body = ApiResponse<ReferenceRecord>),
        (status = 404, description = "Destination not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_destination(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ReferenceRecord> {
    let destination = state.services.destinations.get(id).await?;
    Ok(Json(ApiResponse::success(destination)))
}

/// Create a destination
#[utoipa::path(
    post,
    path = "/api/v1/destinations",
    tag = "destinations",
    request_body = ContactFields,
    responses(
        (status = 201, description = "Destination created", body = ApiResponse<ReferenceRecord>),
        (status = 409, description = "Duplicate destination", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_destination(
    State(state): State<AppState>,
    Json(input): Json<ContactFields>,
) -> Result<(StatusCode, Json<ApiResponse<ReferenceRecord>>), ServiceError> {
    let destination = state.services.destinations.create(input).await?;
    info!(destination_id = %destination.id, "Destination created");
    Ok(created(destination))
}

/// Update a destination
#[utoipa::path(
    put,
    path = "/api/v1/destinations/{id}",
    tag = "destinations",
    params(("id" = Uuid, Path, description = "Destination ID")),
    request_body = ContactFields,
    responses(
        (status = 200, description = "Destination updated", body = ApiResponse<ReferenceRecord>),
        (status = 404, description = "Destination not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_destination(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ContactFields>,
) -> ApiResult<ReferenceRecord> {
    let destination = state.services.destinations.update(id, input).await?;
    Ok(Json(ApiResponse::success(destination)))
}

/// Delete a destination
#[utoipa::path(
    delete,
    path = "/api/v1/destinations/{id}",
    tag = "destinations",
    params(("id" = Uuid, Path, description = "Destination ID"), DeleteConfirmation),
    responses(
        (status = 204, description = "Destination deleted"),
        (status = 400, description = "Missing confirm=true", body = crate::errors::ErrorResponse),
        (status = 404, description = "Destination not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Destination is referenced by orders", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_destination(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(confirmation): Query<DeleteConfirmation>,
) -> Result<StatusCode, ServiceError> {
    confirmation.require()?;
    state.services.destinations.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
