use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::common::{created, DeleteConfirmation, SearchParams};
use crate::{
    errors::ServiceError,
    services::{
        carriers::CarrierStats,
        reference_data::{ContactFields, ReferenceRecord},
    },
    ApiResponse, ApiResult, AppState,
};

/// List carriers
#[utoipa::path(
    get,
    path = "/api/v1/carriers",
    tag = "carriers",
    params(SearchParams),
    responses(
        (status = 200, description = "Carriers ordered by name", body = ApiResponse<Vec<ReferenceRecord>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_carriers(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<ReferenceRecord>> {
    let carriers = state.services.carriers.list(params.search.as_deref()).await?;
    Ok(Json(ApiResponse::success(carriers)))
}

/// Get a carrier
#[utoipa::path(
    get,
    path = "/api/v1/carriers/{id}",
    tag = "carriers",
    params(("id" = Uuid, Path, description = "Carrier ID")),
    responses(
        (status = 200, description = "Carrier found", body = ApiResponse<ReferenceRecord>),
        (status = 404, description = "Carrier not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_carrier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ReferenceRecord> {
    let carrier = state.services.carriers.get(id).await?;
    Ok(Json(ApiResponse::success(carrier)))
}

/// Create a carrier
#[utoipa::path(
    post,
    path = "/api/v1/carriers",
    tag = "carriers",
    request_body = ContactFields,
    responses(
        (status = 201, description = "Carrier created", body = ApiResponse<ReferenceRecord>),
        (status = 409, description = "Duplicate carrier", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_carrier(
    State(state): State<AppState>,
    Json(input): Json<ContactFields>,
) -> Result<(StatusCode, Json<ApiResponse<ReferenceRecord>>), ServiceError> {
    let carrier = state.services.carriers.create(input).await?;
    info!(carrier_id = %carrier.id, "Carrier created");
    Ok(created(carrier))
}

/// Update a carrier
#[utoipa::path(
    put,
    path = "/api/v1/carriers/{id}",
    tag = "carriers",
    params(("id" = Uuid, Path, description = "Carrier ID")),
    request_body = ContactFields,
    responses(
        (status = 200, description = "Carrier updated", body = ApiResponse<ReferenceRecord>),
        (status = 404, description = "Carrier not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_carrier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ContactFields>,
) -> ApiResult<ReferenceRecord> {
    let carrier = state.services.carriers.update(id, input).await?;
    Ok(Json(ApiResponse::success(carrier)))
}

/// Delete a carrier
#[utoipa::path(
    delete,
    path = "/api/v1/carriers/{id}",
    tag = "carriers",
    params(("id" = Uuid, Path, description = "Carrier ID"), DeleteConfirmation),
    responses(
        (status = 204, description = "Carrier deleted"),
        (status = 400, description = "Missing confirm=true", body = crate::errors::ErrorResponse),
        (status = 404, description = "Carrier not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Carrier is referenced by orders", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_carrier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(confirmation): Query<DeleteConfirmation>,
) -> Result<StatusCode, ServiceError> {
    confirmation.require()?;
    state.services.carriers.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Transport counts and six-month price trend of a carrier
#[utoipa::path(
    get,
    path = "/api/v1/carriers/{id}/stats",
    tag = "carriers",
    params(("id" = Uuid, Path, description = "Carrier ID")),
    responses(
        (status = 200, description = "Carrier statistics", body = ApiResponse<CarrierStats>),
        (status = 404, description = "Carrier not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn carrier_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<CarrierStats> {
    let stats = state.services.carriers.stats(id, Utc::now()).await?;
    Ok(Json(ApiResponse::success(stats)))
}
