use axum::{extract::State, Json};

use crate::{services::lookups::ContainerTypeResponse, ApiResponse, ApiResult, AppState};

/// Controlled list of container types
#[utoipa::path(
    get,
    path = "/api/v1/container-types",
    tag = "lookups",
    responses(
        (status = 200, description = "Container types ordered by name", body = ApiResponse<Vec<ContainerTypeResponse>>),
    ),
    security(("Bearer" = []))
)]
pub async fn list_container_types(State(state): State<AppState>) -> ApiResult<Vec<ContainerTypeResponse>> {
    let types = state.services.lookups.container_types().await?;
    Ok(Json(ApiResponse::success(types)))
}
