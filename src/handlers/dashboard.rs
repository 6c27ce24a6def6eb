use axum::{extract::State, Json};
use chrono::Utc;

use crate::{services::dashboard::DashboardOverview, ApiResponse, ApiResult, AppState};

/// Aggregate figures and the trailing twelve-month order volume
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    tag = "dashboard",
    responses(
        (status = 200, description = "Dashboard aggregates", body = ApiResponse<DashboardOverview>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_dashboard(State(state): State<AppState>) -> ApiResult<DashboardOverview> {
    let overview = state.services.dashboard.overview(Utc::now()).await?;
    Ok(Json(ApiResponse::success(overview)))
}
