use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::common::{created, read_multipart, require_file, DeleteConfirmation, RequestLocale};
use crate::{
    errors::{FieldError, ServiceError},
    services::{
        lookups::OrderLookups,
        order_form::{OrderForm, OrderFormView},
        orders::{DeletePreview, OrderDetail, OrderFilter, OrderResponse},
    },
    ApiResponse, ApiResult, AppState,
};

/// Query accepted by the order list
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct OrderListParams {
    /// Case-insensitive reference substring
    pub search: Option<String>,
    /// `pending`, `in_production`, `in_transit` or `delivered`; blank for all
    pub status: Option<String>,
}

/// Existing order to update instead of creating one
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SaveTargetParams {
    pub id: Option<Uuid>,
}

/// Order form values together with the options for its select inputs
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderFormPage {
    pub form: OrderFormView,
    pub lookups: OrderLookups,
}

/// Multipart body of `POST /orders/with-document`
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct OrderWithDocumentUpload {
    /// Order fields as a JSON document
    #[schema(value_type = OrderForm)]
    order: String,
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// List orders
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    tag = "orders",
    params(
        OrderListParams,
        ("lang" = Option<String>, Query, description = "Label locale: pt, pt-BR or en-US"),
    ),
    responses(
        (status = 200, description = "Orders, most recent order date first", body = ApiResponse<Vec<OrderResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 422, description = "Unknown status filter", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn list_orders(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Query(params): Query<OrderListParams>,
) -> ApiResult<Vec<OrderResponse>> {
    let filter = OrderFilter {
        search: params.search,
        status: params.status,
    };
    let orders = state.services.orders.list(&filter, locale).await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// Get an order with its documents
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order found", body = ApiResponse<OrderDetail>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn get_order(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderDetail> {
    let order = state.services.orders.get(id, locale).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Blank order form with lookups
#[utoipa::path(
    get,
    path = "/api/v1/orders/new",
    tag = "orders",
    responses(
        (status = 200, description = "Empty form", body = ApiResponse<OrderFormPage>),
    ),
    security(("Bearer" = []))
)]
pub async fn new_order_form(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
) -> ApiResult<OrderFormPage> {
    let lookups = state.services.lookups.order_lookups(locale).await?;
    Ok(Json(ApiResponse::success(OrderFormPage {
        form: OrderFormView::default(),
        lookups,
    })))
}

/// Stored order pre-filled into the edit form
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/form",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Pre-filled form", body = ApiResponse<OrderFormPage>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn edit_order_form(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderFormPage> {
    let form = state.services.orders.form(id).await?;
    let lookups = state.services.lookups.order_lookups(locale).await?;
    Ok(Json(ApiResponse::success(OrderFormPage { form, lookups })))
}

/// Create an order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    tag = "orders",
    request_body = OrderForm,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<OrderResponse>),
        (status = 409, description = "Duplicate reference or unknown relation", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn create_order(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Json(form): Json<OrderForm>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    let order = state.services.orders.create(form, locale).await?;
    info!(order_id = %order.id, "Order created");
    Ok(created(order))
}

/// Replace an order
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = OrderForm,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn update_order(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Path(id): Path<Uuid>,
    Json(form): Json<OrderForm>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.update(id, form, locale).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Save an order and attach a document in one request
#[utoipa::path(
    post,
    path = "/api/v1/orders/with-document",
    tag = "orders",
    params(SaveTargetParams),
    request_body(content = OrderWithDocumentUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Order saved and document attached", body = ApiResponse<OrderDetail>),
        (status = 413, description = "File too large", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
        (status = 502, description = "Order saved but the document was not; retry the upload", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn save_order_with_document(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Query(target): Query<SaveTargetParams>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<OrderDetail>>), ServiceError> {
    let upload = read_multipart(multipart).await?;
    let form = upload.order.ok_or_else(|| {
        ServiceError::InvalidFields(vec![FieldError::new("order", "Order fields are required")])
    })?;
    let file = require_file(upload.file)?;

    let detail = state
        .services
        .orders
        .save_with_document(target.id, form, file, locale)
        .await?;
    Ok(created(detail))
}

/// What will be deleted
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/delete-preview",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order summary", body = ApiResponse<DeletePreview>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_preview(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Path(id): Path<Uuid>,
) -> ApiResult<DeletePreview> {
    let preview = state.services.orders.delete_preview(id, locale).await?;
    Ok(Json(ApiResponse::success(preview)))
}

/// Delete an order and its document records
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    tag = "orders",
    params(("id" = Uuid, Path, description = "Order ID"), DeleteConfirmation),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 400, description = "Missing confirm=true", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(confirmation): Query<DeleteConfirmation>,
) -> Result<StatusCode, ServiceError> {
    confirmation.require()?;
    state.services.orders.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
