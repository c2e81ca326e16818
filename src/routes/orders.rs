use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State, rejection::JsonRejection},
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        EmailDispatch, OrderList, OrderWithItems, StatusChange, StatusUpdateEmailRequest,
        UpdateOrderStatusRequest,
    },
    error::AppResult,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/{order_id}", get(get_order))
        .route("/{order_id}/status", patch(update_order_status))
        .route("/{order_id}/status-update-email", post(status_update_email))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "List orders", body = ApiResponse<OrderList>),
        (status = 400, description = "Unknown status filter"),
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    params(
        ("order_id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Not Found"),
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::get_order(&state, order_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{order_id}/status",
    params(
        ("order_id" = Uuid, Path, description = "Order ID")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Update order status", body = ApiResponse<StatusChange>),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Not Found"),
    ),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    payload: Result<Json<UpdateOrderStatusRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<StatusChange>>> {
    let Json(payload) = payload?;
    let resp = order_service::update_order_status(&state, order_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/status-update-email",
    params(
        ("order_id" = Uuid, Path, description = "Order ID")
    ),
    request_body = StatusUpdateEmailRequest,
    responses(
        (status = 200, description = "Email attempted; see email_sent", body = ApiResponse<EmailDispatch>),
        (status = 404, description = "Not Found"),
    ),
    tag = "Orders"
)]
pub async fn status_update_email(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    body: Bytes,
) -> AppResult<Json<ApiResponse<EmailDispatch>>> {
    // The body is optional; an empty request re-sends the current status.
    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        StatusUpdateEmailRequest::default()
    } else {
        let Json(payload) = Json::<StatusUpdateEmailRequest>::from_bytes(&body)?;
        payload
    };
    let resp = order_service::send_status_update_email(&state, order_id, payload).await?;
    Ok(Json(resp))
}
