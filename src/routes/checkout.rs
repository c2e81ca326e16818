use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State, rejection::JsonRejection},
    routing::{get, post},
};

use crate::{
    dto::{
        checkout::{
            CreateSessionRequest, CreateSessionResponse, MaterializedOrder, RetrieveSessionQuery,
            SendConfirmationRequest, SessionIdRequest, WebhookAck,
        },
        orders::EmailDispatch,
    },
    error::AppResult,
    payments::PaymentSession,
    response::ApiResponse,
    services::checkout_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-session", post(create_session))
        .route("/retrieve-session", get(retrieve_session))
        .route("/webhook", post(webhook))
        .route("/create-order-from-session", post(create_order_from_session))
        .route("/retrigger", post(retrigger))
        .route("/send-confirmation-email", post(send_confirmation_email))
}

#[utoipa::path(
    post,
    path = "/api/checkout/create-session",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Hosted checkout session created", body = ApiResponse<CreateSessionResponse>),
        (status = 400, description = "Missing items or shipping, or invalid input"),
        (status = 502, description = "Payment provider unavailable"),
    ),
    tag = "Checkout"
)]
pub async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<CreateSessionResponse>>> {
    let Json(payload) = payload?;
    let resp = checkout_service::create_session(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/checkout/retrieve-session",
    params(
        ("session_id" = String, Query, description = "Checkout session id")
    ),
    responses(
        (status = 200, description = "Current state of the checkout session", body = ApiResponse<PaymentSession>),
        (status = 400, description = "Missing session_id"),
        (status = 502, description = "Payment provider unavailable"),
    ),
    tag = "Checkout"
)]
pub async fn retrieve_session(
    State(state): State<AppState>,
    Query(query): Query<RetrieveSessionQuery>,
) -> AppResult<Json<ApiResponse<PaymentSession>>> {
    let resp = checkout_service::retrieve_session(&state, query.session_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/checkout/webhook",
    request_body(content = String, description = "Raw payment provider event", content_type = "application/json"),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 400, description = "Malformed event"),
        (status = 500, description = "Processing failed, provider should redeliver"),
    ),
    tag = "Checkout"
)]
pub async fn webhook(State(state): State<AppState>, body: Bytes) -> AppResult<Json<WebhookAck>> {
    let ack = checkout_service::handle_webhook(&state, &body).await?;
    Ok(Json(ack))
}

#[utoipa::path(
    post,
    path = "/api/checkout/create-order-from-session",
    request_body = SessionIdRequest,
    responses(
        (status = 200, description = "Order for the paid session", body = ApiResponse<MaterializedOrder>),
        (status = 400, description = "Missing session_id or payment not completed"),
        (status = 502, description = "Payment provider unavailable"),
    ),
    tag = "Checkout"
)]
pub async fn create_order_from_session(
    State(state): State<AppState>,
    payload: Result<Json<SessionIdRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<MaterializedOrder>>> {
    let Json(payload) = payload?;
    let resp = checkout_service::create_order_from_session(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/checkout/retrigger",
    request_body = SessionIdRequest,
    responses(
        (status = 200, description = "Order for the paid session", body = ApiResponse<MaterializedOrder>),
        (status = 400, description = "Missing session_id or payment not completed"),
        (status = 502, description = "Payment provider unavailable"),
    ),
    tag = "Checkout"
)]
pub async fn retrigger(
    State(state): State<AppState>,
    payload: Result<Json<SessionIdRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<MaterializedOrder>>> {
    let Json(payload) = payload?;
    let resp = checkout_service::retrigger(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/checkout/send-confirmation-email",
    request_body = SendConfirmationRequest,
    responses(
        (status = 200, description = "Email attempted; see email_sent", body = ApiResponse<EmailDispatch>),
        (status = 404, description = "Order not found"),
    ),
    tag = "Checkout"
)]
pub async fn send_confirmation_email(
    State(state): State<AppState>,
    payload: Result<Json<SendConfirmationRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<EmailDispatch>>> {
    let Json(payload) = payload?;
    let resp = checkout_service::send_confirmation_email(&state, payload).await?;
    Ok(Json(resp))
}
