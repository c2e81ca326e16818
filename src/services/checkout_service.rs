use uuid::Uuid;

use crate::{
    dto::{
        checkout::{
            CreateSessionRequest, CreateSessionResponse, MaterializedOrder,
            SendConfirmationRequest, SessionIdRequest, WebhookAck,
        },
        orders::EmailDispatch,
    },
    error::{AppError, AppResult},
    intent::CheckoutIntent,
    payments::{
        PaymentSession, SessionMetadata, is_valid_session_id,
        webhook::{self, CheckoutEvent},
    },
    response::ApiResponse,
    services::coordinator::{Materialized, Trigger},
    state::AppState,
};

pub async fn create_session(
    state: &AppState,
    request: CreateSessionRequest,
) -> AppResult<ApiResponse<CreateSessionResponse>> {
    let intent = CheckoutIntent::build(
        request,
        &state.config.default_currency,
        state.config.shipping_rules(),
    )?;
    let metadata = SessionMetadata::from(&intent)
        .encode()
        .map_err(|err| AppError::BadRequest(format!("Checkout cannot be submitted: {err}")))?;

    let session = state.gateway.create_session(&intent, &metadata).await?;

    Ok(ApiResponse::item(
        "Checkout session created",
        CreateSessionResponse {
            session_id: session.id,
            url: session.url,
            subtotal: intent.subtotal,
            shipping_cost: intent.shipping_cost,
            total: intent.total,
            currency: intent.currency,
        },
    ))
}

pub async fn retrieve_session(
    state: &AppState,
    session_id: Option<String>,
) -> AppResult<ApiResponse<PaymentSession>> {
    let session_id = require_session_id(session_id)?;
    let session = state.gateway.retrieve_session(&session_id).await?;
    Ok(ApiResponse::item("OK", session))
}

pub async fn create_order_from_session(
    state: &AppState,
    request: SessionIdRequest,
) -> AppResult<ApiResponse<MaterializedOrder>> {
    let session_id = require_session_id(request.session_id)?;
    let materialized = state
        .coordinator
        .materialize(Trigger::ClientCallback { session_id })
        .await?;
    Ok(materialized_response(materialized))
}

pub async fn retrigger(
    state: &AppState,
    request: SessionIdRequest,
) -> AppResult<ApiResponse<MaterializedOrder>> {
    let session_id = require_session_id(request.session_id)?;
    tracing::info!(session_id = %session_id, "manual order materialization requested");
    let materialized = state
        .coordinator
        .materialize(Trigger::ManualRetrigger { session_id })
        .await?;
    Ok(materialized_response(materialized))
}

/// Only a body that is not a checkout event is rejected. Everything else is
/// acknowledged so the processor stops redelivering, except store or upstream
/// failures, where redelivery is the recovery path.
pub async fn handle_webhook(state: &AppState, body: &[u8]) -> AppResult<WebhookAck> {
    let event = webhook::parse_event(body).map_err(|err| {
        tracing::warn!(error = %err, "rejected webhook body");
        AppError::BadRequest(err.to_string())
    })?;
    let event_type = event.event_type().to_string();

    match event {
        CheckoutEvent::Completed(session) | CheckoutEvent::AsyncPaymentSucceeded(session) => {
            if !is_valid_session_id(&session.id) {
                return Err(AppError::BadRequest(format!(
                    "Invalid session id in {event_type}"
                )));
            }
            let trigger = Trigger::WebhookCompletion {
                session_id: session.id,
                payment_status: session.payment_status,
                metadata: session.metadata,
            };
            match state.coordinator.materialize(trigger).await {
                Ok(materialized) => {
                    let outcome = if materialized.created {
                        "order_created"
                    } else {
                        "order_exists"
                    };
                    Ok(ack(event_type, outcome, Some(materialized.order.order.id)))
                }
                Err(AppError::PaymentNotCompleted { session_id, status }) => {
                    tracing::info!(
                        session_id = %session_id,
                        payment_status = %status,
                        "checkout completed without payment, waiting for async result"
                    );
                    Ok(ack(event_type, "payment_not_completed", None))
                }
                Err(AppError::BadRequest(_)) => Ok(ack(event_type, "invalid_metadata", None)),
                Err(err) => Err(err),
            }
        }
        CheckoutEvent::AsyncPaymentFailed(session) => {
            let order = state.coordinator.mark_payment_failed(&session.id).await?;
            let outcome = if order.is_some() {
                "order_pending"
            } else {
                "no_order"
            };
            Ok(ack(event_type, outcome, order.map(|o| o.id)))
        }
        CheckoutEvent::Ignored(_) => {
            tracing::debug!(event_type = %event_type, "ignoring webhook event");
            Ok(ack(event_type, "ignored", None))
        }
    }
}

pub async fn send_confirmation_email(
    state: &AppState,
    request: SendConfirmationRequest,
) -> AppResult<ApiResponse<EmailDispatch>> {
    let order = state
        .store
        .find_with_items(request.order_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let session_id = request
        .session_id
        .as_deref()
        .or(order.order.stripe_session_id.as_deref());
    let dispatch = match state.notifier.send_confirmation(&order, session_id).await {
        Ok(()) => EmailDispatch {
            order_id: order.order.id,
            email_sent: true,
            error: None,
        },
        Err(err) => {
            tracing::warn!(order_id = %order.order.id, error = %err, "confirmation email failed");
            EmailDispatch {
                order_id: order.order.id,
                email_sent: false,
                error: Some(err.to_string()),
            }
        }
    };

    Ok(ApiResponse::item("Confirmation email processed", dispatch))
}

fn require_session_id(raw: Option<String>) -> AppResult<String> {
    let session_id = raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing session_id".into()))?;
    if !is_valid_session_id(&session_id) {
        return Err(AppError::BadRequest("Invalid session_id".into()));
    }
    Ok(session_id)
}

fn materialized_response(materialized: Materialized) -> ApiResponse<MaterializedOrder> {
    let message = if materialized.created {
        "Order created"
    } else {
        "Order already exists"
    };
    ApiResponse::item(
        message,
        MaterializedOrder {
            order: materialized.order,
            created: materialized.created,
        },
    )
}

fn ack(event_type: String, outcome: &str, order_id: Option<Uuid>) -> WebhookAck {
    WebhookAck {
        received: true,
        event_type,
        outcome: outcome.to_string(),
        order_id,
    }
}
