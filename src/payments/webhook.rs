use serde::Deserialize;
use thiserror::Error;

use super::stripe::StripeCheckoutSession;

pub const SESSION_COMPLETED: &str = "checkout.session.completed";
pub const ASYNC_PAYMENT_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";
pub const ASYNC_PAYMENT_FAILED: &str = "checkout.session.async_payment_failed";

/// Generic event envelope; `data.object` is parsed according to `type`.
#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug)]
pub enum CheckoutEvent {
    Completed(StripeCheckoutSession),
    AsyncPaymentSucceeded(StripeCheckoutSession),
    AsyncPaymentFailed(StripeCheckoutSession),
    Ignored(String),
}

impl CheckoutEvent {
    pub fn event_type(&self) -> &str {
        match self {
            CheckoutEvent::Completed(_) => SESSION_COMPLETED,
            CheckoutEvent::AsyncPaymentSucceeded(_) => ASYNC_PAYMENT_SUCCEEDED,
            CheckoutEvent::AsyncPaymentFailed(_) => ASYNC_PAYMENT_FAILED,
            CheckoutEvent::Ignored(event_type) => event_type,
        }
    }
}

#[derive(Debug, Error)]
pub enum WebhookParseError {
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("malformed checkout session in {event_type}: {reason}")]
    MalformedSession { event_type: String, reason: String },
}

pub fn parse_event(body: &[u8]) -> Result<CheckoutEvent, WebhookParseError> {
    let event: StripeWebhookEvent = serde_json::from_slice(body)
        .map_err(|err| WebhookParseError::MalformedEvent(err.to_string()))?;

    let parse_session = |object: serde_json::Value| {
        serde_json::from_value::<StripeCheckoutSession>(object).map_err(|err| {
            WebhookParseError::MalformedSession {
                event_type: event.event_type.clone(),
                reason: err.to_string(),
            }
        })
    };

    let parsed = match event.event_type.as_str() {
        SESSION_COMPLETED => CheckoutEvent::Completed(parse_session(event.data.object)?),
        ASYNC_PAYMENT_SUCCEEDED => {
            CheckoutEvent::AsyncPaymentSucceeded(parse_session(event.data.object)?)
        }
        ASYNC_PAYMENT_FAILED => {
            CheckoutEvent::AsyncPaymentFailed(parse_session(event.data.object)?)
        }
        other => CheckoutEvent::Ignored(other.to_string()),
    };

    tracing::debug!(
        event_id = event.id.as_deref().unwrap_or("-"),
        event_type = parsed.event_type(),
        "webhook event parsed"
    );
    Ok(parsed)
}
