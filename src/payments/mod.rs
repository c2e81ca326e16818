//! Payment processor boundary: checkout session creation/retrieval and the
//! metadata schema used to carry order data through the processor.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::intent::CheckoutIntent;

pub mod metadata;
pub mod stripe;
pub mod webhook;

pub use metadata::{MetadataError, MetadataItem, SessionMetadata};
pub use stripe::StripeGateway;

/// Flat string mapping echoed back by the processor.
pub type Metadata = BTreeMap<String, String>;

pub const PAID: &str = "paid";

pub fn is_paid_status(payment_status: &str) -> bool {
    payment_status == PAID
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Open,
    CompleteUnpaid,
    CompletePaid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CreatedSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PaymentSession {
    pub id: String,
    pub status: Option<String>,
    pub payment_status: String,
    pub metadata: Metadata,
    pub customer_email: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
}

impl PaymentSession {
    pub fn is_paid(&self) -> bool {
        is_paid_status(&self.payment_status)
    }

    pub fn state(&self) -> PaymentState {
        if self.is_paid() {
            PaymentState::CompletePaid
        } else if self.status.as_deref() == Some("complete") {
            PaymentState::CompleteUnpaid
        } else {
            PaymentState::Open
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("payment provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected payment provider response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session for `intent`, attaching `metadata`
    /// so the order can be rebuilt once payment completes.
    async fn create_session(
        &self,
        intent: &CheckoutIntent,
        metadata: &Metadata,
    ) -> Result<CreatedSession, GatewayError>;

    async fn retrieve_session(&self, session_id: &str) -> Result<PaymentSession, GatewayError>;
}

/// Processor session ids are opaque but always `[A-Za-z0-9_]+`; anything else
/// is rejected before it reaches a request path.
pub fn is_valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id.len() <= 255
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(status: Option<&str>, payment_status: &str) -> PaymentSession {
        PaymentSession {
            id: "cs_test".into(),
            status: status.map(str::to_string),
            payment_status: payment_status.into(),
            metadata: Metadata::new(),
            customer_email: None,
            amount_total: None,
            currency: None,
        }
    }

    #[test]
    fn maps_processor_status_onto_payment_state() {
        assert_eq!(session(Some("open"), "unpaid").state(), PaymentState::Open);
        assert_eq!(
            session(Some("complete"), "unpaid").state(),
            PaymentState::CompleteUnpaid
        );
        assert_eq!(
            session(Some("complete"), "paid").state(),
            PaymentState::CompletePaid
        );
    }

    #[test]
    fn session_id_charset() {
        assert!(is_valid_session_id("cs_test_a1B2"));
        assert!(!is_valid_session_id(""));
        assert!(!is_valid_session_id("cs_1/../v1/charges"));
    }
}
