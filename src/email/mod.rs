//! Transactional email. Senders are stateless and never retry; callers treat
//! every failure as advisory.

use async_trait::async_trait;
use thiserror::Error;

use crate::{dto::orders::OrderWithItems, models::OrderStatus};

pub mod resend;
pub mod templates;

pub use resend::ResendNotifier;
pub use templates::RenderedEmail;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("email provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email provider returned {status}: {body}")]
    Api { status: u16, body: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_confirmation(
        &self,
        order: &OrderWithItems,
        session_id: Option<&str>,
    ) -> Result<(), NotifyError>;

    async fn send_status_update(
        &self,
        order: &OrderWithItems,
        new_status: OrderStatus,
        old_status: Option<OrderStatus>,
    ) -> Result<(), NotifyError>;
}

/// Used when no email provider is configured: renders the email and logs it.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    fn log(&self, to: &str, email: &RenderedEmail) {
        tracing::info!(to = %to, subject = %email.subject, "email delivery disabled, not sending");
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_confirmation(
        &self,
        order: &OrderWithItems,
        session_id: Option<&str>,
    ) -> Result<(), NotifyError> {
        self.log(
            &order.order.shipping.email,
            &templates::confirmation(order, session_id),
        );
        Ok(())
    }

    async fn send_status_update(
        &self,
        order: &OrderWithItems,
        new_status: OrderStatus,
        old_status: Option<OrderStatus>,
    ) -> Result<(), NotifyError> {
        self.log(
            &order.order.shipping.email,
            &templates::status_update(order, new_status, old_status),
        );
        Ok(())
    }
}
