use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{NotifyError, Notifier, RenderedEmail, templates};
use crate::{dto::orders::OrderWithItems, models::OrderStatus};

pub const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    id: String,
}

#[derive(Clone)]
pub struct ResendNotifier {
    http_client: Client,
    api_key: String,
    from_email: String,
    api_url: String,
}

impl ResendNotifier {
    pub fn new(api_key: String, from_email: String) -> Self {
        Self::with_api_url(api_key, from_email, RESEND_API_URL.to_string())
    }

    pub fn with_api_url(api_key: String, from_email: String, api_url: String) -> Self {
        Self {
            http_client: Client::new(),
            api_key,
            from_email,
            api_url,
        }
    }

    async fn send(&self, to: &str, email: &RenderedEmail) -> Result<(), NotifyError> {
        let request = ResendEmailRequest {
            from: &self.from_email,
            to: vec![to],
            subject: &email.subject,
            text: &email.text,
            html: &email.html,
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let sent: ResendEmailResponse = response.json().await?;
        tracing::info!(email_id = %sent.id, subject = %email.subject, "email sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn send_confirmation(
        &self,
        order: &OrderWithItems,
        session_id: Option<&str>,
    ) -> Result<(), NotifyError> {
        let email = templates::confirmation(order, session_id);
        self.send(&order.order.shipping.email, &email).await
    }

    async fn send_status_update(
        &self,
        order: &OrderWithItems,
        new_status: OrderStatus,
        old_status: Option<OrderStatus>,
    ) -> Result<(), NotifyError> {
        let email = templates::status_update(order, new_status, old_status);
        self.send(&order.order.shipping.email, &email).await
    }
}
