use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, de::DeserializeOwned};

use super::{CreatedSession, GatewayError, Metadata, PaymentGateway, PaymentSession};
use crate::intent::CheckoutIntent;

#[derive(Debug, Deserialize)]
struct CreateCheckoutSessionResponse {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct CreateCouponResponse {
    id: String,
}

/// Checkout session object as returned by the API and embedded in
/// `checkout.session.*` webhook events.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub status: Option<String>,
    pub payment_status: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub customer_email: Option<String>,
    pub customer_details: Option<StripeCustomerDetails>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomerDetails {
    pub email: Option<String>,
}

impl From<StripeCheckoutSession> for PaymentSession {
    fn from(session: StripeCheckoutSession) -> Self {
        let customer_email = session
            .customer_details
            .and_then(|details| details.email)
            .or(session.customer_email);
        PaymentSession {
            id: session.id,
            status: session.status,
            payment_status: session.payment_status,
            metadata: session.metadata,
            customer_email,
            amount_total: session.amount_total,
            currency: session.currency,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StripeGateway {
    client: Client,
    secret_key: String,
    api_base: String,
    success_url: String,
    cancel_url: String,
}

impl StripeGateway {
    pub fn new(secret_key: &str, api_base: &str, frontend_url: &str) -> Self {
        let frontend_url = frontend_url.trim_end_matches('/');
        Self {
            client: Client::new(),
            secret_key: secret_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            success_url: format!(
                "{frontend_url}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}"
            ),
            cancel_url: format!("{frontend_url}/checkout/cancel"),
        }
    }

    /// Order-level discounts cannot be expressed as a negative line, so each
    /// discounted checkout gets a single-use fixed-amount coupon.
    async fn create_coupon(&self, intent: &CheckoutIntent) -> Result<String, GatewayError> {
        let mut form = vec![
            ("amount_off".to_string(), intent.discount_amount.to_string()),
            ("currency".to_string(), intent.currency.clone()),
            ("duration".to_string(), "once".to_string()),
            ("max_redemptions".to_string(), "1".to_string()),
        ];
        if let Some(code) = &intent.discount_code {
            form.push(("name".to_string(), code.clone()));
        }

        let response = self
            .client
            .post(format!("{}/v1/coupons", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;
        let coupon: CreateCouponResponse = parse_response(response).await?;
        Ok(coupon.id)
    }

    fn session_form(&self, intent: &CheckoutIntent, metadata: &Metadata) -> Vec<(String, String)> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("payment_method_types[0]".into(), "card".into()),
            ("success_url".into(), self.success_url.clone()),
            ("cancel_url".into(), self.cancel_url.clone()),
            ("customer_email".into(), intent.shipping.email.clone()),
        ];

        for (index, line) in intent.lines.iter().enumerate() {
            let prefix = format!("line_items[{index}]");
            form.push((
                format!("{prefix}[price_data][currency]"),
                intent.currency.clone(),
            ));
            form.push((
                format!("{prefix}[price_data][unit_amount]"),
                line.unit_price.to_string(),
            ));
            form.push((
                format!("{prefix}[price_data][product_data][name]"),
                line.name.clone(),
            ));
            form.push((
                format!("{prefix}[price_data][product_data][metadata][product_id]"),
                line.product_id.to_string(),
            ));
            form.push((format!("{prefix}[quantity]"), line.quantity.to_string()));
        }

        if intent.shipping_cost > 0 {
            let prefix = format!("line_items[{}]", intent.lines.len());
            form.push((
                format!("{prefix}[price_data][currency]"),
                intent.currency.clone(),
            ));
            form.push((
                format!("{prefix}[price_data][unit_amount]"),
                intent.shipping_cost.to_string(),
            ));
            form.push((
                format!("{prefix}[price_data][product_data][name]"),
                "Shipping".into(),
            ));
            form.push((format!("{prefix}[quantity]"), "1".into()));
        }

        for (key, value) in metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }

        form
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_session(
        &self,
        intent: &CheckoutIntent,
        metadata: &Metadata,
    ) -> Result<CreatedSession, GatewayError> {
        let mut form = self.session_form(intent, metadata);
        if intent.discount_amount > 0 {
            let coupon = self.create_coupon(intent).await?;
            form.push(("discounts[0][coupon]".into(), coupon));
        }

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;

        let session: CreateCheckoutSessionResponse = parse_response(response).await?;
        tracing::info!(session_id = %session.id, total = intent.total, "checkout session created");
        Ok(CreatedSession {
            id: session.id,
            url: session.url,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<PaymentSession, GatewayError> {
        let response = self
            .client
            .get(format!("{}/v1/checkout/sessions/{session_id}", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;

        let session: StripeCheckoutSession = parse_response(response).await?;
        Ok(session.into())
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::Api {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json()
        .await
        .map_err(|err| GatewayError::InvalidResponse(err.to_string()))
}
