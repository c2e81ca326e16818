use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{dto::orders::OrderWithItems, models::ShippingDetails};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutItemRequest {
    pub product_id: Uuid,
    pub name: String,
    /// Base price in minor units, before any discount.
    pub price: i64,
    pub quantity: i32,
    #[serde(default)]
    pub product_discount: Option<f64>,
    #[serde(default)]
    pub event_discount: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub items: Vec<CheckoutItemRequest>,
    #[serde(default)]
    pub shipping: Option<ShippingDetails>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub discount_code: Option<String>,
    #[serde(default)]
    pub discount_amount: Option<i64>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub url: String,
    pub subtotal: i64,
    pub shipping_cost: i64,
    pub total: i64,
    pub currency: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RetrieveSessionQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SessionIdRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MaterializedOrder {
    #[serde(flatten)]
    pub order: OrderWithItems,
    /// False when the order already existed for this session.
    pub created: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendConfirmationRequest {
    pub order_id: Uuid,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    pub event_type: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
}
