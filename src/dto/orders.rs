use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem, OrderStatus};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StatusUpdateEmailRequest {
    /// Defaults to the order's current status.
    pub new_status: Option<OrderStatus>,
    pub old_status: Option<OrderStatus>,
}

/// Result of an email request. Delivery failure is reported here rather than
/// as an HTTP error because the order itself is unaffected.
#[derive(Debug, Serialize, ToSchema)]
pub struct EmailDispatch {
    pub order_id: Uuid,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusChange {
    pub order: Order,
    pub previous_status: OrderStatus,
    pub email_sent: bool,
}
