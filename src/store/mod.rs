//! Order persistence. Implementations must enforce "at most one order per
//! checkout session" themselves; the coordinator relies on it.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    dto::orders::OrderWithItems,
    models::{NewOrder, NewOrderItem, Order, OrderItem, OrderStatus},
    routes::params::SortOrder,
};

pub mod memory;
pub mod sea_orm_store;

pub use memory::InMemoryOrderStore;
pub use sea_orm_store::SeaOrmOrderStore;

pub const AUDIT_ORDER_MATERIALIZED: &str = "order_materialized";
pub const AUDIT_RECONCILIATION_REQUIRED: &str = "order_reconciliation_required";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("an order already exists for session {0}")]
    DuplicateSessionId(String),

    #[error("order {0} not found")]
    NotFound(Uuid),

    #[error("corrupt order record {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },

    #[error("ORM error: {0}")]
    Orm(#[from] sea_orm::DbErr),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub sort_order: SortOrder,
    pub limit: u64,
    pub offset: u64,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Fails with `DuplicateSessionId` when an order for the same session
    /// already exists.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;

    /// Inserts all items or none.
    async fn insert_items(&self, items: Vec<NewOrderItem>) -> Result<Vec<OrderItem>, StoreError>;

    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<Order>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    async fn find_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError>;

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, StoreError>;

    /// Returns one page of orders plus the total number matching the filter.
    async fn list_orders(&self, filter: OrderFilter) -> Result<(Vec<Order>, u64), StoreError>;

    async fn record_audit(
        &self,
        action: &str,
        order_id: Uuid,
        metadata: serde_json::Value,
    ) -> Result<(), StoreError>;

    async fn find_with_items(&self, id: Uuid) -> Result<Option<OrderWithItems>, StoreError> {
        let Some(order) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        let items = self.find_items(order.id).await?;
        Ok(Some(OrderWithItems { order, items }))
    }
}
