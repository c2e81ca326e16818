use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{OrderFilter, OrderStore, StoreError};
use crate::{
    models::{NewOrder, NewOrderItem, Order, OrderItem, OrderStatus},
    routes::params::SortOrder,
};

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub action: String,
    pub order_id: Uuid,
    pub metadata: serde_json::Value,
}

#[derive(Default)]
struct MemoryState {
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    audit: Vec<AuditEntry>,
}

/// Process-local store with the same session uniqueness guarantee as the
/// database: the check and the insert happen under one lock.
#[derive(Default)]
pub struct InMemoryOrderStore {
    state: Mutex<MemoryState>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.lock().audit.clone()
    }

    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    pub fn item_count(&self) -> usize {
        self.lock().items.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // Every mutation is a single push or assignment, so poisoned state is still whole.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut state = self.lock();
        if let Some(session_id) = &order.stripe_session_id {
            if state
                .orders
                .iter()
                .any(|o| o.stripe_session_id.as_ref() == Some(session_id))
            {
                return Err(StoreError::DuplicateSessionId(session_id.clone()));
            }
        }

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            user_id: order.user_id,
            total_amount: order.total_amount,
            currency: order.currency,
            shipping: order.shipping,
            status: order.status,
            discount_code: order.discount_code,
            discount_amount: order.discount_amount,
            stripe_session_id: order.stripe_session_id,
            payment_method: order.payment_method,
            created_at: now,
            updated_at: now,
        };
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn insert_items(&self, items: Vec<NewOrderItem>) -> Result<Vec<OrderItem>, StoreError> {
        let mut state = self.lock();
        if let Some(missing) = items
            .iter()
            .find(|item| !state.orders.iter().any(|o| o.id == item.order_id))
        {
            return Err(StoreError::NotFound(missing.order_id));
        }

        let now = Utc::now();
        let inserted: Vec<OrderItem> = items
            .into_iter()
            .map(|item| OrderItem {
                id: Uuid::new_v4(),
                order_id: item.order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                created_at: now,
            })
            .collect();
        state.items.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self
            .lock()
            .orders
            .iter()
            .find(|o| o.stripe_session_id.as_deref() == Some(session_id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.lock().orders.iter().find(|o| o.id == id).cloned())
    }

    async fn find_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
        Ok(self
            .lock()
            .items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, StoreError> {
        let mut state = self.lock();
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(StoreError::NotFound(id))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<(Vec<Order>, u64), StoreError> {
        let state = self.lock();
        let mut matching: Vec<Order> = state
            .orders
            .iter()
            .filter(|o| filter.status.is_none_or(|status| o.status == status))
            .cloned()
            .collect();
        matching.sort_by_key(|o| o.created_at);
        if matches!(filter.sort_order, SortOrder::Desc) {
            matching.reverse();
        }

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn record_audit(
        &self,
        action: &str,
        order_id: Uuid,
        metadata: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.lock().audit.push(AuditEntry {
            action: action.to_string(),
            order_id,
            metadata,
        });
        Ok(())
    }
}
