use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use super::{OrderFilter, OrderStore, StoreError};
use crate::{
    audit::log_audit,
    db::{DbPool, OrmConn},
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
    },
    models::{NewOrder, NewOrderItem, Order, OrderItem, OrderStatus},
    routes::params::SortOrder,
};

/// Postgres-backed store. The `UNIQUE` constraint on
/// `orders.stripe_session_id` is what makes concurrent inserts converge.
#[derive(Clone)]
pub struct SeaOrmOrderStore {
    orm: OrmConn,
    pool: DbPool,
}

impl SeaOrmOrderStore {
    pub fn new(orm: OrmConn, pool: DbPool) -> Self {
        Self { orm, pool }
    }
}

#[async_trait]
impl OrderStore for SeaOrmOrderStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let session_id = order.stripe_session_id.clone();
        let shipping = serde_json::to_value(&order.shipping).map_err(|err| StoreError::Corrupt {
            id: Uuid::nil(),
            reason: err.to_string(),
        })?;

        let inserted = OrderActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(order.user_id),
            total_amount: Set(order.total_amount),
            currency: Set(order.currency),
            shipping: Set(shipping),
            status: Set(order.status.as_str().to_string()),
            discount_code: Set(order.discount_code),
            discount_amount: Set(order.discount_amount),
            stripe_session_id: Set(order.stripe_session_id),
            payment_method: Set(order.payment_method),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&self.orm)
        .await
        .map_err(|err| match (err.sql_err(), session_id) {
            (Some(SqlErr::UniqueConstraintViolation(_)), Some(session_id)) => {
                StoreError::DuplicateSessionId(session_id)
            }
            _ => StoreError::Orm(err),
        })?;

        order_from_entity(inserted)
    }

    async fn insert_items(&self, items: Vec<NewOrderItem>) -> Result<Vec<OrderItem>, StoreError> {
        let txn = self.orm.begin().await?;

        let mut inserted = Vec::with_capacity(items.len());
        for item in items {
            let model = OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(item.order_id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?;
            inserted.push(order_item_from_entity(model));
        }

        txn.commit().await?;
        Ok(inserted)
    }

    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<Order>, StoreError> {
        Orders::find()
            .filter(OrderCol::StripeSessionId.eq(session_id))
            .one(&self.orm)
            .await?
            .map(order_from_entity)
            .transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Orders::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(order_from_entity)
            .transpose()
    }

    async fn find_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order_id))
            .order_by_asc(OrderItemCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_item_from_entity)
            .collect();
        Ok(items)
    }

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, StoreError> {
        let existing = Orders::find_by_id(id)
            .one(&self.orm)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        let mut active: OrderActive = existing.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now().into());
        let order = active.update(&self.orm).await?;

        order_from_entity(order)
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<(Vec<Order>, u64), StoreError> {
        let mut condition = Condition::all();
        if let Some(status) = filter.status {
            condition = condition.add(OrderCol::Status.eq(status.as_str()));
        }

        let mut finder = Orders::find().filter(condition);
        finder = match filter.sort_order {
            SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
            SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
        };

        let total = finder.clone().count(&self.orm).await?;

        let orders = finder
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((orders, total))
    }

    async fn record_audit(
        &self,
        action: &str,
        order_id: Uuid,
        metadata: serde_json::Value,
    ) -> Result<(), StoreError> {
        log_audit(&self.pool, Some(order_id), action, Some("orders"), Some(metadata)).await?;
        Ok(())
    }
}

fn order_from_entity(model: OrderModel) -> Result<Order, StoreError> {
    let shipping = serde_json::from_value(model.shipping).map_err(|err| StoreError::Corrupt {
        id: model.id,
        reason: format!("shipping: {err}"),
    })?;
    let status = model
        .status
        .parse()
        .map_err(|reason| StoreError::Corrupt { id: model.id, reason })?;

    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        total_amount: model.total_amount,
        currency: model.currency,
        shipping,
        status,
        discount_code: model.discount_code,
        discount_amount: model.discount_amount,
        stripe_session_id: model.stripe_session_id,
        payment_method: model.payment_method,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        unit_price: model.unit_price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
