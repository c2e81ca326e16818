//! Turns "payment succeeded" signals into exactly one persisted order.
//!
//! Signals arrive from the processor webhook, from the paying client after
//! redirect, and from operators. They may race and repeat. No in-process lock
//! is taken: the store's per-session uniqueness constraint is the only
//! synchronization point, and losing the insert race is handled as a
//! duplicate signal.
//!
//! Once the order row exists it is authoritative. Item insertion and the
//! confirmation email run after it and their failures are logged (items are
//! also flagged for reconciliation) without undoing the order.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::{
    dto::orders::OrderWithItems,
    email::Notifier,
    error::{AppError, AppResult},
    models::{Order, OrderItem, OrderStatus},
    payments::{Metadata, PaymentGateway, SessionMetadata, is_paid_status},
    store::{AUDIT_ORDER_MATERIALIZED, AUDIT_RECONCILIATION_REQUIRED, OrderStore, StoreError},
};

#[derive(Debug, Clone)]
pub enum Trigger {
    /// Pushed by the processor. Paid-ness is taken from the payload.
    WebhookCompletion {
        session_id: String,
        payment_status: String,
        metadata: Metadata,
    },
    /// The client returned from the hosted checkout page. Never trusted:
    /// the session is re-read from the processor.
    ClientCallback { session_id: String },
    /// Operator-initiated recovery, same contract as `ClientCallback`.
    ManualRetrigger { session_id: String },
}

impl Trigger {
    pub fn session_id(&self) -> &str {
        match self {
            Trigger::WebhookCompletion { session_id, .. }
            | Trigger::ClientCallback { session_id }
            | Trigger::ManualRetrigger { session_id } => session_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Trigger::WebhookCompletion { .. } => "webhook",
            Trigger::ClientCallback { .. } => "client_callback",
            Trigger::ManualRetrigger { .. } => "manual_retrigger",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Materialized {
    pub order: OrderWithItems,
    /// False when this call observed an order created by an earlier or
    /// concurrent signal.
    pub created: bool,
}

pub struct OrderCoordinator {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn OrderStore>,
    notifier: Arc<dyn Notifier>,
}

impl OrderCoordinator {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn OrderStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            gateway,
            store,
            notifier,
        }
    }

    pub async fn materialize(&self, trigger: Trigger) -> AppResult<Materialized> {
        let kind = trigger.kind();
        let (session_id, metadata) = self.resolve_paid_session(trigger).await?;

        if let Some(existing) = self.store.find_by_session_id(&session_id).await? {
            tracing::info!(
                session_id = %session_id,
                order_id = %existing.id,
                trigger = kind,
                "order already materialized for session"
            );
            return Ok(self.merge_duplicate(existing).await);
        }

        let payload = SessionMetadata::decode(&metadata).map_err(|err| {
            tracing::error!(
                session_id = %session_id,
                trigger = kind,
                error = %err,
                "paid session carries unusable metadata"
            );
            AppError::BadRequest(format!("Invalid session metadata: {err}"))
        })?;

        let order = match self.store.insert_order(payload.to_new_order(&session_id)).await {
            Ok(order) => order,
            Err(StoreError::DuplicateSessionId(_)) => {
                let existing = self
                    .store
                    .find_by_session_id(&session_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Persistence(format!(
                            "order for session {session_id} rejected as duplicate but not found"
                        ))
                    })?;
                tracing::info!(
                    session_id = %session_id,
                    order_id = %existing.id,
                    trigger = kind,
                    "lost order insert race, using existing order"
                );
                return Ok(self.merge_duplicate(existing).await);
            }
            Err(err) => return Err(err.into()),
        };
        tracing::info!(
            session_id = %session_id,
            order_id = %order.id,
            trigger = kind,
            total = order.total_amount,
            "order created"
        );

        let inserted_items = self.persist_items(&order, &payload, &session_id).await;

        self.audit(
            AUDIT_ORDER_MATERIALIZED,
            order.id,
            json!({ "session_id": session_id, "trigger": kind }),
        )
        .await;

        // Items must be attached before the email goes out.
        let loaded = match self.store.find_with_items(order.id).await {
            Ok(Some(loaded)) => loaded,
            Ok(None) => OrderWithItems {
                order,
                items: inserted_items,
            },
            Err(err) => {
                tracing::warn!(
                    order_id = %order.id,
                    error = %err,
                    "failed to reload order, using inserted data"
                );
                OrderWithItems {
                    order,
                    items: inserted_items,
                }
            }
        };

        if let Err(err) = self
            .notifier
            .send_confirmation(&loaded, Some(&session_id))
            .await
        {
            tracing::warn!(
                order_id = %loaded.order.id,
                session_id = %session_id,
                error = %err,
                "confirmation email failed"
            );
        }

        Ok(Materialized {
            order: loaded,
            created: true,
        })
    }

    /// Handles a failed asynchronous payment: an existing order goes back to
    /// `pending` whatever its status, so an operator can still intervene.
    pub async fn mark_payment_failed(&self, session_id: &str) -> AppResult<Option<Order>> {
        let Some(existing) = self.store.find_by_session_id(session_id).await? else {
            tracing::info!(
                session_id = %session_id,
                "async payment failed for session without order"
            );
            return Ok(None);
        };

        let order = self
            .store
            .update_status(existing.id, OrderStatus::Pending)
            .await?;
        tracing::warn!(
            session_id = %session_id,
            order_id = %order.id,
            previous_status = %existing.status,
            "async payment failed, order set to pending"
        );
        Ok(Some(order))
    }

    async fn resolve_paid_session(&self, trigger: Trigger) -> AppResult<(String, Metadata)> {
        match trigger {
            Trigger::WebhookCompletion {
                session_id,
                payment_status,
                metadata,
            } => {
                if !is_paid_status(&payment_status) {
                    return Err(AppError::PaymentNotCompleted {
                        session_id,
                        status: payment_status,
                    });
                }
                Ok((session_id, metadata))
            }
            Trigger::ClientCallback { session_id } | Trigger::ManualRetrigger { session_id } => {
                let session = self.gateway.retrieve_session(&session_id).await?;
                if !session.is_paid() {
                    return Err(AppError::PaymentNotCompleted {
                        session_id,
                        status: session.payment_status,
                    });
                }
                Ok((session_id, session.metadata))
            }
        }
    }

    /// Duplicate signal path: no new items, no email. A `pending` order is
    /// promoted to `processing` since payment is now confirmed.
    async fn merge_duplicate(&self, existing: Order) -> Materialized {
        let order = if existing.status == OrderStatus::Pending {
            match self
                .store
                .update_status(existing.id, OrderStatus::Processing)
                .await
            {
                Ok(updated) => updated,
                Err(err) => {
                    tracing::error!(
                        order_id = %existing.id,
                        error = %err,
                        "failed to promote pending order"
                    );
                    existing
                }
            }
        } else {
            existing
        };

        let items = match self.store.find_items(order.id).await {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(order_id = %order.id, error = %err, "failed to load order items");
                Vec::new()
            }
        };

        Materialized {
            order: OrderWithItems { order, items },
            created: false,
        }
    }

    async fn persist_items(
        &self,
        order: &Order,
        payload: &SessionMetadata,
        session_id: &str,
    ) -> Vec<OrderItem> {
        match self.store.insert_items(payload.to_items(order.id)).await {
            Ok(items) => items,
            Err(err) => {
                tracing::error!(
                    order_id = %order.id,
                    session_id = %session_id,
                    error = %err,
                    "order items could not be stored, order needs reconciliation"
                );
                self.audit(
                    AUDIT_RECONCILIATION_REQUIRED,
                    order.id,
                    json!({
                        "session_id": session_id,
                        "reason": err.to_string(),
                        "expected_items": payload.items.len(),
                    }),
                )
                .await;
                Vec::new()
            }
        }
    }

    async fn audit(&self, action: &str, order_id: Uuid, metadata: serde_json::Value) {
        if let Err(err) = self.store.record_audit(action, order_id, metadata).await {
            tracing::warn!(order_id = %order_id, action, error = %err, "audit log failed");
        }
    }
}
