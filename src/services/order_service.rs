use uuid::Uuid;

use crate::{
    dto::orders::{
        EmailDispatch, OrderList, OrderWithItems, StatusChange, StatusUpdateEmailRequest,
        UpdateOrderStatusRequest,
    },
    error::{AppError, AppResult},
    models::OrderStatus,
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    state::AppState,
    store::OrderFilter,
};

pub async fn list_orders(
    state: &AppState,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<OrderStatus>().map_err(AppError::BadRequest))
        .transpose()?;

    let (orders, total) = state
        .store
        .list_orders(OrderFilter {
            status,
            sort_order: query.sort_order.unwrap_or_default(),
            limit: limit as u64,
            offset: offset as u64,
        })
        .await?;

    let meta = Meta::page(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(state: &AppState, id: Uuid) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = state
        .store
        .find_with_items(id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::item("OK", order))
}

/// Administrative status change. The customer is told about it, but a failed
/// email does not undo the change.
pub async fn update_order_status(
    state: &AppState,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<StatusChange>> {
    let existing = state
        .store
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;
    let previous_status = existing.status;

    let order = state.store.update_status(id, payload.status).await?;
    tracing::info!(
        order_id = %id,
        from = %previous_status,
        to = %order.status,
        "order status updated"
    );

    let mut email_sent = false;
    if previous_status != order.status {
        let items = state.store.find_items(id).await.unwrap_or_else(|err| {
            tracing::warn!(order_id = %id, error = %err, "failed to load order items for email");
            Vec::new()
        });
        let with_items = OrderWithItems {
            order: order.clone(),
            items,
        };
        match state
            .notifier
            .send_status_update(&with_items, order.status, Some(previous_status))
            .await
        {
            Ok(()) => email_sent = true,
            Err(err) => {
                tracing::warn!(order_id = %id, error = %err, "status update email failed");
            }
        }
    }

    if let Err(err) = state
        .store
        .record_audit(
            "order_status_updated",
            id,
            serde_json::json!({ "from": previous_status, "to": order.status }),
        )
        .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::item(
        "Order status updated",
        StatusChange {
            order,
            previous_status,
            email_sent,
        },
    ))
}

pub async fn send_status_update_email(
    state: &AppState,
    id: Uuid,
    payload: StatusUpdateEmailRequest,
) -> AppResult<ApiResponse<EmailDispatch>> {
    let order = state
        .store
        .find_with_items(id)
        .await?
        .ok_or(AppError::NotFound)?;
    let new_status = payload.new_status.unwrap_or(order.order.status);

    let dispatch = match state
        .notifier
        .send_status_update(&order, new_status, payload.old_status)
        .await
    {
        Ok(()) => EmailDispatch {
            order_id: id,
            email_sent: true,
            error: None,
        },
        Err(err) => {
            tracing::warn!(order_id = %id, error = %err, "status update email failed");
            EmailDispatch {
                order_id: id,
                email_sent: false,
                error: Some(err.to_string()),
            }
        }
    };

    Ok(ApiResponse::item("Status update email processed", dispatch))
}
