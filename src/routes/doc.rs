use utoipa::{OpenApi, openapi::OpenApi as OpenApiSpec};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        checkout::{
            CheckoutItemRequest, CreateSessionRequest, CreateSessionResponse, MaterializedOrder,
            RetrieveSessionQuery, SendConfirmationRequest, SessionIdRequest, WebhookAck,
        },
        orders::{
            EmailDispatch, OrderList, OrderWithItems, StatusChange, StatusUpdateEmailRequest,
            UpdateOrderStatusRequest,
        },
    },
    models::{Order, OrderItem, OrderStatus, ShippingDetails},
    payments::{PaymentSession, PaymentState},
    response::{ApiResponse, Meta},
    routes::{checkout, health, orders, params},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        checkout::create_session,
        checkout::retrieve_session,
        checkout::webhook,
        checkout::create_order_from_session,
        checkout::retrigger,
        checkout::send_confirmation_email,
        orders::list_orders,
        orders::get_order,
        orders::update_order_status,
        orders::status_update_email
    ),
    components(
        schemas(
            Order,
            OrderItem,
            OrderStatus,
            ShippingDetails,
            CheckoutItemRequest,
            CreateSessionRequest,
            CreateSessionResponse,
            RetrieveSessionQuery,
            SessionIdRequest,
            SendConfirmationRequest,
            MaterializedOrder,
            WebhookAck,
            PaymentSession,
            PaymentState,
            OrderList,
            OrderWithItems,
            UpdateOrderStatusRequest,
            StatusUpdateEmailRequest,
            StatusChange,
            EmailDispatch,
            params::Pagination,
            params::SortOrder,
            params::OrderListQuery,
            Meta,
            ApiResponse<CreateSessionResponse>,
            ApiResponse<PaymentSession>,
            ApiResponse<MaterializedOrder>,
            ApiResponse<EmailDispatch>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<StatusChange>
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Checkout", description = "Checkout sessions, payment webhooks and order materialization"),
        (name = "Orders", description = "Order lookup and status management"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
