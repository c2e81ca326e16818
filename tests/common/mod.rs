#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use checkout_backend::{
    config::AppConfig,
    dto::{
        checkout::{CheckoutItemRequest, CreateSessionRequest},
        orders::OrderWithItems,
    },
    email::{Notifier, NotifyError},
    intent::{CheckoutIntent, ShippingRules},
    models::{NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, ShippingDetails},
    payments::{
        CreatedSession, GatewayError, Metadata, PaymentGateway, PaymentSession, SessionMetadata,
    },
    state::AppState,
    store::{InMemoryOrderStore, OrderFilter, OrderStore, StoreError},
};
use uuid::Uuid;

pub const RULES: ShippingRules = ShippingRules {
    flat_fee: 49,
    free_threshold: None,
};

pub fn shipping() -> ShippingDetails {
    ShippingDetails {
        name: "Ada Lovelace".into(),
        email: "ada@example.com".into(),
        phone: None,
        address: "Storgatan 1".into(),
        city: "Stockholm".into(),
        postal_code: "111 22".into(),
        country: "SE".into(),
    }
}

/// Two units at 1000 with a 10% product discount: 2 x 900 + 49 shipping = 1849.
pub fn checkout_request() -> CreateSessionRequest {
    CreateSessionRequest {
        items: vec![CheckoutItemRequest {
            product_id: Uuid::new_v4(),
            name: "Linen shirt".into(),
            price: 1000,
            quantity: 2,
            product_discount: Some(10.0),
            event_discount: Some(5.0),
        }],
        shipping: Some(shipping()),
        currency: Some("SEK".into()),
        ..Default::default()
    }
}

pub fn checkout_metadata() -> Metadata {
    let intent = CheckoutIntent::build(checkout_request(), "sek", RULES).expect("valid intent");
    SessionMetadata::from(&intent).encode().expect("encodable")
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".into(),
        host: "127.0.0.1".into(),
        port: 0,
        stripe_secret_key: "sk_test".into(),
        stripe_api_base: "http://stripe.invalid".into(),
        frontend_url: "http://localhost:5173".into(),
        resend_api_key: None,
        email_from: "orders@example.com".into(),
        default_currency: "sek".into(),
        shipping_fee: RULES.flat_fee,
        free_shipping_threshold: RULES.free_threshold,
    }
}

/// Processor stand-in that serves sessions registered by the test.
#[derive(Default)]
pub struct FakeGateway {
    sessions: Mutex<HashMap<String, PaymentSession>>,
    pub created: AtomicUsize,
    pub retrieved: AtomicUsize,
}

impl FakeGateway {
    pub fn with_session(self, session_id: &str, payment_status: &str, metadata: Metadata) -> Self {
        self.sessions.lock().unwrap().insert(
            session_id.to_string(),
            PaymentSession {
                id: session_id.to_string(),
                status: Some("complete".into()),
                payment_status: payment_status.to_string(),
                metadata,
                customer_email: Some("ada@example.com".into()),
                amount_total: Some(1849),
                currency: Some("sek".into()),
            },
        );
        self
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_session(
        &self,
        _intent: &CheckoutIntent,
        metadata: &Metadata,
    ) -> Result<CreatedSession, GatewayError> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        let id = format!("cs_test_{n}");
        self.sessions.lock().unwrap().insert(
            id.clone(),
            PaymentSession {
                id: id.clone(),
                status: Some("open".into()),
                payment_status: "unpaid".into(),
                metadata: metadata.clone(),
                customer_email: None,
                amount_total: None,
                currency: None,
            },
        );
        Ok(CreatedSession {
            url: format!("https://checkout.example.com/{id}"),
            id,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<PaymentSession, GatewayError> {
        self.retrieved.fetch_add(1, Ordering::SeqCst);
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| GatewayError::Api {
                status: 404,
                body: format!("No such checkout.session: {session_id}"),
            })
    }
}

#[derive(Default)]
pub struct CountingNotifier {
    pub fail: bool,
    pub confirmations: AtomicUsize,
    pub status_updates: AtomicUsize,
}

impl CountingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn confirmations(&self) -> usize {
        self.confirmations.load(Ordering::SeqCst)
    }

    pub fn status_updates(&self) -> usize {
        self.status_updates.load(Ordering::SeqCst)
    }

    fn outcome(&self) -> Result<(), NotifyError> {
        if self.fail {
            Err(NotifyError::Api {
                status: 503,
                body: "mail provider down".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Notifier for CountingNotifier {
    async fn send_confirmation(
        &self,
        _order: &OrderWithItems,
        _session_id: Option<&str>,
    ) -> Result<(), NotifyError> {
        self.confirmations.fetch_add(1, Ordering::SeqCst);
        self.outcome()
    }

    async fn send_status_update(
        &self,
        _order: &OrderWithItems,
        _new_status: OrderStatus,
        _old_status: Option<OrderStatus>,
    ) -> Result<(), NotifyError> {
        self.status_updates.fetch_add(1, Ordering::SeqCst);
        self.outcome()
    }
}

/// Delegates to an in-memory store, optionally refusing item inserts or
/// answering the first session lookups as if no order existed yet.
pub struct FlakyStore {
    pub inner: Arc<InMemoryOrderStore>,
    fail_items: bool,
    stale_session_reads: AtomicUsize,
}

impl FlakyStore {
    pub fn failing_items(inner: Arc<InMemoryOrderStore>) -> Self {
        Self {
            inner,
            fail_items: true,
            stale_session_reads: AtomicUsize::new(0),
        }
    }

    /// The next `reads` lookups by session id miss, like a reader that ran
    /// just before a concurrent insert committed.
    pub fn stale_session_reads(inner: Arc<InMemoryOrderStore>, reads: usize) -> Self {
        Self {
            inner,
            fail_items: false,
            stale_session_reads: AtomicUsize::new(reads),
        }
    }
}

#[async_trait]
impl OrderStore for FlakyStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        self.inner.insert_order(order).await
    }

    async fn insert_items(&self, items: Vec<NewOrderItem>) -> Result<Vec<OrderItem>, StoreError> {
        if self.fail_items {
            return Err(StoreError::Db(sqlx::Error::PoolTimedOut));
        }
        self.inner.insert_items(items).await
    }

    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<Order>, StoreError> {
        let stale = self
            .stale_session_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(None);
        }
        self.inner.find_by_session_id(session_id).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn find_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, StoreError> {
        self.inner.find_items(order_id).await
    }

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<Order, StoreError> {
        self.inner.update_status(id, status).await
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<(Vec<Order>, u64), StoreError> {
        self.inner.list_orders(filter).await
    }

    async fn record_audit(
        &self,
        action: &str,
        order_id: Uuid,
        metadata: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.inner.record_audit(action, order_id, metadata).await
    }
}

pub struct Harness {
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    pub store: Arc<InMemoryOrderStore>,
    pub notifier: Arc<CountingNotifier>,
}

pub fn harness(gateway: FakeGateway, notifier: CountingNotifier) -> Harness {
    let gateway = Arc::new(gateway);
    let store = Arc::new(InMemoryOrderStore::new());
    let notifier = Arc::new(notifier);
    let state = AppState::new(
        test_config(),
        gateway.clone(),
        store.clone(),
        notifier.clone(),
    );
    Harness {
        state,
        gateway,
        store,
        notifier,
    }
}
