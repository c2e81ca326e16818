use std::sync::Arc;

use crate::{
    config::AppConfig, email::Notifier, payments::PaymentGateway,
    services::coordinator::OrderCoordinator, store::OrderStore,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub store: Arc<dyn OrderStore>,
    pub notifier: Arc<dyn Notifier>,
    pub coordinator: Arc<OrderCoordinator>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn OrderStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let coordinator = Arc::new(OrderCoordinator::new(
            gateway.clone(),
            store.clone(),
            notifier.clone(),
        ));
        Self {
            config: Arc::new(config),
            gateway,
            store,
            notifier,
            coordinator,
        }
    }
}
