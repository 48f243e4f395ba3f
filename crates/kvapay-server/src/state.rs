//! Application State

use std::sync::Arc;

use kvapay_payments::{
    CallbackHandler, CheckoutInitiator, GatewayConfig, Notifier, OrderStore, PaymentProvider,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Gateway settings
    pub config: Arc<GatewayConfig>,

    /// Order store the gateway reads and transitions
    pub store: Arc<dyn OrderStore>,

    pub checkout: Arc<CheckoutInitiator>,

    pub callbacks: Arc<CallbackHandler>,
}

impl AppState {
    pub fn new(
        config: Arc<GatewayConfig>,
        store: Arc<dyn OrderStore>,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let checkout = CheckoutInitiator::new(config.clone(), store.clone(), provider.clone());
        let callbacks = CallbackHandler::new(config.clone(), store.clone(), provider, notifier);

        Self {
            config,
            store,
            checkout: Arc::new(checkout),
            callbacks: Arc::new(callbacks),
        }
    }
}
