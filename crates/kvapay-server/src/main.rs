//! KvaPay gateway HTTP server
//!
//! Axum-based server exposing the checkout and callback endpoints of the
//! KvaPay payment gateway, backed by an in-memory order store.

mod handlers;
mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kvapay_payments::{
    GatewayConfig, KvapayClient, LogNotifier, MemoryOrderStore, MockPaymentProvider,
    PaymentProvider,
};

use crate::handlers::{
    create_checkout, create_order, get_order, health_check, kvapay_callback, thank_you,
};
use crate::state::AppState;

/// Path KvaPay posts callbacks to
pub const CALLBACK_PATH: &str = "/webhook/kvapay";

/// Build the router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Checkout
        .route("/api/checkout", post(create_checkout))
        .route("/checkout/order-received/{id}", get(thank_you))
        // Orders (in-memory store)
        .route("/api/orders", post(create_order))
        .route("/api/orders/{id}", get(get_order))
        // Provider callbacks
        .route(CALLBACK_PATH, post(kvapay_callback))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = GatewayConfig::from_env()
        .context("KvaPay is not configured, set KVAPAY_API_KEY and KVAPAY_API_SECRET in .env")?;
    tracing::info!(config = ?config, "Loaded gateway configuration");

    let base_url = std::env::var("STORE_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:3000".into())
        .trim_end_matches('/')
        .to_string();

    let provider: Arc<dyn PaymentProvider> = if std::env::var("KVAPAY_MOCK").is_ok() {
        tracing::warn!("Using mock KvaPay provider - no real payments");
        Arc::new(MockPaymentProvider::new(&config.api_secret))
    } else {
        Arc::new(KvapayClient::from_config(&config)?)
    };

    tracing::info!(provider = provider.name(), "Payment provider ready");

    if config.test_mode {
        tracing::warn!("KvaPay test mode is on, use credentials from the test environment");
    }

    let state = AppState::new(
        Arc::new(config),
        Arc::new(MemoryOrderStore::new(base_url.clone())),
        provider,
        Arc::new(LogNotifier),
    );

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("KvaPay gateway running on http://{}", addr);
    tracing::info!("Callback URL to set in KvaPay: {}{}", base_url, CALLBACK_PATH);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
