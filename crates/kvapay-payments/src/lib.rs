//! # kvapay-payments
//!
//! KvaPay cryptocurrency payments for store orders.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐  initiate   ┌─────────────────┐
//! │    Store    │────────────▶│  KvaPay Hosted  │
//! │  checkout   │◀── redirect─│  Payment Page   │
//! └─────────────┘             └─────────────────┘
//!        ▲                             │
//!        │ status transition           │ signed callback
//!        │                             ▼
//! ┌─────────────┐             ┌─────────────────┐
//! │ Order Store │◀────────────│ CallbackHandler │
//! └─────────────┘             └─────────────────┘
//! ```
//!
//! - [`CheckoutInitiator`] marks the order pending payment and asks KvaPay
//!   for a hosted payment link.
//! - [`CallbackHandler`] authenticates KvaPay's notifications and maps the
//!   reported payment state onto the order through the [`StatusMapping`].
//!
//! Orders live in whatever implements [`OrderStore`]; the gateway never owns
//! them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kvapay_payments::{CallbackHandler, GatewayConfig, KvapayClient, LogNotifier, MemoryOrderStore};
//!
//! let config = Arc::new(GatewayConfig::from_env()?);
//! let provider = Arc::new(KvapayClient::from_config(&config)?);
//! let store = Arc::new(MemoryOrderStore::new("https://shop.example"));
//!
//! let handler = CallbackHandler::new(config, store, provider, Arc::new(LogNotifier));
//! let outcome = handler.handle(&raw_body, signature_header)?;
//! ```

mod callback;
mod checkout;
mod config;
mod error;
mod notify;
mod order;
mod provider;
mod signature;
mod status;

pub use callback::{CallbackHandler, CallbackOutcome, CallbackPayload};
pub use checkout::{CheckoutInitiator, CheckoutResult};
pub use config::{GATEWAY_ID, GatewayConfig, LIVE_API_URL, TEST_API_URL};
pub use error::{GatewayError, Result};
pub use notify::{LogNotifier, Notification, Notifier};
pub use order::{BillingDetails, MemoryOrderStore, Order, OrderId, OrderNote, OrderStatus, OrderStore};
pub use provider::{KvapayClient, MockPaymentProvider, PaymentLink, PaymentProvider, PaymentRequest};
pub use signature::{HmacSigner, SIGNATURE_HEADER};
pub use status::{MappedStatus, ProviderState, StatusMapping};
