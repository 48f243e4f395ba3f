//! Payment Provider Client
//!
//! Outbound payment session creation and the signature check for inbound
//! callbacks.

mod kvapay;
mod mock;

pub use kvapay::KvapayClient;
pub use mock::MockPaymentProvider;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Parameters for a hosted payment session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Store order id, echoed back in callbacks
    pub variable_symbol: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    pub symbol: String,

    pub currency: String,

    pub fail_url: String,

    pub success_url: String,

    /// Unix seconds
    pub timestamp: i64,

    pub email: String,

    pub name: String,
}

/// Hosted payment page for a session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLink {
    pub short_link: String,
}

/// Payment provider trait
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a payment session and return its redirect link
    async fn create_payment_link(&self, request: &PaymentRequest) -> Result<PaymentLink>;

    /// Check a callback signature against the raw body
    fn verify_signature(&self, body: &[u8], signature: &str) -> bool;

    /// Provider name
    fn name(&self) -> &str;
}
