//! KvaPay Checkout
//!
//! Implements the hosted approach: the order is put on hold for payment and
//! the buyer is redirected to KvaPay's payment page.
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌─────────────┐
//! │    Store    │────▶│  KvaPay Hosted  │────▶│    Store    │
//! │  (checkout) │     │  Payment Page   │     │ (thank-you) │
//! └─────────────┘     └─────────────────┘     └─────────────┘
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::order::{Order, OrderId, OrderStatus, OrderStore};
use crate::provider::{PaymentProvider, PaymentRequest};

/// Outcome of a checkout attempt as seen by the buyer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum CheckoutResult {
    /// Send the buyer to the hosted payment page
    Success { redirect: String },
    /// Payment could not be started; details are only in the logs
    Fail,
}

impl CheckoutResult {
    pub fn redirect(&self) -> Option<&str> {
        match self {
            Self::Success { redirect } => Some(redirect),
            Self::Fail => None,
        }
    }
}

/// Starts KvaPay payments for store orders
pub struct CheckoutInitiator {
    config: Arc<GatewayConfig>,
    store: Arc<dyn OrderStore>,
    provider: Arc<dyn PaymentProvider>,
}

impl CheckoutInitiator {
    pub fn new(
        config: Arc<GatewayConfig>,
        store: Arc<dyn OrderStore>,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            config,
            store,
            provider,
        }
    }

    /// Start a payment for an order
    ///
    /// Makes exactly one provider request. Errors are logged and collapsed
    /// into [`CheckoutResult::Fail`].
    pub async fn initiate(&self, order_id: &OrderId) -> CheckoutResult {
        match self.try_initiate(order_id).await {
            Ok(redirect) => {
                tracing::info!(order_id = %order_id, "Redirecting buyer to KvaPay");
                CheckoutResult::Success { redirect }
            }
            Err(e) => {
                tracing::error!(
                    order_id = %order_id,
                    provider = self.provider.name(),
                    error = %e,
                    "KvaPay checkout failed"
                );
                CheckoutResult::Fail
            }
        }
    }

    async fn try_initiate(&self, order_id: &OrderId) -> Result<String> {
        if !self.config.enabled {
            return Err(GatewayError::Disabled);
        }

        let order = self
            .store
            .get(order_id)?
            .ok_or_else(|| GatewayError::OrderNotFound(order_id.to_string()))?;
        self.validate(&order)?;

        self.store.set_status(&order.id, &OrderStatus::pending())?;
        if !order.stock_reduced {
            self.store.reduce_stock(&order.id)?;
        }
        self.store.empty_cart(&order.id)?;

        let request = self.payment_request(&order);
        let link = self.provider.create_payment_link(&request).await?;

        Ok(link.short_link)
    }

    fn validate(&self, order: &Order) -> Result<()> {
        if order.payment_method != self.config.gateway_id {
            return Err(GatewayError::PaymentMethodMismatch {
                order_id: order.id.to_string(),
                method: order.payment_method.clone(),
            });
        }
        if order.total <= Decimal::ZERO {
            return Err(invalid(order, "total must be positive"));
        }
        if order.currency.trim().is_empty() {
            return Err(invalid(order, "currency missing"));
        }
        Ok(())
    }

    /// Build the session parameters for an order
    pub fn payment_request(&self, order: &Order) -> PaymentRequest {
        PaymentRequest {
            variable_symbol: order.id.to_string(),
            amount: order.total,
            symbol: order.currency.clone(),
            currency: order.currency.clone(),
            fail_url: self.store.cancel_url(order),
            success_url: self.store.return_url(order),
            timestamp: chrono::Utc::now().timestamp(),
            email: order.billing.email.clone(),
            name: order.billing.full_name(),
        }
    }
}

fn invalid(order: &Order, reason: &str) -> GatewayError {
    GatewayError::InvalidOrder {
        order_id: order.id.to_string(),
        reason: reason.into(),
    }
}
