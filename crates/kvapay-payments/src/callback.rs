//! KvaPay Callback Handling
//!
//! Processes server-to-server payment notifications. Every step is a hard
//! gate; a rejected callback never touches the order:
//!
//! 1. signature over the raw body (before parsing, before any lookup)
//! 2. payload parsing
//! 3. order lookup
//! 4. payment method check
//! 5. status mapping
//! 6. amount check (`SUCCESS` only)
//! 7. status transition + audit note
//!
//! KvaPay retries callbacks, so step 7 is re-applied on every delivery and
//! the payment itself is recorded only once.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::notify::{Notification, Notifier};
use crate::order::{Order, OrderId, OrderStatus, OrderStore};
use crate::provider::PaymentProvider;
use crate::status::{MappedStatus, ProviderState};

/// Fields of a callback body the gateway relies on; the rest is ignored
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    /// Store order id
    #[serde(deserialize_with = "variable_symbol")]
    pub variable_symbol: String,

    /// Provider state code
    pub state: String,

    /// Amount paid, sent either as a JSON number or a string
    #[serde(deserialize_with = "amount")]
    pub amount: Decimal,
}

impl CallbackPayload {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| GatewayError::MalformedPayload(e.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

impl TextOrNumber {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => n.to_string(),
        }
    }
}

fn variable_symbol<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    let symbol = TextOrNumber::deserialize(deserializer)?.into_string();
    if symbol.is_empty() {
        return Err(serde::de::Error::custom("variableSymbol is empty"));
    }
    Ok(symbol)
}

fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Decimal, D::Error> {
    let raw = TextOrNumber::deserialize(deserializer)?.into_string();
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| serde::de::Error::custom(format!("amount is not a number: {raw}")))
}

/// What an accepted callback did
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallbackOutcome {
    /// State applied: note added, status moved unless mapped to `ignore`
    Applied {
        order_id: OrderId,
        state: ProviderState,
        order_status: Option<OrderStatus>,
        /// The payment was recorded by this delivery
        payment_completed: bool,
    },
    /// State has no mapping entry; nothing changed
    Unmapped {
        order_id: OrderId,
        state: ProviderState,
    },
    /// State code the gateway does not know; nothing changed
    UnrecognizedState { order_id: OrderId, state: String },
}

/// Callback handler
pub struct CallbackHandler {
    config: Arc<GatewayConfig>,
    store: Arc<dyn OrderStore>,
    provider: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn Notifier>,
}

impl CallbackHandler {
    pub fn new(
        config: Arc<GatewayConfig>,
        store: Arc<dyn OrderStore>,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            store,
            provider,
            notifier,
        }
    }

    /// Process a callback
    ///
    /// `body` must be the raw request body: the signature covers the exact
    /// bytes KvaPay sent.
    pub fn handle(&self, body: &[u8], signature: Option<&str>) -> Result<CallbackOutcome> {
        if !self
            .provider
            .verify_signature(body, signature.unwrap_or_default())
        {
            tracing::warn!(
                body_len = body.len(),
                signature_present = signature.is_some(),
                "KvaPay callback signature invalid"
            );
            return Err(GatewayError::InvalidSignature);
        }

        let payload = CallbackPayload::from_slice(body).inspect_err(|e| {
            tracing::warn!(error = %e, "KvaPay callback rejected");
        })?;

        let order = self.load_order(&payload)?;

        let Some(state) = ProviderState::parse(&payload.state) else {
            tracing::info!(order_id = %order.id, state = %payload.state, "Ignoring unrecognized KvaPay state");
            return Ok(CallbackOutcome::UnrecognizedState {
                order_id: order.id,
                state: payload.state,
            });
        };

        let Some(target) = self.config.status_mapping.get(state).cloned() else {
            tracing::warn!(order_id = %order.id, state = %state, "KvaPay state has no status mapping");
            return Ok(CallbackOutcome::Unmapped {
                order_id: order.id,
                state,
            });
        };

        tracing::info!(
            order_id = %order.id,
            state = %state,
            mapped = %target,
            "Processing KvaPay callback"
        );

        match state {
            ProviderState::Success => self.apply_success(&order, &payload, &target),
            ProviderState::WaitingForConfirmation | ProviderState::Expired => {
                self.apply(&order, state, &target)?;
                Ok(CallbackOutcome::Applied {
                    order_id: order.id,
                    state,
                    order_status: target.status().cloned(),
                    payment_completed: false,
                })
            }
        }
    }

    /// Steps 3 and 4: the order exists and belongs to this gateway
    fn load_order(&self, payload: &CallbackPayload) -> Result<Order> {
        let order_id = OrderId::new(payload.variable_symbol.as_str());

        let order = self.store.get(&order_id)?.ok_or_else(|| {
            tracing::warn!(order_id = %order_id, "KvaPay callback for unknown order");
            GatewayError::OrderNotFound(order_id.to_string())
        })?;

        if order.payment_method != self.config.gateway_id {
            tracing::warn!(
                order_id = %order.id,
                payment_method = %order.payment_method,
                "KvaPay callback for order of another gateway"
            );
            return Err(GatewayError::PaymentMethodMismatch {
                order_id: order.id.to_string(),
                method: order.payment_method,
            });
        }

        Ok(order)
    }

    fn apply_success(
        &self,
        order: &Order,
        payload: &CallbackPayload,
        target: &MappedStatus,
    ) -> Result<CallbackOutcome> {
        if payload.amount < order.total {
            tracing::error!(
                order_id = %order.id,
                paid = %payload.amount,
                expected = %order.total,
                "KvaPay paid amount is lower than the order total, leaving order for review"
            );
            return Err(GatewayError::AmountMismatch {
                order_id: order.id.to_string(),
                paid: payload.amount,
                expected: order.total,
            });
        }

        let status_was = order.status.clone();

        self.apply(order, ProviderState::Success, target)?;

        let payment_completed = !order.is_paid() && self.store.payment_complete(&order.id)?;
        if payment_completed {
            tracing::info!(order_id = %order.id, amount = %payload.amount, "KvaPay payment complete");
        }

        self.recover_expired(order, &status_was)?;

        Ok(CallbackOutcome::Applied {
            order_id: order.id.clone(),
            state: ProviderState::Success,
            order_status: target.status().cloned(),
            payment_completed,
        })
    }

    /// Step 7: status transition (unless ignored) and audit note
    fn apply(&self, order: &Order, state: ProviderState, target: &MappedStatus) -> Result<()> {
        if let Some(status) = target.status() {
            self.store.set_status(&order.id, status)?;
        }
        self.store.add_note(&order.id, state.note())
    }

    /// A payment for an order that had already been moved to the expired
    /// status: the usual new-order emails were never sent, send them now.
    fn recover_expired(&self, order: &Order, status_was: &OrderStatus) -> Result<()> {
        let expired_status = self
            .config
            .status_mapping
            .get(ProviderState::Expired)
            .and_then(MappedStatus::status);

        if expired_status != Some(status_was) {
            return Ok(());
        }

        let Some(current) = self.store.get(&order.id)? else {
            return Ok(());
        };

        let processing = current.status == OrderStatus::processing();
        let completed = current.status == OrderStatus::completed();

        tracing::info!(
            order_id = %order.id,
            status = %current.status,
            "KvaPay payment recovered an expired order"
        );

        if processing {
            self.notifier
                .notify(Notification::CustomerProcessingOrder, &current);
        }
        if processing || completed {
            self.notifier.notify(Notification::AdminNewOrder, &current);
        }

        Ok(())
    }
}
