//! Order Store
//!
//! The store owns orders; the gateway only reads them and asks for
//! transitions. [`MemoryOrderStore`] backs development servers and tests.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{GatewayError, Result};

/// Store order identifier, carried by KvaPay as the variable symbol
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Order status slug (`pending`, `processing`, `completed`, ...)
///
/// The set is open-ended: stores and extensions register their own.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderStatus(String);

impl OrderStatus {
    const ADMIN_PREFIX: &'static str = "wc-";

    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// Parse an admin-facing value, dropping the `wc-` prefix
    pub fn from_admin(value: &str) -> Self {
        Self::new(value.strip_prefix(Self::ADMIN_PREFIX).unwrap_or(value))
    }

    pub fn pending() -> Self {
        Self::new("pending")
    }

    pub fn processing() -> Self {
        Self::new("processing")
    }

    pub fn completed() -> Self {
        Self::new("completed")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Buyer contact details
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BillingDetails {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl BillingDetails {
    /// Full name as sent to KvaPay
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Entry in the order's audit log
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderNote {
    pub note: String,
    pub added_at: DateTime<Utc>,
}

/// A store order
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,

    /// Secret key used in buyer-facing URLs
    pub key: String,

    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,

    /// ISO currency code
    pub currency: String,

    pub billing: BillingDetails,

    pub status: OrderStatus,

    /// Gateway the order was placed with
    pub payment_method: String,

    pub notes: Vec<OrderNote>,

    /// Set once by `payment_complete`
    pub date_paid: Option<DateTime<Utc>>,

    /// Stock is reduced at most once per order
    pub stock_reduced: bool,

    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a new pending order
    pub fn new(
        id: impl Into<OrderId>,
        total: Decimal,
        currency: impl Into<String>,
        billing: BillingDetails,
        payment_method: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            key: format!("wc_order_{}", &uuid::Uuid::new_v4().simple().to_string()[..13]),
            total,
            currency: currency.into(),
            billing,
            status: OrderStatus::pending(),
            payment_method: payment_method.into(),
            notes: Vec::new(),
            date_paid: None,
            stock_reduced: false,
            created_at: Utc::now(),
        }
    }

    pub const fn is_paid(&self) -> bool {
        self.date_paid.is_some()
    }
}

/// Order storage trait
///
/// `set_status` to the current status must succeed as a no-op: KvaPay
/// retries callbacks and the handler takes no locks.
pub trait OrderStore: Send + Sync {
    /// Save or replace an order
    fn save(&self, order: &Order) -> Result<()>;

    /// Get order by id
    fn get(&self, id: &OrderId) -> Result<Option<Order>>;

    /// Move an order to a status
    fn set_status(&self, id: &OrderId, status: &OrderStatus) -> Result<()>;

    /// Append a note to the order's audit log
    fn add_note(&self, id: &OrderId, note: &str) -> Result<()>;

    /// Record the payment. Returns `false` if the order was already paid.
    fn payment_complete(&self, id: &OrderId) -> Result<bool>;

    /// Decrement reserved stock for the order's items
    fn reduce_stock(&self, id: &OrderId) -> Result<()>;

    /// Clear the buyer's active cart
    fn empty_cart(&self, id: &OrderId) -> Result<()>;

    /// URL the buyer lands on when the payment fails or is cancelled
    fn cancel_url(&self, order: &Order) -> String;

    /// URL the buyer lands on after a successful payment
    fn return_url(&self, order: &Order) -> String;
}

/// In-memory order store (for development)
pub struct MemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
    emptied_carts: RwLock<HashSet<OrderId>>,
    base_url: String,
}

impl Default for MemoryOrderStore {
    fn default() -> Self {
        Self::new("http://localhost:3000")
    }
}

impl MemoryOrderStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            emptied_carts: RwLock::new(HashSet::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Whether `empty_cart` ran for this order
    pub fn cart_emptied(&self, id: &OrderId) -> bool {
        self.emptied_carts
            .read()
            .map(|carts| carts.contains(id))
            .unwrap_or(false)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<OrderId, Order>>> {
        self.orders
            .read()
            .map_err(|_| GatewayError::Storage("order store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<OrderId, Order>>> {
        self.orders
            .write()
            .map_err(|_| GatewayError::Storage("order store lock poisoned".into()))
    }

    fn update<T>(&self, id: &OrderId, f: impl FnOnce(&mut Order) -> T) -> Result<T> {
        let mut orders = self.write()?;
        let order = orders
            .get_mut(id)
            .ok_or_else(|| GatewayError::OrderNotFound(id.to_string()))?;
        Ok(f(order))
    }
}

impl OrderStore for MemoryOrderStore {
    fn save(&self, order: &Order) -> Result<()> {
        self.write()?.insert(order.id.clone(), order.clone());
        Ok(())
    }

    fn get(&self, id: &OrderId) -> Result<Option<Order>> {
        Ok(self.read()?.get(id).cloned())
    }

    fn set_status(&self, id: &OrderId, status: &OrderStatus) -> Result<()> {
        self.update(id, |order| {
            if order.status == *status {
                return;
            }
            let note = format!("Order status changed from {} to {}.", order.status, status);
            tracing::debug!(order_id = %id, from = %order.status, to = %status, "Order status changed");
            order.status = status.clone();
            order.notes.push(OrderNote {
                note,
                added_at: Utc::now(),
            });
        })
    }

    fn add_note(&self, id: &OrderId, note: &str) -> Result<()> {
        self.update(id, |order| {
            order.notes.push(OrderNote {
                note: note.to_string(),
                added_at: Utc::now(),
            });
        })
    }

    fn payment_complete(&self, id: &OrderId) -> Result<bool> {
        self.update(id, |order| {
            if order.date_paid.is_some() {
                return false;
            }
            order.date_paid = Some(Utc::now());
            true
        })
    }

    fn reduce_stock(&self, id: &OrderId) -> Result<()> {
        self.update(id, |order| {
            if !order.stock_reduced {
                order.stock_reduced = true;
                order.notes.push(OrderNote {
                    note: "Stock levels reduced.".into(),
                    added_at: Utc::now(),
                });
            }
        })
    }

    fn empty_cart(&self, id: &OrderId) -> Result<()> {
        self.emptied_carts
            .write()
            .map_err(|_| GatewayError::Storage("cart lock poisoned".into()))?
            .insert(id.clone());
        Ok(())
    }

    fn cancel_url(&self, order: &Order) -> String {
        format!(
            "{}/cart/?cancel_order=true&order={}&order_id={}",
            self.base_url, order.key, order.id
        )
    }

    fn return_url(&self, order: &Order) -> String {
        format!(
            "{}/checkout/order-received/{}?key={}",
            self.base_url, order.id, order.key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_order() -> Order {
        Order::new(
            "42",
            dec!(100.00),
            "USD",
            BillingDetails {
                email: "buyer@example.com".into(),
                first_name: "Jane".into(),
                last_name: "Doe".into(),
            },
            "kvapay",
        )
    }

    #[test]
    fn test_new_order_is_pending() {
        let order = sample_order();
        assert_eq!(order.status, OrderStatus::pending());
        assert!(!order.is_paid());
        assert!(order.key.starts_with("wc_order_"));
        assert_eq!(order.billing.full_name(), "Jane Doe");
    }

    #[test]
    fn test_status_from_admin() {
        assert_eq!(OrderStatus::from_admin("wc-processing"), OrderStatus::processing());
        assert_eq!(OrderStatus::from_admin("completed"), OrderStatus::completed());
    }

    #[test]
    fn test_set_same_status_is_noop() {
        let store = MemoryOrderStore::default();
        let order = sample_order();
        store.save(&order).unwrap();

        store.set_status(&order.id, &OrderStatus::processing()).unwrap();
        store.set_status(&order.id, &OrderStatus::processing()).unwrap();

        let loaded = store.get(&order.id).unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::processing());
        assert_eq!(loaded.notes.len(), 1);
    }

    #[test]
    fn test_payment_complete_once() {
        let store = MemoryOrderStore::default();
        let order = sample_order();
        store.save(&order).unwrap();

        assert!(store.payment_complete(&order.id).unwrap());
        let paid_at = store.get(&order.id).unwrap().unwrap().date_paid;
        assert!(!store.payment_complete(&order.id).unwrap());
        assert_eq!(store.get(&order.id).unwrap().unwrap().date_paid, paid_at);
    }

    #[test]
    fn test_reduce_stock_once() {
        let store = MemoryOrderStore::default();
        let order = sample_order();
        store.save(&order).unwrap();

        store.reduce_stock(&order.id).unwrap();
        store.reduce_stock(&order.id).unwrap();

        let loaded = store.get(&order.id).unwrap().unwrap();
        assert!(loaded.stock_reduced);
        assert_eq!(loaded.notes.len(), 1);
    }

    #[test]
    fn test_missing_order_update_fails() {
        let store = MemoryOrderStore::default();
        let result = store.add_note(&OrderId::new("404"), "hello");
        assert!(matches!(result, Err(GatewayError::OrderNotFound(id)) if id == "404"));
    }

    #[test]
    fn test_urls_carry_order_key() {
        let store = MemoryOrderStore::new("https://shop.example/");
        let order = sample_order();
        assert_eq!(
            store.return_url(&order),
            format!("https://shop.example/checkout/order-received/42?key={}", order.key)
        );
        assert!(store.cancel_url(&order).contains("order_id=42"));
        assert!(store.cancel_url(&order).starts_with("https://shop.example/cart/"));
    }
}
