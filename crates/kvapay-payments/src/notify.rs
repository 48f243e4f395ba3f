//! Order Notifications
//!
//! Emails the store sends when a payment recovers an expired order.

use crate::order::Order;

/// Notification kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notification {
    /// Tell the buyer their order is being processed
    CustomerProcessingOrder,
    /// Tell the shop admin a new order arrived
    AdminNewOrder,
}

/// Notification sink
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification, order: &Order);
}

/// Notifier that only logs (for development)
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification, order: &Order) {
        tracing::info!(
            order_id = %order.id,
            email = %order.billing.email,
            notification = ?notification,
            "Sending order notification"
        );
    }
}
