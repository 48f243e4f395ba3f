//! Gateway Error Types

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Gateway errors
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Callback signature missing or not matching the body
    #[error("KvaPay callback signature is not valid")]
    InvalidSignature,

    /// Callback body is not a valid payload
    #[error("Callback payload malformed: {0}")]
    MalformedPayload(String),

    /// Referenced order does not exist
    #[error("Order #{0} does not exist")]
    OrderNotFound(String),

    /// Order was placed with a different payment method
    #[error("Order #{order_id} payment method is {method}, not KvaPay")]
    PaymentMethodMismatch { order_id: String, method: String },

    /// Paid amount is lower than the order total
    #[error("KvaPay order #{order_id} amounts do not match: paid {paid}, expected {expected}")]
    AmountMismatch {
        order_id: String,
        paid: Decimal,
        expected: Decimal,
    },

    /// Order cannot be paid with this gateway
    #[error("Order #{order_id} cannot be paid: {reason}")]
    InvalidOrder { order_id: String, reason: String },

    /// Gateway is switched off
    #[error("KvaPay gateway is disabled")]
    Disabled,

    /// KvaPay API returned an error
    #[error("KvaPay API error: {0}")]
    Provider(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Order store error
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatewayError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Provider(_) | Self::Network(_) | Self::Storage(_)
        )
    }

    /// Get a message that is safe to show to the buyer
    pub fn user_message(&self) -> &str {
        match self {
            Self::Provider(_) | Self::Network(_) => {
                "Payment failed. Please try again or choose another payment method."
            }
            Self::OrderNotFound(_) => "Order not found.",
            Self::Config(_) | Self::Disabled => "Payment method is not available.",
            _ => "An error occurred processing your request.",
        }
    }
}
