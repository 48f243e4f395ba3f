//! Status Mapping
//!
//! Translates KvaPay payment states into store order statuses. The mapping is
//! configured per installation; entries left unconfigured fall back to
//! [`StatusMapping::default`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::order::OrderStatus;

/// Payment state reported by KvaPay in a callback
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderState {
    /// Payment confirmed on the network and credited to the merchant
    Success,
    /// Shopper paid, blockchain confirmation pending
    WaitingForConfirmation,
    /// Invoice expired without payment
    Expired,
}

impl ProviderState {
    pub const ALL: [Self; 3] = [Self::Success, Self::WaitingForConfirmation, Self::Expired];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::WaitingForConfirmation => "WAITING_FOR_CONFIRMATION",
            Self::Expired => "EXPIRED",
        }
    }

    /// Parse a state code; `None` for anything KvaPay may add later
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.as_str() == code)
    }

    /// Audit note appended to the order when this state is applied
    pub const fn note(&self) -> &'static str {
        match self {
            Self::Success => {
                "Payment is confirmed on the network, and has been credited to the merchant. \
                 Purchased goods/services can be securely delivered to the buyer."
            }
            Self::WaitingForConfirmation => {
                "Shopper transferred the payment for the invoice. \
                 Awaiting blockchain network confirmation."
            }
            Self::Expired => "Buyer did not pay within the required time and the invoice expired.",
        }
    }
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of a mapping entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MappedStatus {
    /// Leave the order status untouched
    Ignore,
    /// Move the order to this status
    Status(OrderStatus),
}

impl MappedStatus {
    pub const IGNORE: &'static str = "ignore";

    /// Parse an admin value: `ignore`, `wc-processing` or a bare `processing`
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value == Self::IGNORE {
            Self::Ignore
        } else {
            Self::Status(OrderStatus::from_admin(value))
        }
    }

    pub const fn status(&self) -> Option<&OrderStatus> {
        match self {
            Self::Ignore => None,
            Self::Status(status) => Some(status),
        }
    }
}

impl fmt::Display for MappedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignore => f.write_str(Self::IGNORE),
            Self::Status(status) => write!(f, "wc-{status}"),
        }
    }
}

/// Provider state → order status mapping
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMapping {
    entries: HashMap<ProviderState, MappedStatus>,
}

impl Default for StatusMapping {
    fn default() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            ProviderState::Success,
            MappedStatus::Status(OrderStatus::processing()),
        );
        entries.insert(ProviderState::WaitingForConfirmation, MappedStatus::Ignore);
        entries.insert(ProviderState::Expired, MappedStatus::Ignore);
        Self { entries }
    }
}

impl StatusMapping {
    /// A mapping with no entries; every state is left unmapped
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Set the target for a state
    #[must_use]
    pub fn with(mut self, state: ProviderState, target: MappedStatus) -> Self {
        self.entries.insert(state, target);
        self
    }

    pub fn set(&mut self, state: ProviderState, target: MappedStatus) {
        self.entries.insert(state, target);
    }

    /// Look up the target for a state
    pub fn get(&self, state: ProviderState) -> Option<&MappedStatus> {
        self.entries.get(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_state() {
        assert_eq!(ProviderState::parse("SUCCESS"), Some(ProviderState::Success));
        assert_eq!(
            ProviderState::parse("WAITING_FOR_CONFIRMATION"),
            Some(ProviderState::WaitingForConfirmation)
        );
        assert_eq!(ProviderState::parse("success"), None);
        assert_eq!(ProviderState::parse("REFUNDED"), None);
    }

    #[test]
    fn test_mapped_status_parse() {
        assert_eq!(MappedStatus::parse("ignore"), MappedStatus::Ignore);
        assert_eq!(MappedStatus::parse(" ignore "), MappedStatus::Ignore);
        assert_eq!(
            MappedStatus::parse("wc-completed"),
            MappedStatus::Status(OrderStatus::completed())
        );
        assert_eq!(
            MappedStatus::parse("on-hold"),
            MappedStatus::Status(OrderStatus::new("on-hold"))
        );
        assert_eq!(MappedStatus::parse("wc-on-hold").to_string(), "wc-on-hold");
    }

    #[test]
    fn test_default_mapping() {
        let mapping = StatusMapping::default();
        assert_eq!(
            mapping.get(ProviderState::Success),
            Some(&MappedStatus::Status(OrderStatus::processing()))
        );
        assert_eq!(mapping.get(ProviderState::Expired), Some(&MappedStatus::Ignore));
        assert_eq!(StatusMapping::empty().get(ProviderState::Success), None);
    }
}
