//! Gateway Configuration
//!
//! Settings an installation configures once: credentials, test mode, buyer
//! facing texts and the status mapping. Passed explicitly to the checkout
//! initiator and callback handler.

use std::fmt;

use crate::error::{GatewayError, Result};
use crate::status::{MappedStatus, ProviderState, StatusMapping};

/// Payment method id stored on orders placed with this gateway
pub const GATEWAY_ID: &str = "kvapay";

/// Live API base URL
pub const LIVE_API_URL: &str = "https://api.kvapay.com/api/v1";

/// Test API base URL (separate account and credentials)
pub const TEST_API_URL: &str = "https://api.dev.kvapay.com/api/v1";

/// Gateway configuration
#[derive(Clone)]
pub struct GatewayConfig {
    /// Payment method id orders must carry
    pub gateway_id: String,

    /// Payment method title shown at checkout
    pub title: String,

    /// Payment method description shown at checkout and on the thank-you page
    pub description: String,

    pub enabled: bool,

    pub api_key: String,

    /// Shared secret for signatures
    pub api_secret: String,

    /// Use the KvaPay test environment
    pub test_mode: bool,

    /// Overrides the live/test base URL
    pub api_url: Option<String>,

    /// Outbound request timeout in seconds
    pub request_timeout_secs: u64,

    pub status_mapping: StatusMapping,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gateway_id: GATEWAY_ID.into(),
            title: "Cryptocurrencies via KvaPay".into(),
            description: "Pay with BTC, LTC, ETH, USDT and other cryptocurrencies. Powered by KvaPay."
                .into(),
            enabled: true,
            api_key: String::new(),
            api_secret: String::new(),
            test_mode: false,
            api_url: None,
            request_timeout_secs: 30,
            status_mapping: StatusMapping::default(),
        }
    }
}

impl GatewayConfig {
    /// Create with credentials and defaults for everything else
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            ..Default::default()
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("KVAPAY_API_KEY")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| GatewayError::Config("KVAPAY_API_KEY not set".into()))?;
        let api_secret = lookup("KVAPAY_API_SECRET")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| GatewayError::Config("KVAPAY_API_SECRET not set".into()))?;

        let defaults = Self::default();

        let mut status_mapping = StatusMapping::default();
        for state in ProviderState::ALL {
            // Blank keeps the default entry
            if let Some(value) = lookup(&format!("KVAPAY_STATUS_{}", state.as_str()))
                .filter(|v| !v.trim().is_empty())
            {
                status_mapping.set(state, MappedStatus::parse(&value));
            }
        }

        let request_timeout_secs = match lookup("KVAPAY_TIMEOUT_SECS") {
            Some(v) => v
                .parse()
                .map_err(|_| GatewayError::Config(format!("KVAPAY_TIMEOUT_SECS invalid: {v}")))?,
            None => defaults.request_timeout_secs,
        };

        Ok(Self {
            gateway_id: defaults.gateway_id,
            title: lookup("KVAPAY_TITLE").unwrap_or(defaults.title),
            description: lookup("KVAPAY_DESCRIPTION").unwrap_or(defaults.description),
            enabled: lookup("KVAPAY_ENABLED").map_or(defaults.enabled, |v| parse_flag(&v)),
            api_key,
            api_secret,
            test_mode: lookup("KVAPAY_TEST").is_some_and(|v| parse_flag(&v)),
            api_url: lookup("KVAPAY_API_URL").filter(|v| !v.is_empty()),
            request_timeout_secs,
            status_mapping,
        })
    }

    /// Base URL for API requests
    pub fn api_base_url(&self) -> &str {
        match &self.api_url {
            Some(url) => url.trim_end_matches('/'),
            None if self.test_mode => TEST_API_URL,
            None => LIVE_API_URL,
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("gateway_id", &self.gateway_id)
            .field("title", &self.title)
            .field("enabled", &self.enabled)
            .field("api_key", &"****")
            .field("api_secret", &"****")
            .field("test_mode", &self.test_mode)
            .field("api_url", &self.api_base_url())
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("status_mapping", &self.status_mapping)
            .finish()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_requires_credentials() {
        let result = GatewayConfig::from_lookup(lookup(&[("KVAPAY_API_KEY", "key")]));
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("KVAPAY_API_KEY", "key"),
            ("KVAPAY_API_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.gateway_id, "kvapay");
        assert!(config.enabled);
        assert!(!config.test_mode);
        assert_eq!(config.api_base_url(), LIVE_API_URL);
        assert_eq!(config.status_mapping, StatusMapping::default());
    }

    #[test]
    fn test_status_overrides_and_test_mode() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("KVAPAY_API_KEY", "key"),
            ("KVAPAY_API_SECRET", "secret"),
            ("KVAPAY_TEST", "yes"),
            ("KVAPAY_STATUS_SUCCESS", "wc-completed"),
            ("KVAPAY_STATUS_EXPIRED", "wc-cancelled"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url(), TEST_API_URL);
        assert_eq!(
            config.status_mapping.get(ProviderState::Success),
            Some(&MappedStatus::Status(OrderStatus::completed()))
        );
        assert_eq!(
            config.status_mapping.get(ProviderState::Expired),
            Some(&MappedStatus::Status(OrderStatus::new("cancelled")))
        );
        assert_eq!(
            config.status_mapping.get(ProviderState::WaitingForConfirmation),
            Some(&MappedStatus::Ignore)
        );
    }

    #[test]
    fn test_blank_status_keeps_default() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("KVAPAY_API_KEY", "key"),
            ("KVAPAY_API_SECRET", "secret"),
            ("KVAPAY_STATUS_SUCCESS", ""),
            ("KVAPAY_STATUS_EXPIRED", "  "),
        ]))
        .unwrap();

        assert_eq!(
            config.status_mapping.get(ProviderState::Success),
            Some(&MappedStatus::Status(OrderStatus::processing()))
        );
        assert_eq!(config.status_mapping, StatusMapping::default());
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let config = GatewayConfig::new("public-api-key", "super-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("public-api-key"));
    }
}
