//! Mock Payment Provider
//!
//! For testing and local development. Records every request and answers with a
//! fixed link, or fails on demand.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{PaymentLink, PaymentProvider, PaymentRequest};
use crate::error::{GatewayError, Result};
use crate::signature::HmacSigner;

/// Mock provider with a real HMAC signer
pub struct MockPaymentProvider {
    signer: HmacSigner,
    link_base: String,
    fail_with: Option<String>,
    requests: Mutex<Vec<PaymentRequest>>,
}

impl MockPaymentProvider {
    pub fn new(api_secret: &str) -> Self {
        Self {
            signer: HmacSigner::new(api_secret),
            link_base: "https://pay.kvapay.test/l".into(),
            fail_with: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Make every session request fail with this provider message
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// Signer callers can use to produce valid callbacks
    pub const fn signer(&self) -> &HmacSigner {
        &self.signer
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_payment_link(&self, request: &PaymentRequest) -> Result<PaymentLink> {
        self.requests
            .lock()
            .map_err(|_| GatewayError::Provider("mock lock poisoned".into()))?
            .push(request.clone());

        if let Some(message) = &self.fail_with {
            return Err(GatewayError::Provider(message.clone()));
        }

        Ok(PaymentLink {
            short_link: format!("{}/{}", self.link_base, request.variable_symbol),
        })
    }

    fn verify_signature(&self, body: &[u8], signature: &str) -> bool {
        self.signer.verify(body, signature)
    }

    fn name(&self) -> &str {
        "MockKvaPay"
    }
}
