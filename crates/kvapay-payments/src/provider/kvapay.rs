//! KvaPay HTTP Client

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{PaymentLink, PaymentProvider, PaymentRequest};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::signature::{HmacSigner, SIGNATURE_HEADER};

const API_KEY_HEADER: &str = "x-api-key";
const SHORT_LINK_PATH: &str = "/payment/short-link";

/// Error body returned by the KvaPay API
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// KvaPay API client
pub struct KvapayClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    signer: HmacSigner,
}

impl KvapayClient {
    /// Create from gateway configuration
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("kvapay-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url().to_string(),
            api_key: config.api_key.clone(),
            signer: HmacSigner::new(&config.api_secret),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the signed short-link request
    fn build_request(&self, request: &PaymentRequest) -> Result<reqwest::RequestBuilder> {
        let body = serde_json::to_vec(request)?;
        let signature = self.signer.generate(&body);

        Ok(self
            .http
            .post(format!("{}{}", self.base_url, SHORT_LINK_PATH))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .header(SIGNATURE_HEADER, signature)
            .body(body))
    }
}

/// Turn an error response into a provider error
fn api_error(status: reqwest::StatusCode, body: &str) -> GatewayError {
    let detail = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| body.chars().take(200).collect());
    GatewayError::Provider(format!("{status}: {detail}"))
}

#[async_trait]
impl PaymentProvider for KvapayClient {
    async fn create_payment_link(&self, request: &PaymentRequest) -> Result<PaymentLink> {
        tracing::debug!(
            order_id = %request.variable_symbol,
            amount = %request.amount,
            currency = %request.currency,
            "Creating KvaPay payment link"
        );

        let response = self.build_request(request)?.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let link: PaymentLink = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Provider(format!("unexpected response: {e}")))?;

        if link.short_link.is_empty() {
            return Err(GatewayError::Provider("No payment link returned".into()));
        }

        Ok(link)
    }

    fn verify_signature(&self, body: &[u8], signature: &str) -> bool {
        self.signer.verify(body, signature)
    }

    fn name(&self) -> &str {
        "KvaPay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> PaymentRequest {
        PaymentRequest {
            variable_symbol: "42".into(),
            amount: dec!(100.50),
            symbol: "USD".into(),
            currency: "USD".into(),
            fail_url: "https://shop.example/cart".into(),
            success_url: "https://shop.example/checkout/order-received/42".into(),
            timestamp: 1_700_000_000,
            email: "buyer@example.com".into(),
            name: "Jane Doe".into(),
        }
    }

    #[test]
    fn test_base_url_follows_test_mode() {
        let mut config = GatewayConfig::new("key", "secret");
        config.test_mode = true;
        let client = KvapayClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), crate::config::TEST_API_URL);
    }

    #[test]
    fn test_request_is_signed() {
        let client = KvapayClient::from_config(&GatewayConfig::new("key", "secret")).unwrap();
        let built = client.build_request(&request()).unwrap().build().unwrap();

        assert_eq!(
            built.url().as_str(),
            "https://api.kvapay.com/api/v1/payment/short-link"
        );
        assert_eq!(built.headers()[API_KEY_HEADER], "key");

        let body = built.body().and_then(reqwest::Body::as_bytes).unwrap();
        let signature = built.headers()[SIGNATURE_HEADER].to_str().unwrap();
        assert!(HmacSigner::new("secret").verify(body, signature));

        let json: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json["variableSymbol"], "42");
        assert_eq!(json["amount"], 100.5);
        assert_eq!(json["failUrl"], "https://shop.example/cart");
    }

    #[test]
    fn test_api_error_message() {
        let err = api_error(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"message":"Invalid API key"}"#,
        );
        assert_eq!(err.to_string(), "KvaPay API error: 401 Unauthorized: Invalid API key");

        let err = api_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert!(err.to_string().contains("upstream down"));
    }

    #[test]
    fn test_parse_short_link() {
        let link: PaymentLink =
            serde_json::from_str(r#"{"shortLink":"https://pay.kvapay.com/abc","id":7}"#).unwrap();
        assert_eq!(link.short_link, "https://pay.kvapay.com/abc");
    }
}
