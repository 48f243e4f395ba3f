//! Request Signatures
//!
//! KvaPay signs callback bodies with HMAC-SHA256 keyed by the API secret and
//! sends the lowercase hex digest in the `X-Signature` header. Outbound API
//! requests are signed the same way.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "x-signature";

/// HMAC-SHA256 signer bound to a shared secret
#[derive(Clone)]
pub struct HmacSigner {
    secret: Vec<u8>,
}

impl HmacSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length")
    }

    /// Hex signature of `body`
    pub fn generate(&self, body: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Check a hex signature against `body` in constant time
    pub fn verify(&self, body: &[u8], provided: &str) -> bool {
        let Ok(provided) = hex::decode(provided.trim()) else {
            return false;
        };
        let mut mac = self.mac();
        mac.update(body);
        mac.verify_slice(&provided).is_ok()
    }
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner").field("secret", &"****").finish()
    }
}
