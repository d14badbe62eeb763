//! Bitfinex authentication and request signing
//!
//! A signed request carries its whole payload in headers:
//!
//! - `X-BFX-APIKEY`: the API key
//! - `X-BFX-PAYLOAD`: `base64(json{"request": path, "nonce": "<n>", ...options})`
//! - `X-BFX-SIGNATURE`: `hex(hmac_sha384(secret, payload))`, computed over the
//!   base64 text, not the raw JSON

use crate::errors::{ExchangeError, Result};
use tradelink_core::prelude::*;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha384;
use tracing::debug;

type HmacSha384 = Hmac<Sha384>;

pub const HEADER_API_KEY: &str = "X-BFX-APIKEY";
pub const HEADER_SIGNATURE: &str = "X-BFX-SIGNATURE";
pub const HEADER_PAYLOAD: &str = "X-BFX-PAYLOAD";

/// Payload keys owned by the signer
const RESERVED_KEYS: [&str; 2] = ["request", "nonce"];

/// Bitfinex API credentials
#[derive(Clone)]
pub struct BitfinexCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl BitfinexCredentials {
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self { api_key, api_secret }
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("BITFINEX_API_KEY")
            .map_err(|_| ExchangeError::MissingCredentials("BITFINEX_API_KEY".to_string()))?;
        let api_secret = std::env::var("BITFINEX_SECRET_KEY")
            .map_err(|_| ExchangeError::MissingCredentials("BITFINEX_SECRET_KEY".to_string()))?;

        Ok(Self::new(api_key, api_secret))
    }

    /// Check if credentials are usable (non-empty)
    pub fn is_valid(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

impl std::fmt::Debug for BitfinexCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitfinexCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Bitfinex request signer
pub struct BitfinexSigner {
    credentials: BitfinexCredentials,
}

impl BitfinexSigner {
    pub fn new(credentials: BitfinexCredentials) -> Result<Self> {
        if !credentials.is_valid() {
            return Err(ExchangeError::InvalidCredentials);
        }

        Ok(Self { credentials })
    }

    pub fn api_key(&self) -> &str {
        &self.credentials.api_key
    }

    /// Sign a request with the next process-wide nonce
    pub fn sign_request(&self, request: &str, options: Option<&Map<String, Value>>) -> Result<SignedRequest> {
        self.sign_with_nonce(request, next_nonce(), options)
    }

    /// Sign a request with an explicit nonce; deterministic in all inputs
    pub fn sign_with_nonce(
        &self,
        request: &str,
        nonce: u64,
        options: Option<&Map<String, Value>>,
    ) -> Result<SignedRequest> {
        let body = build_payload(request, nonce, options)?;
        let payload = STANDARD.encode(body.as_bytes());
        let signature = self.create_signature(&payload)?;

        debug!("🔐 Signed request: {} (nonce {})", request, nonce);

        Ok(SignedRequest {
            request: request.to_string(),
            nonce,
            api_key: self.credentials.api_key.clone(),
            payload,
            signature,
        })
    }

    /// Create HMAC-SHA384 signature, hex encoded
    fn create_signature(&self, message: &str) -> Result<String> {
        let mut mac = HmacSha384::new_from_slice(self.credentials.api_secret.as_bytes())
            .map_err(|e| ExchangeError::SigningError(format!("HMAC setup failed: {e}")))?;

        mac.update(message.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Validate a payload signature (for testing)
    pub fn validate_signature(&self, payload: &str, signature: &str) -> bool {
        match self.create_signature(payload) {
            Ok(expected) => expected == signature,
            Err(_) => false,
        }
    }
}

/// JSON payload text: `request`, `nonce`, then the options in their given order.
pub fn build_payload(request: &str, nonce: u64, options: Option<&Map<String, Value>>) -> Result<String> {
    let mut body = Map::new();
    body.insert("request".to_string(), Value::String(request.to_string()));
    body.insert("nonce".to_string(), Value::String(nonce.to_string()));

    for (key, value) in options.into_iter().flatten() {
        if RESERVED_KEYS.contains(&key.as_str()) {
            return Err(ExchangeError::SigningError(format!("option {key:?} would override the signed {key}")));
        }
        body.insert(key.clone(), value.clone());
    }

    Ok(serde_json::to_string(&Value::Object(body))?)
}

/// Authentication material for one request
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub request: String,
    pub nonce: u64,
    pub api_key: String,
    /// Base64-encoded JSON payload
    pub payload: String,
    /// Hex-encoded HMAC-SHA384 of `payload`
    pub signature: String,
}

impl SignedRequest {
    /// The three authentication headers, in wire order
    pub fn headers(&self) -> [(&'static str, &str); 3] {
        [
            (HEADER_API_KEY, self.api_key.as_str()),
            (HEADER_SIGNATURE, self.signature.as_str()),
            (HEADER_PAYLOAD, self.payload.as_str()),
        ]
    }

    /// The JSON payload the venue will see after base64 decoding
    pub fn decoded_payload(&self) -> Result<Value> {
        let bytes = STANDARD
            .decode(&self.payload)
            .map_err(|e| ExchangeError::SigningError(format!("payload is not base64: {e}")))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
