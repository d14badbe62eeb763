//! Bitfinex v1 REST client
//!
//! Public endpoints are plain GETs; private ones are POSTs whose whole request
//! travels in the signed `X-BFX-*` headers. Every document received passes
//! through [`check_response`] before it is handed back.

use crate::bitfinex::auth::{BitfinexCredentials, BitfinexSigner};
use crate::errors::{ExchangeError, Result};
use crate::http::HttpTransport;
use crate::traits::Transport;
use tradelink_core::prelude::*;

use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use url::Url;

/// Venue name used in diagnostics
pub const VENUE: &str = "Bitfinex";

pub const TICKER_PATH: &str = "/v1/ticker";
pub const BOOK_PATH: &str = "/v1/book";
pub const BALANCES_PATH: &str = "/v1/balances";
pub const NEW_ORDER_PATH: &str = "/v1/order/new";
pub const ORDER_STATUS_PATH: &str = "/v1/order/status";
pub const POSITIONS_PATH: &str = "/v1/positions";

/// Bitfinex connector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitfinexConfig {
    pub api_key: String,
    #[serde(default, skip_serializing)]
    pub api_secret: String,
    pub base_url: String,
    /// Extra CA bundle (PEM) trusted on top of the webpki roots
    pub cacert: Option<PathBuf>,
    pub symbol: String,
    /// Multiplier on the target volume of a price-impact walk
    pub order_book_factor: f64,
}

impl Default for BitfinexConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            base_url: "https://api.bitfinex.com".to_string(),
            cacert: None,
            symbol: "btcusd".to_string(),
            order_book_factor: 1.0,
        }
    }
}

impl BitfinexConfig {
    /// Defaults overridden by `BITFINEX_*` environment variables.
    ///
    /// Credentials are required; base URL, CA bundle and order book factor are
    /// optional.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default().with_env_credentials()?;

        if let Ok(base_url) = std::env::var("BITFINEX_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(cacert) = std::env::var("BITFINEX_CACERT") {
            config.cacert = Some(PathBuf::from(cacert));
        }
        if let Ok(factor) = std::env::var("BITFINEX_ORDER_BOOK_FACTOR") {
            config.order_book_factor = factor.trim().parse().map_err(|_| {
                ExchangeError::ConfigurationError(format!("BITFINEX_ORDER_BOOK_FACTOR is not a number: {factor:?}"))
            })?;
        }

        Ok(config)
    }

    pub fn with_credentials(mut self, api_key: String, api_secret: String) -> Self {
        self.api_key = api_key;
        self.api_secret = api_secret;
        self
    }

    pub fn with_env_credentials(mut self) -> Result<Self> {
        let credentials = BitfinexCredentials::from_env()?;
        self.api_key = credentials.api_key;
        self.api_secret = credentials.api_secret;
        Ok(self)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_cacert(mut self, path: impl Into<PathBuf>) -> Self {
        self.cacert = Some(path.into());
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    pub fn with_order_book_factor(mut self, factor: f64) -> Self {
        self.order_book_factor = factor;
        self
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url)
            .map_err(|e| ExchangeError::ConfigurationError(format!("base_url {:?}: {e}", self.base_url)))?;

        if self.symbol.is_empty() {
            return Err(ExchangeError::ConfigurationError("symbol is empty".to_string()));
        }
        if !self.order_book_factor.is_finite() || self.order_book_factor < 1.0 {
            return Err(ExchangeError::ConfigurationError(format!(
                "order_book_factor must be >= 1.0, got {}",
                self.order_book_factor
            )));
        }

        Ok(())
    }

    /// Upper-cased base currency of `symbol` ("btcusd" -> "BTC")
    pub fn base_currency(&self) -> String {
        self.symbol.chars().take(3).collect::<String>().to_uppercase()
    }

    pub fn credentials(&self) -> BitfinexCredentials {
        BitfinexCredentials::new(self.api_key.clone(), self.api_secret.clone())
    }
}

/// Log the venue's `message` field, if any, and hand the document back untouched
pub fn check_response(document: Value) -> Value {
    if let Some(message) = document.get("message") {
        match message.as_str() {
            Some(text) => warn!("⚠️ {VENUE} error with response: {text}"),
            None => warn!("⚠️ {VENUE} error with response: {message}"),
        }
    }
    document
}

/// Bitfinex REST client over any [`Transport`]
pub struct BitfinexRestClient<T: Transport = HttpTransport> {
    config: BitfinexConfig,
    signer: BitfinexSigner,
    transport: T,
}

impl BitfinexRestClient<HttpTransport> {
    /// Create a client speaking HTTPS to `config.base_url`
    pub fn new(config: BitfinexConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config.base_url, config.cacert.as_deref())?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> BitfinexRestClient<T> {
    pub fn with_transport(config: BitfinexConfig, transport: T) -> Result<Self> {
        config.validate()?;
        let signer = BitfinexSigner::new(config.credentials())?;

        info!("🔗 {} REST client created", VENUE);
        info!("   Base URL: {}", config.base_url);
        info!("   Symbol: {} (factor {})", config.symbol, config.order_book_factor);

        Ok(Self { config, signer, transport })
    }

    pub fn config(&self) -> &BitfinexConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// `GET /v1/ticker/{symbol}`
    pub async fn ticker(&self) -> Result<Value> {
        self.public_get(&format!("{TICKER_PATH}/{}", self.config.symbol)).await
    }

    /// `GET /v1/book/{symbol}`
    pub async fn order_book(&self) -> Result<Value> {
        self.public_get(&format!("{BOOK_PATH}/{}", self.config.symbol)).await
    }

    pub async fn balances(&self) -> Result<Value> {
        self.auth_request(BALANCES_PATH, None).await
    }

    pub async fn new_order(&self, options: &Map<String, Value>) -> Result<Value> {
        self.auth_request(NEW_ORDER_PATH, Some(options)).await
    }

    pub async fn order_status(&self, order_id: u64) -> Result<Value> {
        let mut options = Map::new();
        options.insert("order_id".to_string(), Value::from(order_id));
        self.auth_request(ORDER_STATUS_PATH, Some(&options)).await
    }

    pub async fn positions(&self) -> Result<Value> {
        self.auth_request(POSITIONS_PATH, None).await
    }

    async fn public_get(&self, path: &str) -> Result<Value> {
        let timer = PerfTimer::start(format!("bitfinex_get_{path}"));
        let document = self.transport.get_request(path).await?;
        timer.log_elapsed();
        Ok(check_response(document))
    }

    /// Sign `request` with a fresh nonce and POST it
    async fn auth_request(&self, request: &str, options: Option<&Map<String, Value>>) -> Result<Value> {
        let timer = PerfTimer::start(format!("bitfinex_signed_{request}"));
        let signed = self.signer.sign_request(request, options)?;

        debug!("📡 POST {} (signed, nonce {})", request, signed.nonce);

        let document = self.transport.post_request(request, &signed.headers()).await?;
        timer.log_elapsed();
        Ok(check_response(document))
    }
}
