//! # Tradelink Exchange Integrations
//!
//! Venue connectors for algorithmic trading on the monoio runtime.
//!
//! ## Architecture
//!
//! - **monoio-based HTTPS transport** - single-threaded async, one round trip per operation
//! - **Signed REST requests** - HMAC payload signing with strictly increasing nonces
//! - **Explicit availability** - scalars read from venue documents are [`Extracted`] values
//! - **Unified interface** - every venue implements [`ExchangeConnector`]

#[cfg(feature = "bitfinex")]
pub mod bitfinex;
pub mod errors;
pub mod http;
pub mod traits;
pub mod types;

// Re-export main types
#[cfg(feature = "bitfinex")]
pub use bitfinex::{BitfinexConfig, BitfinexExchange};
pub use errors::{ExchangeError, Result};
pub use http::{HttpTransport, MonoioHttpsClient};
pub use traits::{ExchangeConnector, Transport};
pub use types::*;

/// Prelude for convenient imports
pub mod prelude {
    #[cfg(feature = "bitfinex")]
    pub use crate::bitfinex::{BitfinexConfig, BitfinexExchange};
    pub use crate::errors::{ExchangeError, Result};
    pub use crate::http::{HttpTransport, MonoioHttpsClient};
    pub use crate::traits::{ExchangeConnector, Transport};
    pub use crate::types::*;
    pub use tradelink_core::prelude::*;
}
