//! Exchange traits defining common interfaces
//!
//! Futures run on the single-threaded monoio runtime and are not `Send`.

use crate::errors::Result;
use crate::types::*;
use async_trait::async_trait;
use serde_json::Value;

/// Request/response transport to a venue's REST API.
///
/// Paths are relative to the venue base URL; documents come back parsed.
#[async_trait(?Send)]
pub trait Transport {
    /// Unauthenticated GET
    async fn get_request(&self, path: &str) -> Result<Value>;

    /// POST carrying authentication headers
    async fn post_request(&self, path: &str, headers: &[(&str, &str)]) -> Result<Value>;
}

/// Operation set a trading process needs from one venue
#[async_trait(?Send)]
pub trait ExchangeConnector {
    /// Venue name used in diagnostics
    fn name(&self) -> &str;

    /// Best bid and ask
    async fn quote(&self) -> Result<Quote>;

    /// Trading-wallet balance for `currency`
    async fn available_balance(&self, currency: &str) -> Result<Extracted<f64>>;

    /// Open or add to a long exposure
    async fn send_long_order(&self, side: OrderSide, quantity: f64, price: f64) -> Result<OrderId>;

    /// Open or add to a short exposure
    async fn send_short_order(&self, side: OrderSide, quantity: f64, price: f64) -> Result<OrderId>;

    /// Whether the order is no longer live
    async fn is_order_complete(&self, order_id: &OrderId) -> Result<bool>;

    /// Signed size of the open position
    async fn active_position(&self) -> Result<Extracted<f64>>;

    /// Worst price needed to absorb `|volume|` scaled by the order book factor
    async fn limit_price(&self, volume: f64, side: BookSide) -> Result<Extracted<f64>>;
}
