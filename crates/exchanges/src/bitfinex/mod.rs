//! Bitfinex exchange integration
//!
//! [`BitfinexExchange`] is the caller-owned connector: it holds one REST client
//! (and through it one transport) for its whole lifetime and implements
//! [`ExchangeConnector`] on top of the v1 API.

pub mod auth;
pub mod book;
pub mod rest;
pub mod types;

use crate::errors::{ExchangeError, Result};
use crate::http::HttpTransport;
use crate::traits::{ExchangeConnector, Transport};
use crate::types::{BookSide, Extracted, OrderId, OrderSide, Quote};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

pub use auth::{BitfinexCredentials, BitfinexSigner, SignedRequest};
pub use book::{walk_book, BookWalk};
pub use rest::{check_response, BitfinexConfig, BitfinexRestClient, VENUE};
pub use types::{book_levels, decimal_field, BalanceRecord, NewOrderOptions};

/// Bitfinex connector
pub struct BitfinexExchange<T: Transport = HttpTransport> {
    rest: BitfinexRestClient<T>,
}

impl BitfinexExchange<HttpTransport> {
    pub fn new(config: BitfinexConfig) -> Result<Self> {
        info!("🚀 Initializing {} exchange", VENUE);
        Ok(Self { rest: BitfinexRestClient::new(config)? })
    }
}

impl<T: Transport> BitfinexExchange<T> {
    pub fn with_transport(config: BitfinexConfig, transport: T) -> Result<Self> {
        Ok(Self { rest: BitfinexRestClient::with_transport(config, transport)? })
    }

    pub fn rest(&self) -> &BitfinexRestClient<T> {
        &self.rest
    }

    /// Submit a limit order for the configured symbol
    pub async fn send_order(&self, side: OrderSide, quantity: f64, price: f64) -> Result<OrderId> {
        if !quantity.is_finite() || !price.is_finite() {
            return Err(ExchangeError::InvalidOrder(format!(
                "non-finite order: quantity {quantity}, price {price}"
            )));
        }

        let config = self.rest.config();
        info!(
            "📤 {} sending {} order: {} {} @ {}",
            VENUE,
            side,
            quantity,
            config.base_currency(),
            price
        );

        let options = NewOrderOptions::limit(&config.symbol, side, quantity, price).into_fields()?;
        let response = self.rest.new_order(&options).await?;

        let order_id = response
            .get("order_id")
            .and_then(Value::as_u64)
            .map(OrderId::from)
            .ok_or_else(|| ExchangeError::InvalidResponse(format!("new order response without order_id: {response}")))?;

        tradelink_core::log_order!("PLACED", order_id, config.symbol);
        Ok(order_id)
    }

    /// Walk one side of the book for `|volume| * order_book_factor`
    pub async fn walk(&self, volume: f64, side: BookSide) -> Result<BookWalk> {
        let config = self.rest.config();
        info!(
            "🔍 Looking for a limit price to fill {} {} on the {} {} book",
            volume.abs(),
            config.base_currency(),
            VENUE,
            side.book_key()
        );

        let book = self.rest.order_book().await?;
        let levels = book_levels(&book, side);
        Ok(walk_book(&levels, volume, config.order_book_factor))
    }
}

#[async_trait(?Send)]
impl<T: Transport> ExchangeConnector for BitfinexExchange<T> {
    fn name(&self) -> &str {
        VENUE
    }

    async fn quote(&self) -> Result<Quote> {
        let ticker = self.rest.ticker().await?;
        let quote = Quote::new(decimal_field(&ticker, "bid"), decimal_field(&ticker, "ask"));
        debug!("💹 {} quote: {:?}", VENUE, quote);
        Ok(quote)
    }

    async fn available_balance(&self, currency: &str) -> Result<Extracted<f64>> {
        let balances = self.rest.balances().await?;
        let Some(records) = balances.as_array() else {
            warn!("⚠️ {} balances response is not a list", VENUE);
            return Ok(Extracted::Unavailable);
        };

        for entry in records.iter().rev() {
            let record = match BalanceRecord::deserialize(entry) {
                Ok(record) => record,
                Err(e) => {
                    warn!("⚠️ Skipping malformed {} balance record {}: {}", VENUE, entry, e);
                    continue;
                }
            };

            if !record.is_trading_wallet_for(currency) {
                continue;
            }

            match record.amount() {
                Some(amount) => return Ok(Extracted::Value(amount)),
                None => warn!("⚠️ Skipping {} balance record with amount {:?}", VENUE, record.amount),
            }
        }

        Ok(Extracted::Unavailable)
    }

    async fn send_long_order(&self, side: OrderSide, quantity: f64, price: f64) -> Result<OrderId> {
        self.send_order(side, quantity, price).await
    }

    async fn send_short_order(&self, side: OrderSide, quantity: f64, price: f64) -> Result<OrderId> {
        self.send_order(side, quantity, price).await
    }

    async fn is_order_complete(&self, order_id: &OrderId) -> Result<bool> {
        if order_id.is_unplaced() {
            return Ok(true);
        }

        let status = self.rest.order_status(order_id.numeric()?).await?;
        Ok(status.get("is_live") == Some(&Value::Bool(false)))
    }

    async fn active_position(&self) -> Result<Extracted<f64>> {
        let positions = self.rest.positions().await?;
        match positions.as_array().and_then(|list| list.first()) {
            Some(position) => Ok(decimal_field(position, "amount")),
            None => {
                warn!("⚠️ {} has no open positions, treating as flat", VENUE);
                Ok(Extracted::Unavailable)
            }
        }
    }

    async fn limit_price(&self, volume: f64, side: BookSide) -> Result<Extracted<f64>> {
        let walk = self.walk(volume, side).await?;
        if !walk.is_filled() {
            warn!(
                "⚠️ {} {} book exhausted after {} levels: {} of {} filled",
                VENUE,
                side.book_key(),
                walk.levels_examined,
                walk.filled,
                walk.target
            );
        }
        Ok(walk.price)
    }
}
