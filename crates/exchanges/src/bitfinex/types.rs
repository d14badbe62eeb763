//! Bitfinex v1 wire records
//!
//! The v1 API encodes every decimal as a JSON string.

use crate::errors::{ExchangeError, Result};
use crate::types::{BookLevel, BookSide, Extracted, OrderSide};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Exchange identifier sent with every new order
pub const EXCHANGE_ID: &str = "bitfinex";

/// One entry of `/v1/balances`
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceRecord {
    #[serde(rename = "type")]
    pub wallet_type: String,
    pub currency: String,
    pub amount: String,
}

impl BalanceRecord {
    /// Exact match on wallet type and currency code (venue codes are lowercase)
    pub fn is_trading_wallet_for(&self, currency: &str) -> bool {
        self.wallet_type == "trading" && self.currency == currency
    }

    pub fn amount(&self) -> Option<f64> {
        parse_decimal(&self.amount)
    }
}

/// Option fields of `/v1/order/new`, serialised in wire order
#[derive(Debug, Clone, Serialize)]
pub struct NewOrderOptions {
    pub symbol: String,
    pub amount: String,
    pub price: String,
    pub exchange: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: String,
}

impl NewOrderOptions {
    pub fn limit(symbol: &str, side: OrderSide, quantity: f64, price: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            amount: quantity.to_string(),
            price: price.to_string(),
            exchange: EXCHANGE_ID.to_string(),
            side,
            order_type: "limit".to_string(),
        }
    }

    pub fn into_fields(self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            other => Err(ExchangeError::SerializationError(format!(
                "order options serialised to {other}"
            ))),
        }
    }
}

pub(crate) fn parse_decimal(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A string-encoded decimal field of `doc`
pub fn decimal_field(doc: &Value, field: &str) -> Extracted<f64> {
    doc.get(field).and_then(Value::as_str).and_then(parse_decimal).into()
}

/// Levels of one side of a `/v1/book/{symbol}` document, best price first.
///
/// A missing or non-numeric price or amount counts as 0.0.
pub fn book_levels(doc: &Value, side: BookSide) -> Vec<BookLevel> {
    doc.get(side.book_key())
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .map(|entry| {
                    BookLevel::new(
                        decimal_field(entry, "price").or_zero(),
                        decimal_field(entry, "amount").or_zero(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}
