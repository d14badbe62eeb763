//! Common exchange types
//!
//! Venue responses are loosely shaped, so scalar fields pulled out of them are
//! carried as [`Extracted`] values: callers choose between the lenient default
//! and strict handling instead of receiving a silent zero.

use crate::errors::{ExchangeError, Result};
use serde::{Deserialize, Serialize};

/// A scalar read from a venue response, or the fact that it was not there
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Extracted<T> {
    Value(T),
    Unavailable,
}

impl<T> Extracted<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Extracted::Value(_))
    }

    pub fn value(self) -> Option<T> {
        match self {
            Extracted::Value(v) => Some(v),
            Extracted::Unavailable => None,
        }
    }

    pub fn unwrap_or(self, default: T) -> T {
        self.value().unwrap_or(default)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Extracted<U> {
        match self {
            Extracted::Value(v) => Extracted::Value(f(v)),
            Extracted::Unavailable => Extracted::Unavailable,
        }
    }

    /// Strict access: an unavailable value becomes an `InvalidResponse` error
    pub fn require(self, what: &str) -> Result<T> {
        self.value()
            .ok_or_else(|| ExchangeError::InvalidResponse(format!("{what} not available")))
    }
}

impl Extracted<f64> {
    /// Lenient access: unavailable reads as 0.0
    pub fn or_zero(self) -> f64 {
        self.unwrap_or(0.0)
    }
}

impl<T> From<Option<T>> for Extracted<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Extracted::Value(v),
            None => Extracted::Unavailable,
        }
    }
}

/// Best bid and ask
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: Extracted<f64>,
    pub ask: Extracted<f64>,
}

impl Quote {
    pub fn new(bid: Extracted<f64>, ask: Extracted<f64>) -> Self {
        Self { bid, ask }
    }

    /// `(bid, ask)` with 0.0 standing in for an unavailable side
    pub fn pair(&self) -> (f64, f64) {
        (self.bid.or_zero(), self.ask.or_zero())
    }

    pub fn is_complete(&self) -> bool {
        self.bid.is_available() && self.ask.is_available()
    }
}

/// Order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// Side of the order book to walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookSide {
    Bid,
    Ask,
}

impl BookSide {
    pub fn from_is_bid(is_bid: bool) -> Self {
        if is_bid { BookSide::Bid } else { BookSide::Ask }
    }

    /// Key of this side in a venue book document
    pub fn book_key(&self) -> &'static str {
        match self {
            BookSide::Bid => "bids",
            BookSide::Ask => "asks",
        }
    }
}

/// Venue-assigned order id.
///
/// `"0"` marks an order that never reached the venue and counts as complete.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    const UNPLACED: &'static str = "0";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The sentinel for an order that was never sent
    pub fn unplaced() -> Self {
        Self(Self::UNPLACED.to_string())
    }

    pub fn is_unplaced(&self) -> bool {
        self.0 == Self::UNPLACED
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric form used in venue requests
    pub fn numeric(&self) -> Result<u64> {
        self.0
            .parse::<u64>()
            .map_err(|_| ExchangeError::InvalidOrder(format!("order id {:?} is not numeric", self.0)))
    }
}

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One price level of an order book
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub amount: f64,
}

impl BookLevel {
    pub fn new(price: f64, amount: f64) -> Self {
        Self { price, amount }
    }
}
