//! Price-impact walk over one side of an order book

use crate::types::{BookLevel, Extracted};
use tracing::info;

/// Outcome of walking a book until a target volume is absorbed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookWalk {
    /// Price of the last level examined
    pub price: Extracted<f64>,
    /// Volume accumulated over the examined levels
    pub filled: f64,
    /// `|volume| * factor`
    pub target: f64,
    pub levels_examined: usize,
}

impl BookWalk {
    pub fn is_filled(&self) -> bool {
        self.filled >= self.target
    }
}

/// Walk `levels` from best price outward until the accumulated amount reaches
/// `|volume| * factor`.
///
/// An exhausted book yields the last price seen; an empty one yields
/// `Unavailable`.
pub fn walk_book(levels: &[BookLevel], volume: f64, factor: f64) -> BookWalk {
    let target = volume.abs() * factor;
    let mut walk = BookWalk {
        price: Extracted::Unavailable,
        filled: 0.0,
        target,
        levels_examined: 0,
    };

    for level in levels {
        info!("📖 Bitfinex order book: {}@${}", level.amount, level.price);
        walk.filled += level.amount;
        walk.price = Extracted::Value(level.price);
        walk.levels_examined += 1;
        if walk.is_filled() {
            break;
        }
    }

    walk
}
