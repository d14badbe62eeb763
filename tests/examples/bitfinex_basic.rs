//! Basic Bitfinex connector example using Tradelink
//!
//! Demonstrates:
//! - Loading configuration and credentials from `.env`
//! - Public market data (quote, price-impact walk)
//! - Signed account queries (balance, position)
//!
//! No orders are placed unless `BITFINEX_PLACE_ORDER=true`.

use tradelink_core::prelude::*;
use tradelink_exchanges::bitfinex::{BitfinexConfig, BitfinexExchange};
use tradelink_exchanges::{BookSide, ExchangeConnector, Extracted, OrderSide};
use tracing::{info, warn};

#[monoio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logging_with(&LogConfig::from_env())?;

    info!("🚀 Starting Tradelink Bitfinex Basic Example");

    let config = BitfinexConfig::from_env()?;
    info!("📋 Configuration:");
    info!("   Base URL: {}", config.base_url);
    info!("   Symbol: {}", config.symbol);
    info!("   Order book factor: {}", config.order_book_factor);

    let quote_currency = config.symbol.chars().skip(3).collect::<String>();
    let base_currency = config.base_currency().to_lowercase();
    let exchange = BitfinexExchange::new(config)?;

    let timer = PerfTimer::start("bitfinex_quote");
    let quote = exchange.quote().await?;
    let (bid, ask) = quote.pair();
    info!("💹 Quote: bid {} / ask {} ({}μs)", bid, ask, timer.log_elapsed());
    if !quote.is_complete() {
        warn!("⚠️  Quote incomplete, treat zeros as unavailable");
    }

    for side in [BookSide::Bid, BookSide::Ask] {
        match exchange.limit_price(1.0, side).await? {
            Extracted::Value(price) => info!("📖 Limit price to absorb 1.0 on {}: {}", side.book_key(), price),
            Extracted::Unavailable => warn!("⚠️  No {} price discoverable", side.book_key()),
        }
    }

    for currency in [base_currency.as_str(), quote_currency.as_str()] {
        let balance = exchange.available_balance(currency).await?;
        info!("💰 Trading balance {}: {}", currency, balance.or_zero());
    }

    let position = exchange.active_position().await?;
    info!("📊 Active position: {}", position.or_zero());

    let place_order = std::env::var("BITFINEX_PLACE_ORDER")
        .map(|v| v == "true")
        .unwrap_or(false);
    if place_order && bid > 0.0 {
        // Far below the market so it rests on the book
        let price = (bid * 0.5).floor();
        match exchange.send_long_order(OrderSide::Buy, 0.0002, price).await {
            Ok(order_id) => {
                let complete = exchange.is_order_complete(&order_id).await?;
                info!("✅ Order {} complete: {}", order_id, complete);
            }
            Err(e) => {
                tradelink_core::log_error!("Bitfinex order", e);
            }
        }
    }

    info!("🎉 Example complete");
    Ok(())
}
