//! Bitfinex connector tests against a scripted transport
//!
//! Every operation is driven end to end: request path and signed headers on the
//! way out, document extraction and diagnostics on the way back.

use crate::log_capture::LogCapture;
use crate::mock::{Method, ScriptedTransport};
use rstest::*;
use serde_json::{json, Value};
use tracing::Level;
use tradelink_exchanges::bitfinex::auth::{
    BitfinexCredentials, BitfinexSigner, HEADER_API_KEY, HEADER_PAYLOAD, HEADER_SIGNATURE,
};
use tradelink_exchanges::prelude::*;

const TICKER: &str = "/v1/ticker/btcusd";
const BOOK: &str = "/v1/book/btcusd";
const BALANCES: &str = "/v1/balances";
const NEW_ORDER: &str = "/v1/order/new";
const ORDER_STATUS: &str = "/v1/order/status";
const POSITIONS: &str = "/v1/positions";

// ============================================================================
// TEST FIXTURES
// ============================================================================

#[fixture]
fn config() -> BitfinexConfig {
    BitfinexConfig::default().with_credentials("test_api_key".to_string(), "test_secret".to_string())
}

fn exchange(config: BitfinexConfig, transport: ScriptedTransport) -> BitfinexExchange<ScriptedTransport> {
    BitfinexExchange::with_transport(config, transport).expect("valid test config")
}

fn calls(exchange: &BitfinexExchange<ScriptedTransport>) -> Vec<crate::mock::RecordedCall> {
    exchange.rest().transport().calls()
}

fn asks_book() -> Value {
    json!({
        "bids": [
            {"price": "99.0", "amount": "0.5", "timestamp": "1700000000.0"},
            {"price": "98.0", "amount": "4.0", "timestamp": "1700000000.0"}
        ],
        "asks": [
            {"price": "100.0", "amount": "1.0", "timestamp": "1700000000.0"},
            {"price": "101.0", "amount": "2.0", "timestamp": "1700000000.0"},
            {"price": "102.0", "amount": "5.0", "timestamp": "1700000000.0"}
        ]
    })
}

// ============================================================================
// QUOTE
// ============================================================================

#[cfg(test)]
mod quote_tests {
    use super::*;

    #[rstest]
    #[case(r#"{"bid":"100.5","ask":"101.0"}"#, 100.5, 101.0, true)]
    #[case(r#"{"bid":"x","ask":"101.0"}"#, 0.0, 101.0, false)]
    #[case(r#"{"ask":"101.0"}"#, 0.0, 101.0, false)]
    #[case(r#"{"message":"Unknown symbol"}"#, 0.0, 0.0, false)]
    #[monoio::test]
    async fn test_quote_extraction(
        config: BitfinexConfig,
        #[case] ticker: &str,
        #[case] bid: f64,
        #[case] ask: f64,
        #[case] complete: bool,
    ) {
        let ticker: Value = serde_json::from_str(ticker).unwrap();
        let exchange = exchange(config, ScriptedTransport::new().respond(TICKER, ticker));

        let quote = exchange.quote().await.unwrap();

        assert_eq!(quote.pair(), (bid, ask));
        assert_eq!(quote.is_complete(), complete);
    }

    #[rstest]
    #[monoio::test]
    async fn test_unparseable_bid_is_unavailable(config: BitfinexConfig) {
        let transport = ScriptedTransport::new().respond(TICKER, json!({"bid": "x", "ask": "101.0"}));
        let quote = exchange(config, transport).quote().await.unwrap();

        assert_eq!(quote.bid, Extracted::Unavailable);
        assert_eq!(quote.ask, Extracted::Value(101.0));
        assert!(quote.bid.require("bid").is_err());
    }

    #[rstest]
    #[monoio::test]
    async fn test_quote_is_an_unsigned_get(config: BitfinexConfig) {
        let transport = ScriptedTransport::new().respond(TICKER, json!({"bid": "1", "ask": "2"}));
        let exchange = exchange(config.with_symbol("btcusd"), transport);
        exchange.quote().await.unwrap();

        let calls = calls(&exchange);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::Get);
        assert_eq!(calls[0].path, TICKER);
        assert!(calls[0].headers.is_empty());
    }

    #[rstest]
    #[monoio::test]
    async fn test_configured_symbol_selects_ticker(config: BitfinexConfig) {
        let transport = ScriptedTransport::new().respond("/v1/ticker/ethusd", json!({"bid": "1", "ask": "2"}));
        let exchange = exchange(config.with_symbol("ethusd"), transport);

        assert_eq!(exchange.quote().await.unwrap().pair(), (1.0, 2.0));
    }
}

// ============================================================================
// BALANCES
// ============================================================================

#[cfg(test)]
mod balance_tests {
    use super::*;

    #[rstest]
    #[monoio::test]
    async fn test_trading_wallet_balance(config: BitfinexConfig) {
        let transport = ScriptedTransport::new().respond(
            BALANCES,
            json!([
                {"type": "trading", "currency": "usd", "amount": "42.0", "available": "42.0"},
                {"type": "deposit", "currency": "usd", "amount": "5.0", "available": "5.0"}
            ]),
        );

        let balance = exchange(config, transport).available_balance("usd").await.unwrap();
        assert_eq!(balance, Extracted::Value(42.0));
    }

    #[rstest]
    #[monoio::test]
    async fn test_scan_runs_last_to_first(config: BitfinexConfig) {
        let transport = ScriptedTransport::new().respond(
            BALANCES,
            json!([
                {"type": "trading", "currency": "btc", "amount": "1.0"},
                {"type": "trading", "currency": "btc", "amount": "2.0"}
            ]),
        );

        let balance = exchange(config, transport).available_balance("btc").await.unwrap();
        assert_eq!(balance, Extracted::Value(2.0));
    }

    #[rstest]
    #[case("usd", Extracted::Value(7.5))]
    #[case("USD", Extracted::Unavailable)]
    #[monoio::test]
    async fn test_currency_match_is_exact(
        config: BitfinexConfig,
        #[case] currency: &str,
        #[case] expected: Extracted<f64>,
    ) {
        let transport = ScriptedTransport::new()
            .respond(BALANCES, json!([{"type": "trading", "currency": "usd", "amount": "7.5"}]));

        let balance = exchange(config, transport).available_balance(currency).await.unwrap();
        assert_eq!(balance, expected);
    }

    #[rstest]
    #[monoio::test]
    async fn test_no_trading_record_is_unavailable(config: BitfinexConfig) {
        let transport = ScriptedTransport::new().respond(
            BALANCES,
            json!([
                {"type": "exchange", "currency": "usd", "amount": "3.0"},
                {"type": "deposit", "currency": "usd", "amount": "5.0"}
            ]),
        );

        let balance = exchange(config, transport).available_balance("usd").await.unwrap();
        assert_eq!(balance, Extracted::Unavailable);
        assert_eq!(balance.or_zero(), 0.0);
    }

    #[rstest]
    #[monoio::test]
    async fn test_malformed_records_are_logged_and_skipped(config: BitfinexConfig) {
        let capture = LogCapture::new();
        let _guard = capture.install();

        let transport = ScriptedTransport::new().respond(
            BALANCES,
            json!([
                {"type": "trading", "currency": "usd", "amount": "11.0"},
                {"type": "trading", "currency": "usd", "amount": "lots"},
                {"type": "trading", "currency": "usd"}
            ]),
        );

        let balance = exchange(config, transport).available_balance("usd").await.unwrap();

        assert_eq!(balance, Extracted::Value(11.0));
        assert_eq!(capture.count(Level::WARN), 2);
        assert!(capture.contains(Level::WARN, "Skipping malformed Bitfinex balance record"));
        assert!(capture.contains(Level::WARN, "\"lots\""));
    }

    #[rstest]
    #[monoio::test]
    async fn test_venue_error_is_logged(config: BitfinexConfig) {
        let capture = LogCapture::new();
        let _guard = capture.install();

        let transport = ScriptedTransport::new().respond(BALANCES, json!({"message": "Nonce is too small."}));
        let balance = exchange(config, transport).available_balance("usd").await.unwrap();

        assert_eq!(balance, Extracted::Unavailable);
        assert!(capture.contains(Level::WARN, "Bitfinex error with response: Nonce is too small."));
    }

    #[rstest]
    #[monoio::test]
    async fn test_balance_request_is_signed(config: BitfinexConfig) {
        let transport = ScriptedTransport::new().respond(BALANCES, json!([]));
        let exchange = exchange(config, transport);
        exchange.available_balance("usd").await.unwrap();

        let calls = calls(&exchange);
        let call = &calls[0];
        assert_eq!(call.method, Method::Post);
        assert_eq!(call.path, BALANCES);
        assert_eq!(call.header_names(), [HEADER_API_KEY, HEADER_SIGNATURE, HEADER_PAYLOAD]);
        assert_eq!(call.header(HEADER_API_KEY), Some("test_api_key"));

        let payload = call.payload().expect("payload decodes");
        assert_eq!(payload["request"], BALANCES);
        assert!(payload["nonce"].as_str().unwrap().parse::<u64>().is_ok());

        let signer = BitfinexSigner::new(BitfinexCredentials::new(
            "test_api_key".to_string(),
            "test_secret".to_string(),
        ))
        .unwrap();
        assert!(signer.validate_signature(
            call.header(HEADER_PAYLOAD).unwrap(),
            call.header(HEADER_SIGNATURE).unwrap()
        ));
    }

    #[rstest]
    #[monoio::test]
    async fn test_consecutive_calls_use_increasing_nonces(config: BitfinexConfig) {
        let transport = ScriptedTransport::new().respond(BALANCES, json!([]));
        let exchange = exchange(config, transport);

        for _ in 0..5 {
            exchange.available_balance("usd").await.unwrap();
        }

        let nonces: Vec<u64> = calls(&exchange)
            .iter()
            .map(|call| call.payload().unwrap()["nonce"].as_str().unwrap().parse().unwrap())
            .collect();
        assert_eq!(nonces.len(), 5);
        assert!(nonces.windows(2).all(|pair| pair[1] > pair[0]), "nonces {nonces:?}");
    }
}

// ============================================================================
// ORDERS
// ============================================================================

#[cfg(test)]
mod order_tests {
    use super::*;

    fn order_response() -> Value {
        json!({
            "id": 448364249,
            "symbol": "btcusd",
            "exchange": "bitfinex",
            "price": "10000.5",
            "side": "buy",
            "type": "limit",
            "is_live": true,
            "order_id": 448364249
        })
    }

    #[rstest]
    #[case::long(OrderSide::Buy, true)]
    #[case::short(OrderSide::Sell, false)]
    #[monoio::test]
    async fn test_order_submission(config: BitfinexConfig, #[case] side: OrderSide, #[case] long: bool) {
        let capture = LogCapture::new();
        let _guard = capture.install();

        let transport = ScriptedTransport::new().respond(NEW_ORDER, order_response());
        let exchange = exchange(config, transport);

        let order_id = if long {
            exchange.send_long_order(side, 0.5, 10000.5).await.unwrap()
        } else {
            exchange.send_short_order(side, 0.5, 10000.5).await.unwrap()
        };

        assert_eq!(order_id.as_str(), "448364249");
        assert!(!order_id.is_unplaced());

        let calls = calls(&exchange);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].path, NEW_ORDER);

        let payload = calls[0].payload().unwrap();
        let keys: Vec<&str> = payload.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["request", "nonce", "symbol", "amount", "price", "exchange", "side", "type"]);
        assert_eq!(payload["request"], NEW_ORDER);
        assert_eq!(payload["symbol"], "btcusd");
        assert_eq!(payload["amount"], "0.5");
        assert_eq!(payload["price"], "10000.5");
        assert_eq!(payload["exchange"], "bitfinex");
        assert_eq!(payload["side"], side.to_string());
        assert_eq!(payload["type"], "limit");

        assert!(capture.contains(Level::INFO, "sending"));
        assert!(capture.contains(Level::INFO, "448364249"));
    }

    #[rstest]
    #[monoio::test]
    async fn test_long_and_short_orders_share_one_wire_format(config: BitfinexConfig) {
        let transport = ScriptedTransport::new().respond(NEW_ORDER, order_response());
        let exchange = exchange(config, transport);

        exchange.send_long_order(OrderSide::Sell, 1.0, 2.0).await.unwrap();
        exchange.send_short_order(OrderSide::Sell, 1.0, 2.0).await.unwrap();

        let payloads: Vec<Value> = calls(&exchange)
            .iter()
            .map(|call| {
                let mut payload = call.payload().unwrap();
                payload.as_object_mut().unwrap().remove("nonce");
                payload
            })
            .collect();
        assert_eq!(payloads[0], payloads[1]);
    }

    #[rstest]
    #[monoio::test]
    async fn test_rejected_order_is_an_error(config: BitfinexConfig) {
        let capture = LogCapture::new();
        let _guard = capture.install();

        let transport = ScriptedTransport::new()
            .respond(NEW_ORDER, json!({"message": "Invalid order: not enough tradable balance"}));
        let result = exchange(config, transport).send_long_order(OrderSide::Buy, 100.0, 1.0).await;

        assert!(matches!(result, Err(ExchangeError::InvalidResponse(_))));
        assert!(capture.contains(Level::WARN, "not enough tradable balance"));
    }

    #[rstest]
    #[case(f64::NAN, 100.0)]
    #[case(0.5, f64::INFINITY)]
    #[case(f64::NEG_INFINITY, f64::NAN)]
    #[monoio::test]
    async fn test_non_finite_order_is_rejected(
        config: BitfinexConfig,
        #[case] quantity: f64,
        #[case] price: f64,
    ) {
        let exchange = exchange(config, ScriptedTransport::new().respond(NEW_ORDER, order_response()));

        let long = exchange.send_long_order(OrderSide::Buy, quantity, price).await;
        let short = exchange.send_short_order(OrderSide::Sell, quantity, price).await;

        assert!(matches!(long, Err(ExchangeError::InvalidOrder(_))));
        assert!(matches!(short, Err(ExchangeError::InvalidOrder(_))));
        assert_eq!(exchange.rest().transport().call_count(), 0);
    }

    #[rstest]
    #[monoio::test]
    async fn test_unplaced_order_is_complete_without_a_request(config: BitfinexConfig) {
        let exchange = exchange(config, ScriptedTransport::new());

        assert!(exchange.is_order_complete(&OrderId::unplaced()).await.unwrap());
        assert!(exchange.is_order_complete(&OrderId::new("0")).await.unwrap());
        assert_eq!(exchange.rest().transport().call_count(), 0);
    }

    #[rstest]
    #[case(json!({"id": 448364249, "is_live": false}), true)]
    #[case(json!({"id": 448364249, "is_live": true}), false)]
    #[case(json!({"id": 448364249}), false)]
    #[case(json!({"id": 448364249, "is_live": "false"}), false)]
    #[case(json!({"message": "No such order found."}), false)]
    #[monoio::test]
    async fn test_order_status(config: BitfinexConfig, #[case] status: Value, #[case] complete: bool) {
        let transport = ScriptedTransport::new().respond(ORDER_STATUS, status);
        let exchange = exchange(config, transport);

        let order_id = OrderId::from(448364249);
        assert_eq!(exchange.is_order_complete(&order_id).await.unwrap(), complete);

        let payload = calls(&exchange)[0].payload().unwrap();
        assert_eq!(payload["request"], ORDER_STATUS);
        assert_eq!(payload["order_id"], json!(448364249));
    }

    #[rstest]
    #[monoio::test]
    async fn test_non_numeric_order_id_is_rejected(config: BitfinexConfig) {
        let exchange = exchange(config, ScriptedTransport::new());

        let result = exchange.is_order_complete(&OrderId::new("abc")).await;
        assert!(matches!(result, Err(ExchangeError::InvalidOrder(_))));
        assert_eq!(exchange.rest().transport().call_count(), 0);
    }
}

// ============================================================================
// POSITIONS
// ============================================================================

#[cfg(test)]
mod position_tests {
    use super::*;

    #[rstest]
    #[monoio::test]
    async fn test_empty_positions_warn_once(config: BitfinexConfig) {
        let capture = LogCapture::new();
        let _guard = capture.install();

        let transport = ScriptedTransport::new().respond(POSITIONS, json!([]));
        let position = exchange(config, transport).active_position().await.unwrap();

        assert_eq!(position, Extracted::Unavailable);
        assert_eq!(position.or_zero(), 0.0);
        assert_eq!(capture.count(Level::WARN), 1);
    }

    #[rstest]
    #[monoio::test]
    async fn test_first_position_amount(config: BitfinexConfig) {
        let transport = ScriptedTransport::new().respond(
            POSITIONS,
            json!([
                {"id": 943715, "symbol": "btcusd", "status": "ACTIVE", "base": "246.94", "amount": "-1.25"},
                {"id": 943716, "symbol": "btcusd", "status": "ACTIVE", "base": "250.00", "amount": "3.0"}
            ]),
        );

        let position = exchange(config, transport).active_position().await.unwrap();
        assert_eq!(position, Extracted::Value(-1.25));
    }
}

// ============================================================================
// LIMIT PRICE
// ============================================================================

#[cfg(test)]
mod limit_price_tests {
    use super::*;

    #[rstest]
    #[case(2.0, 1.0, BookSide::Ask, 101.0)]
    #[case(2.0, 2.0, BookSide::Ask, 102.0)]
    #[case(-2.0, 1.0, BookSide::Ask, 101.0)]
    #[case(0.5, 1.0, BookSide::Bid, 99.0)]
    #[case(1.0, 1.5, BookSide::Bid, 98.0)]
    #[monoio::test]
    async fn test_price_impact_walk(
        config: BitfinexConfig,
        #[case] volume: f64,
        #[case] factor: f64,
        #[case] side: BookSide,
        #[case] expected: f64,
    ) {
        let transport = ScriptedTransport::new().respond(BOOK, asks_book());
        let exchange = exchange(config.with_order_book_factor(factor), transport);

        let price = exchange.limit_price(volume, side).await.unwrap();
        assert_eq!(price, Extracted::Value(expected));
    }

    #[rstest]
    #[monoio::test]
    async fn test_each_level_is_logged(config: BitfinexConfig) {
        let capture = LogCapture::new();
        let _guard = capture.install();

        let transport = ScriptedTransport::new().respond(BOOK, asks_book());
        exchange(config, transport).limit_price(2.0, BookSide::Ask).await.unwrap();

        let levels: Vec<String> = capture
            .messages(Level::INFO)
            .into_iter()
            .filter(|message| message.contains("order book"))
            .collect();
        assert_eq!(levels.len(), 2);
        assert_eq!(capture.count(Level::WARN), 0);
        assert!(capture.contains(Level::INFO, "Looking for a limit price to fill 2 BTC"));
    }

    #[rstest]
    #[monoio::test]
    async fn test_exhausted_book_returns_last_price(config: BitfinexConfig) {
        let capture = LogCapture::new();
        let _guard = capture.install();

        let transport = ScriptedTransport::new().respond(BOOK, asks_book());
        let exchange = exchange(config, transport);

        assert_eq!(exchange.limit_price(100.0, BookSide::Ask).await.unwrap(), Extracted::Value(102.0));
        assert!(capture.contains(Level::WARN, "book exhausted"));

        let walk = exchange.walk(100.0, BookSide::Ask).await.unwrap();
        assert!(!walk.is_filled());
        assert_eq!(walk.levels_examined, 3);
        assert_eq!(walk.filled, 8.0);
    }

    #[rstest]
    #[monoio::test]
    async fn test_empty_book_has_no_price(config: BitfinexConfig) {
        let transport = ScriptedTransport::new().respond(BOOK, json!({"bids": [], "asks": []}));
        let price = exchange(config, transport).limit_price(1.0, BookSide::Ask).await.unwrap();

        assert_eq!(price, Extracted::Unavailable);
        assert_eq!(price.or_zero(), 0.0);
    }

    #[rstest]
    #[monoio::test]
    async fn test_boolean_side_selector(config: BitfinexConfig) {
        let transport = ScriptedTransport::new().respond(BOOK, asks_book());
        let exchange = exchange(config, transport);

        let bid = exchange.limit_price(0.5, BookSide::from_is_bid(true)).await.unwrap();
        let ask = exchange.limit_price(0.5, BookSide::from_is_bid(false)).await.unwrap();
        assert_eq!((bid, ask), (Extracted::Value(99.0), Extracted::Value(100.0)));
    }
}

// ============================================================================
// FAILURES
// ============================================================================

#[cfg(test)]
mod failure_tests {
    use super::*;

    #[rstest]
    #[monoio::test]
    async fn test_transport_failures_propagate(config: BitfinexConfig) {
        let transport = ScriptedTransport::new()
            .fail(TICKER, ExchangeError::NetworkError("connection reset".to_string()))
            .fail(POSITIONS, ExchangeError::HttpError(502, "Bad Gateway".to_string()));
        let exchange = exchange(config, transport);

        assert!(matches!(exchange.quote().await, Err(ExchangeError::NetworkError(_))));
        assert!(matches!(exchange.active_position().await, Err(ExchangeError::HttpError(502, _))));
        assert!(matches!(exchange.limit_price(1.0, BookSide::Ask).await, Err(ExchangeError::NetworkError(_))));
    }

    #[rstest]
    #[monoio::test]
    async fn test_scripted_responses_replay_in_order(config: BitfinexConfig) {
        let transport = ScriptedTransport::new()
            .respond(POSITIONS, json!([{"amount": "1.0"}]))
            .respond(POSITIONS, json!([{"amount": "2.0"}]));
        let exchange = exchange(config, transport);

        assert_eq!(exchange.active_position().await.unwrap(), Extracted::Value(1.0));
        assert_eq!(exchange.active_position().await.unwrap(), Extracted::Value(2.0));
        assert_eq!(exchange.active_position().await.unwrap(), Extracted::Value(2.0));
    }

    #[rstest]
    fn test_invalid_factor_is_rejected(config: BitfinexConfig) {
        let result = BitfinexExchange::with_transport(config.with_order_book_factor(0.9), ScriptedTransport::new());
        assert!(matches!(result, Err(ExchangeError::ConfigurationError(_))));
    }

    #[rstest]
    fn test_connector_name(config: BitfinexConfig) {
        assert_eq!(exchange(config, ScriptedTransport::new()).name(), "Bitfinex");
    }
}
