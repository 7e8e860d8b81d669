//! Integration tests for the bracket bot.
//!
//! The flow tests drive the full loop against the in-memory exchange. The
//! network tests talk to the real Polymarket APIs in dry-run mode and are
//! ignored by default.
//! Run them with: cargo test --test integration -- --ignored

use std::time::Duration;

use bracket_bot::api::{create_router, AppState};
use bracket_bot::bot::{BracketBot, CycleOutcome};
use bracket_bot::config::Config;
use bracket_bot::market::types::{Outcome, OutcomeToken};
use bracket_bot::market::{
    find_active_market, Market, MarketApi, MockMarketApi, MockOrderBookBuilder, PolymarketClient,
};
use bracket_bot::trading::{OrderStatus, Side};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

fn eth_market(id: &str, volume: rust_decimal::Decimal) -> Market {
    Market {
        id: id.to_string(),
        slug: Some(format!("eth-updown-15m-{}", id)),
        question: Some("Ethereum Up or Down - 15m".to_string()),
        active: true,
        resolved: false,
        duration: Some("15m".to_string()),
        underlying: Some("ETH".to_string()),
        volume: Some(volume),
        tokens: vec![
            OutcomeToken {
                token_id: format!("{}-yes", id),
                outcome: Outcome::Yes,
                price: Some(dec!(0.90)),
            },
            OutcomeToken {
                token_id: format!("{}-no", id),
                outcome: Outcome::No,
                price: Some(dec!(0.10)),
            },
        ],
    }
}

/// Dry-run config for the live API tests.
fn live_config() -> Config {
    dotenvy::dotenv().ok();
    let mut config = Config::load().unwrap_or_else(|_| Config::for_tests());
    if config.private_key.is_empty() {
        config.private_key = Config::for_tests().private_key;
    }
    config.dry_run = true;
    config
}

#[tokio::test]
async fn full_bracket_lifecycle() {
    let api = MockMarketApi::new();
    api.add_market(eth_market("small", dec!(10)));
    api.add_market(eth_market("big", dec!(10000)));
    api.set_order_book(
        MockOrderBookBuilder::new("big-yes")
            .with_spread(dec!(0.77), dec!(0.79), dec!(500))
            .build(),
    );

    let state = AppState::new();
    let mut bot = BracketBot::new(api.clone(), &Config::for_tests()).with_state(state.clone());

    // Cycle 1: signal on the highest-volume market, both legs placed
    let outcome = bot.run_cycle().await;
    assert_eq!(outcome.label(), "bracketed");
    assert_eq!(bot.current_market().map(|m| m.id.as_str()), Some("big"));

    let buys = api.submitted(Side::Buy);
    let sells = api.submitted(Side::Sell);
    assert_eq!(buys.len(), 1);
    assert_eq!(sells.len(), 1);
    assert_eq!(buys[0].1.token_id, "big-yes");
    assert_eq!(buys[0].1.price, dec!(0.80));
    assert_eq!(sells[0].1.price, dec!(0.90));
    assert_eq!(buys[0].1.size, sells[0].1.size);

    let position = bot.positions().get(&buys[0].0).unwrap();
    assert_eq!(position.sell_order_id.as_deref(), Some(sells[0].0.as_str()));

    // Cycle 2: price moves up, buy fills, sell still resting
    api.set_order_book(MockOrderBookBuilder::new("big-yes").ask(dec!(0.88), dec!(50)).build());
    api.set_order_status(&buys[0].0, OrderStatus::Filled);

    assert_eq!(bot.run_cycle().await, CycleOutcome::Idle);
    assert_eq!(bot.positions().len(), 1);

    // Cycle 3: sell fills, the bracket is pruned
    api.set_order_status(&sells[0].0, OrderStatus::Filled);

    assert_eq!(bot.run_cycle().await, CycleOutcome::Idle);
    assert!(bot.positions().is_empty());

    let snapshot = state.snapshot.read().await;
    assert_eq!(snapshot.cycles, 3);
    assert_eq!(snapshot.stats.buys_placed, 1);
    assert_eq!(snapshot.stats.positions_closed, 1);
}

#[tokio::test]
async fn rejected_sell_is_repaired_after_fill() {
    let api = MockMarketApi::new();
    api.add_market(eth_market("m1", dec!(100)));
    api.set_order_book(MockOrderBookBuilder::new("m1-yes").ask(dec!(0.80), dec!(10)).build());
    api.fail_sell(true);

    let mut bot = BracketBot::new(api.clone(), &Config::for_tests());

    let outcome = bot.run_cycle().await;
    assert_eq!(outcome.label(), "buy_only");
    let (buy_id, _) = api.submitted(Side::Buy).remove(0);
    assert!(bot.positions().get(&buy_id).unwrap().needs_sell());

    // Stop signalling, let the sell through, fill the buy
    api.set_order_book(MockOrderBookBuilder::new("m1-yes").ask(dec!(0.95), dec!(10)).build());
    api.fail_sell(false);
    api.set_order_status(&buy_id, OrderStatus::Filled);

    bot.run_cycle().await;

    let position = bot.positions().get(&buy_id).unwrap();
    assert!(!position.needs_sell());
    assert_eq!(api.submitted(Side::Sell).len(), 1);
    assert_eq!(bot.stats().sells_placed, 1);
}

#[tokio::test]
async fn order_book_outage_falls_back_to_last_price() {
    let api = MockMarketApi::new();
    let mut market = eth_market("m1", dec!(100));
    market.tokens[0].price = Some(dec!(0.75));
    api.add_market(market);
    api.fail_order_book(true);

    let mut bot = BracketBot::new(api.clone(), &Config::for_tests());
    let outcome = bot.run_cycle().await;

    assert_eq!(outcome.label(), "bracketed");
    assert_eq!(api.submitted(Side::Buy).len(), 1);
}

#[tokio::test]
async fn ineligible_markets_mean_no_trading() {
    let api = MockMarketApi::new();
    let mut resolved = eth_market("resolved", dec!(100));
    resolved.resolved = true;
    let mut btc = eth_market("btc", dec!(100));
    btc.underlying = Some("BTC".to_string());
    api.add_market(resolved);
    api.add_market(btc);

    let mut bot = BracketBot::new(api.clone(), &Config::for_tests());
    let outcome = bot.run_cycle().await;

    assert_eq!(outcome, CycleOutcome::NoMarket);
    assert_eq!(bot.sleep_after(&outcome), Duration::from_secs(5));
    assert!(api.submitted_orders().is_empty());
}

#[tokio::test]
async fn status_endpoint_reflects_loop() {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    let api = MockMarketApi::new();
    api.add_market(eth_market("m1", dec!(100)));
    api.set_order_book(MockOrderBookBuilder::new("m1-yes").ask(dec!(0.80), dec!(10)).build());

    let state = AppState::new();
    let mut bot = BracketBot::new(api, &Config::for_tests()).with_state(state.clone());
    bot.run_cycle().await;

    let response = create_router(state)
        .oneshot(Request::builder().uri("/api/v1/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(json["market_id"], "m1");
    assert_eq!(json["last_outcome"], "bracketed");
    assert_eq!(json["positions"].as_array().map(Vec::len), Some(1));
    assert_eq!(json["positions"][0]["buy_price"], "0.80");
}

/// Test market discovery against the live Gamma API.
#[tokio::test]
#[ignore = "requires network access"]
async fn test_market_discovery() {
    let config = live_config();
    let client = PolymarketClient::new(&config).unwrap();

    match find_active_market(&client, &config.trading()).await {
        Ok(Some(market)) => {
            println!("Found market: {} ({})", market.title(), market.id);
            assert!(market.active);
            assert!(!market.resolved);
        }
        Ok(None) => println!("No active market right now"),
        Err(e) => panic!("Market search failed: {}", e),
    }
}

/// Test that one dry-run cycle completes against the live APIs.
#[tokio::test]
#[ignore = "requires network access"]
async fn test_dry_run_cycle() {
    let config = live_config();
    let client = PolymarketClient::new(&config).unwrap();
    assert!(client.is_dry_run());

    let mut bot = BracketBot::new(client, &config);
    let outcome = bot.run_cycle().await;
    println!("Cycle outcome: {:?}", outcome);

    for position in bot.positions().iter() {
        assert!(position.order_id.starts_with("dry-"));
        let state = bot.api().get_order_status(&position.order_id).await.unwrap();
        assert_eq!(state.status, Some(OrderStatus::Live));
    }
}
