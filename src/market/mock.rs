//! In-memory [`MarketApi`] for tests.
//!
//! Markets, books and order statuses are scripted up front; every order the
//! bot submits is recorded so tests can assert on it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::{MarketError, TradingError};
use crate::orderbook::{OrderBook, PriceLevel};
use crate::trading::order::{LimitOrder, OrderState, OrderStatus, Side};

use super::api::MarketApi;
use super::types::Market;

/// Failure switches for the mock.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Fail market searches.
    pub fail_search: bool,
    /// Fail single-market lookups.
    pub fail_get_market: bool,
    /// Fail order book requests.
    pub fail_order_book: bool,
    /// Reject buy orders.
    pub fail_buy: bool,
    /// Reject sell orders.
    pub fail_sell: bool,
    /// Fail order status requests.
    pub fail_status: bool,
}

#[derive(Debug, Default)]
struct MockState {
    config: MockConfig,
    markets: Vec<Market>,
    order_books: HashMap<String, OrderBook>,
    statuses: HashMap<String, OrderStatus>,
    fills: HashMap<String, Decimal>,
    submitted: Vec<(String, LimitOrder)>,
    queries: Vec<String>,
    next_id: u64,
}

/// Scripted exchange for testing.
#[derive(Debug, Clone, Default)]
pub struct MockMarketApi {
    state: Arc<Mutex<MockState>>,
}

impl MockMarketApi {
    /// Create a new mock with no markets and no failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock with custom failure switches.
    pub fn with_config(config: MockConfig) -> Self {
        let api = Self::new();
        api.state().config = config;
        api
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }

    /// Add a market returned by searches and lookups.
    pub fn add_market(&self, market: Market) {
        self.state().markets.push(market);
    }

    /// Set the order book for a token.
    pub fn set_order_book(&self, book: OrderBook) {
        self.state().order_books.insert(book.token_id.clone(), book);
    }

    /// Set the reported status of an order.
    pub fn set_order_status(&self, order_id: &str, status: OrderStatus) {
        self.state().statuses.insert(order_id.to_string(), status);
    }

    /// Set the reported status of an order along with its matched size.
    pub fn set_order_fill(&self, order_id: &str, status: OrderStatus, filled_size: Decimal) {
        let mut state = self.state();
        state.statuses.insert(order_id.to_string(), status);
        state.fills.insert(order_id.to_string(), filled_size);
    }

    /// Toggle search failures.
    pub fn fail_search(&self, fail: bool) {
        self.state().config.fail_search = fail;
    }

    /// Toggle single-market lookup failures.
    pub fn fail_get_market(&self, fail: bool) {
        self.state().config.fail_get_market = fail;
    }

    /// Toggle order book failures.
    pub fn fail_order_book(&self, fail: bool) {
        self.state().config.fail_order_book = fail;
    }

    /// Toggle buy rejections.
    pub fn fail_buy(&self, fail: bool) {
        self.state().config.fail_buy = fail;
    }

    /// Toggle sell rejections.
    pub fn fail_sell(&self, fail: bool) {
        self.state().config.fail_sell = fail;
    }

    /// Toggle status failures.
    pub fn fail_status(&self, fail: bool) {
        self.state().config.fail_status = fail;
    }

    /// Every accepted order, in submission order, with its id.
    pub fn submitted_orders(&self) -> Vec<(String, LimitOrder)> {
        self.state().submitted.clone()
    }

    /// Accepted orders on one side.
    pub fn submitted(&self, side: Side) -> Vec<(String, LimitOrder)> {
        self.state()
            .submitted
            .iter()
            .filter(|(_, o)| o.side == side)
            .cloned()
            .collect()
    }

    /// Every search query received.
    pub fn search_queries(&self) -> Vec<String> {
        self.state().queries.clone()
    }
}

#[async_trait]
impl MarketApi for MockMarketApi {
    async fn search_markets(&self, query: &str, limit: u32) -> Result<Vec<Market>, MarketError> {
        let mut state = self.state();
        state.queries.push(query.to_string());

        if state.config.fail_search {
            return Err(MarketError::FetchFailed {
                resource: query.to_string(),
                reason: "mock search failure".to_string(),
            });
        }

        Ok(state.markets.iter().take(limit as usize).cloned().collect())
    }

    async fn get_market(&self, market_id: &str) -> Result<Market, MarketError> {
        let state = self.state();

        if state.config.fail_get_market {
            return Err(MarketError::FetchFailed {
                resource: market_id.to_string(),
                reason: "mock market failure".to_string(),
            });
        }

        state
            .markets
            .iter()
            .find(|m| m.id == market_id)
            .cloned()
            .ok_or_else(|| MarketError::NotFound {
                id: market_id.to_string(),
            })
    }

    async fn get_order_book(&self, token_id: &str) -> Result<OrderBook, MarketError> {
        let state = self.state();

        if state.config.fail_order_book {
            return Err(MarketError::FetchFailed {
                resource: token_id.to_string(),
                reason: "mock order book failure".to_string(),
            });
        }

        state
            .order_books
            .get(token_id)
            .cloned()
            .ok_or_else(|| MarketError::FetchFailed {
                resource: token_id.to_string(),
                reason: "no book".to_string(),
            })
    }

    async fn create_limit_order(&self, order: &LimitOrder) -> Result<String, TradingError> {
        order.validate().map_err(TradingError::InvalidParams)?;

        let mut state = self.state();
        let rejected = match order.side {
            Side::Buy => state.config.fail_buy,
            Side::Sell => state.config.fail_sell,
        };
        if rejected {
            return Err(TradingError::OrderRejected {
                reason: format!("mock {} rejection", order.side),
            });
        }

        state.next_id += 1;
        let order_id = format!(
            "mock-{}-{}",
            order.side.to_string().to_lowercase(),
            state.next_id
        );
        state.statuses.insert(order_id.clone(), OrderStatus::Live);
        state.submitted.push((order_id.clone(), order.clone()));

        Ok(order_id)
    }

    async fn get_order_status(&self, order_id: &str) -> Result<OrderState, TradingError> {
        let state = self.state();

        if state.config.fail_status {
            return Err(TradingError::StatusFailed {
                order_id: order_id.to_string(),
                reason: "mock status failure".to_string(),
            });
        }

        let status = state
            .statuses
            .get(order_id)
            .copied()
            .ok_or_else(|| TradingError::StatusFailed {
                order_id: order_id.to_string(),
                reason: "unknown order".to_string(),
            })?;

        Ok(OrderState {
            order_id: order_id.to_string(),
            status: Some(status),
            filled_size: state.fills.get(order_id).copied(),
            original_size: None,
        })
    }
}

/// Builder for creating order books with common patterns.
pub struct MockOrderBookBuilder {
    token_id: String,
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
}

impl MockOrderBookBuilder {
    /// Create a new builder for the given token.
    pub fn new(token_id: impl Into<String>) -> Self {
        Self {
            token_id: token_id.into(),
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    /// Add a bid level.
    pub fn bid(mut self, price: Decimal, size: Decimal) -> Self {
        self.bids.push(PriceLevel::new(price, size));
        self
    }

    /// Add an ask level.
    pub fn ask(mut self, price: Decimal, size: Decimal) -> Self {
        self.asks.push(PriceLevel::new(price, size));
        self
    }

    /// Two levels per side around the given touch prices.
    pub fn with_spread(mut self, best_bid: Decimal, best_ask: Decimal, depth: Decimal) -> Self {
        let tick = Decimal::new(1, 2);
        self.bids = vec![
            PriceLevel::new(best_bid, depth),
            PriceLevel::new(best_bid - tick, depth * Decimal::TWO),
        ];
        self.asks = vec![
            PriceLevel::new(best_ask, depth),
            PriceLevel::new(best_ask + tick, depth * Decimal::TWO),
        ];
        self
    }

    /// Build the order book.
    pub fn build(self) -> OrderBook {
        OrderBook::from_levels(self.token_id, self.bids, self.asks)
    }
}
