//! The market-data and trading surface the bot depends on.
//!
//! Everything the bot needs from the exchange goes through [`MarketApi`], so the
//! decision loop can run against the live client or an in-memory mock.

use async_trait::async_trait;

use crate::error::{MarketError, TradingError};
use crate::orderbook::OrderBook;
use crate::trading::order::{LimitOrder, OrderState};

use super::types::Market;

/// Exchange adapter.
#[async_trait]
pub trait MarketApi: Send + Sync {
    /// Search markets by free text, returning at most `limit` results.
    async fn search_markets(&self, query: &str, limit: u32) -> Result<Vec<Market>, MarketError>;

    /// Fetch one market by id.
    async fn get_market(&self, market_id: &str) -> Result<Market, MarketError>;

    /// Fetch the order book of one outcome token.
    async fn get_order_book(&self, token_id: &str) -> Result<OrderBook, MarketError>;

    /// Submit a limit order. Returns the exchange order id once accepted.
    async fn create_limit_order(&self, order: &LimitOrder) -> Result<String, TradingError>;

    /// Poll the state of a previously accepted order.
    async fn get_order_status(&self, order_id: &str) -> Result<OrderState, TradingError>;
}
