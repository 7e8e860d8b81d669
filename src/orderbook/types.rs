//! Order book types and data structures.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::market::types::value_to_decimal;

/// Single price level in an order book.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceLevel {
    /// Price at this level.
    pub price: Decimal,
    /// Total size available at this price.
    pub size: Decimal,
}

impl PriceLevel {
    /// Create a new price level.
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// L2 order book for one outcome token.
#[derive(Debug, Clone)]
pub struct OrderBook {
    /// Token ID this book represents.
    pub token_id: String,
    /// Bid levels sorted by price descending.
    pub bids: Vec<PriceLevel>,
    /// Ask levels sorted by price ascending.
    pub asks: Vec<PriceLevel>,
    /// When this book was fetched.
    pub updated_at: OffsetDateTime,
}

impl OrderBook {
    /// Build a book from unsorted levels. Levels with non-positive price or size are dropped.
    pub fn from_levels(
        token_id: impl Into<String>,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
    ) -> Self {
        let keep = |l: &PriceLevel| l.price > Decimal::ZERO && l.size > Decimal::ZERO;

        let mut bids: Vec<PriceLevel> = bids.into_iter().filter(keep).collect();
        let mut asks: Vec<PriceLevel> = asks.into_iter().filter(keep).collect();

        // Sort bids descending by price
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        // Sort asks ascending by price
        asks.sort_by(|a, b| a.price.cmp(&b.price));

        Self {
            token_id: token_id.into(),
            bids,
            asks,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    /// Get the best bid price.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    /// Get the best ask price.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }
}

/// Order book response from the CLOB API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderBookResponse {
    /// Bid levels.
    #[serde(default, alias = "bid")]
    pub bids: Option<Vec<OrderLevel>>,
    /// Ask levels.
    #[serde(default, alias = "ask")]
    pub asks: Option<Vec<OrderLevel>>,
    /// Market ID.
    pub market: Option<String>,
    /// Asset ID.
    pub asset_id: Option<String>,
}

/// Single price level as sent by the API: either `{"price", "size"}` or `[price, size]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OrderLevel {
    /// Object form.
    Object {
        /// Price at this level.
        price: Value,
        /// Size available at this level.
        #[serde(default)]
        size: Value,
    },
    /// Tuple form.
    Pair(Vec<Value>),
}

impl OrderLevel {
    /// Coerce to a typed level. A missing size is treated as zero.
    pub fn to_price_level(&self) -> Option<PriceLevel> {
        let (price, size) = match self {
            OrderLevel::Object { price, size } => (price, Some(size)),
            OrderLevel::Pair(values) => (values.first()?, values.get(1)),
        };
        Some(PriceLevel {
            price: value_to_decimal(price)?,
            size: size.and_then(value_to_decimal).unwrap_or(Decimal::ZERO),
        })
    }
}

impl OrderBookResponse {
    /// Convert API response to an `OrderBook`.
    pub fn into_book(self, token_id: &str) -> OrderBook {
        let parse_levels = |levels: Option<Vec<OrderLevel>>| -> Vec<PriceLevel> {
            levels
                .unwrap_or_default()
                .iter()
                .filter_map(OrderLevel::to_price_level)
                .collect()
        };

        OrderBook::from_levels(token_id, parse_levels(self.bids), parse_levels(self.asks))
    }
}
