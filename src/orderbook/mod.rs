//! Order book module for managing market data.
//!
//! This module handles:
//! - Order book types and data structures
//! - Conversion from the CLOB `/book` payload

pub mod types;

pub use types::{OrderBook, OrderBookResponse, OrderLevel, PriceLevel};
