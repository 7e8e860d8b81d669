//! Market module for short-duration prediction markets.
//!
//! This module handles:
//! - Market types and wire payloads
//! - The exchange adapter trait and its Polymarket implementation
//! - Market selection
//! - Mock adapter for testing

pub mod api;
pub mod client;
pub mod finder;
pub mod mock;
pub mod types;

pub use api::MarketApi;
pub use client::PolymarketClient;
pub use finder::{find_active_market, select_market};
pub use mock::{MockConfig, MockMarketApi, MockOrderBookBuilder};
pub use types::{Market, Outcome, OutcomeToken};
