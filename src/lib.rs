//! 15-minute Polymarket bracket trading bot.
//!
//! The bot watches short-duration binary markets on one underlying asset. When
//! the YES token can be bought at or below a fixed price it places a bracket: a
//! limit buy at that price and a limit sell at a fixed markup.
//!
//! ```text
//! YES ask:     0.78  <= buy price 0.80  -> buy 100 @ 0.80
//!                                       -> sell 100 @ 0.90
//! Spread:      0.10 per share if both legs fill
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`market`]: Exchange adapter, Polymarket client and market selection
//! - [`orderbook`]: Order book types
//! - [`bracket`]: Signal detection, order placement and position monitoring
//! - [`bot`]: The trading loop
//! - [`trading`]: Order types, order wire helpers and position tracking
//! - [`signing`]: Wallet and request signing
//! - [`metrics`]: Prometheus metrics
//! - [`api`]: HTTP API for health/status/metrics
//! - [`utils`]: Shutdown signal handling

pub mod api;
pub mod bot;
pub mod bracket;
pub mod config;
pub mod error;
pub mod market;
pub mod metrics;
pub mod orderbook;
pub mod signing;
pub mod trading;
pub mod utils;

pub use config::Config;
pub use error::{BotError, Result};
