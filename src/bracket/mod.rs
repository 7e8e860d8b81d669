//! Bracket trading: buy at a fixed price, sell at a fixed markup.
//!
//! This module handles:
//! - Buy-signal detection on the YES token
//! - Placing the buy and sell legs
//! - Polling open positions until they close

pub mod detector;
pub mod executor;
pub mod monitor;

pub use detector::{evaluate, is_buy_signal, quote_yes, BuySignal, PriceSource, Quote};
pub use executor::{execute_buy, place_sell, BracketResult};
pub use monitor::{check_positions, MonitorReport};
