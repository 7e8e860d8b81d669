//! Trading module for order management and execution.
//!
//! This module handles:
//! - Order types and creation
//! - Order submission and status queries
//! - Position tracking

pub mod execution;
pub mod order;
pub mod position;

pub use execution::{fetch_order_state, submit_limit_order};
pub use order::{LimitOrder, OrderState, OrderStatus, Side};
pub use position::{Position, PositionBook};
