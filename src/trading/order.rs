//! Order types and creation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order.
    #[strum(to_string = "BUY", serialize = "buy")]
    Buy,
    /// Sell order.
    #[strum(to_string = "SELL", serialize = "sell")]
    Sell,
}

/// Order status reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(ascii_case_insensitive)]
pub enum OrderStatus {
    /// Order is pending.
    #[strum(serialize = "PENDING")]
    Pending,
    /// Order is live on the book.
    #[strum(to_string = "LIVE", serialize = "OPEN")]
    Live,
    /// Order matched, settlement in flight.
    #[strum(serialize = "MATCHED")]
    Matched,
    /// Order is fully filled.
    #[strum(serialize = "FILLED")]
    Filled,
    /// Order was cancelled.
    #[strum(to_string = "CANCELED", serialize = "CANCELLED")]
    Canceled,
    /// Order was rejected.
    #[strum(serialize = "REJECTED")]
    Rejected,
    /// Order expired.
    #[strum(serialize = "EXPIRED")]
    Expired,
}

impl OrderStatus {
    /// Check if status is terminal (won't change).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }

    /// Check if order was filled.
    pub fn is_filled(&self) -> bool {
        matches!(self, OrderStatus::Filled)
    }
}

/// A limit order ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitOrder {
    /// Token ID to trade.
    pub token_id: String,
    /// Order side (buy/sell).
    pub side: Side,
    /// Limit price.
    pub price: Decimal,
    /// Order size in shares.
    pub size: Decimal,
    /// Unix timestamp (seconds) after which the order expires.
    pub expiration: i64,
}

impl LimitOrder {
    /// Create a new buy order that expires `ttl_secs` from now.
    pub fn buy(token_id: impl Into<String>, price: Decimal, size: Decimal, ttl_secs: i64) -> Self {
        Self {
            token_id: token_id.into(),
            side: Side::Buy,
            price,
            size,
            expiration: expiration_from_now(ttl_secs),
        }
    }

    /// Create a new sell order that expires `ttl_secs` from now.
    pub fn sell(token_id: impl Into<String>, price: Decimal, size: Decimal, ttl_secs: i64) -> Self {
        Self {
            token_id: token_id.into(),
            side: Side::Sell,
            price,
            size,
            expiration: expiration_from_now(ttl_secs),
        }
    }

    /// Validate order parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.token_id.is_empty() {
            return Err("token_id is required".to_string());
        }
        if self.price <= Decimal::ZERO || self.price >= Decimal::ONE {
            return Err("price must be between 0 and 1".to_string());
        }
        if self.size <= Decimal::ZERO {
            return Err("size must be positive".to_string());
        }
        Ok(())
    }
}

fn expiration_from_now(ttl_secs: i64) -> i64 {
    chrono::Utc::now().timestamp() + ttl_secs
}

/// Order state summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderState {
    /// Order ID.
    pub order_id: String,
    /// Current status, if the exchange reported a recognizable one.
    pub status: Option<OrderStatus>,
    /// Filled size.
    pub filled_size: Option<Decimal>,
    /// Original size.
    pub original_size: Option<Decimal>,
}

impl OrderState {
    /// Whether the order is fully filled, by status or by size.
    pub fn is_filled(&self) -> bool {
        if self.status.map(|s| s.is_filled()).unwrap_or(false) {
            return true;
        }
        match (self.filled_size, self.original_size) {
            (Some(filled), Some(original)) => original > Decimal::ZERO && filled >= original,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn limit_order_creation() {
        let before = chrono::Utc::now().timestamp();
        let buy = LimitOrder::buy("token-123", dec!(0.80), dec!(100), 300);
        assert_eq!(buy.side, Side::Buy);
        assert_eq!(buy.price, dec!(0.80));
        assert_eq!(buy.size, dec!(100));
        assert!(buy.expiration >= before + 300);

        let sell = LimitOrder::sell("token-123", dec!(0.90), dec!(100), 900);
        assert_eq!(sell.side, Side::Sell);
        assert!(sell.expiration >= before + 900);
    }

    #[test]
    fn limit_order_validation() {
        assert!(LimitOrder::buy("token", dec!(0.80), dec!(10), 60).validate().is_ok());
        assert!(LimitOrder::buy("", dec!(0.80), dec!(10), 60).validate().is_err());
        assert!(LimitOrder::buy("token", dec!(0), dec!(10), 60).validate().is_err());
        assert!(LimitOrder::buy("token", dec!(1.2), dec!(10), 60).validate().is_err());
        assert!(LimitOrder::sell("token", dec!(0.9), dec!(-1), 60).validate().is_err());
    }

    #[test]
    fn order_status_parses_case_insensitively() {
        assert_eq!(OrderStatus::from_str("FILLED").unwrap(), OrderStatus::Filled);
        assert_eq!(OrderStatus::from_str("filled").unwrap(), OrderStatus::Filled);
        assert_eq!(OrderStatus::from_str("Cancelled").unwrap(), OrderStatus::Canceled);
        assert_eq!(OrderStatus::from_str("live").unwrap(), OrderStatus::Live);
        assert!(OrderStatus::from_str("weird").is_err());
    }

    #[test]
    fn order_status_terminal() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(OrderStatus::Expired.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Live.is_terminal());
        assert!(!OrderStatus::Matched.is_terminal());
    }

    #[test]
    fn order_state_filled_by_size() {
        let state = OrderState {
            order_id: "o".to_string(),
            status: Some(OrderStatus::Live),
            filled_size: Some(dec!(100)),
            original_size: Some(dec!(100)),
        };
        assert!(state.is_filled());

        let partial = OrderState {
            filled_size: Some(dec!(40)),
            ..state
        };
        assert!(!partial.is_filled());
    }
}
