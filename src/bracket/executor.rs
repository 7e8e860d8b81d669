//! Bracket order placement.

use tracing::{error, info, instrument, warn};

use super::detector::BuySignal;
use crate::config::TradingConfig;
use crate::error::TradingError;
use crate::market::MarketApi;
use crate::metrics;
use crate::trading::order::{LimitOrder, Side};
use crate::trading::position::{Position, PositionBook};

/// Result of acting on a buy signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BracketResult {
    /// Both legs accepted.
    Bracketed {
        /// Buy order ID.
        buy_order_id: String,
        /// Sell order ID.
        sell_order_id: String,
    },
    /// Buy accepted, sell failed. The monitor retries the sell after the buy fills.
    BuyOnly {
        /// Buy order ID.
        buy_order_id: String,
        /// Why the sell was not placed.
        reason: String,
    },
}

impl BracketResult {
    /// Buy order id of the opened position.
    pub fn buy_order_id(&self) -> &str {
        match self {
            BracketResult::Bracketed { buy_order_id, .. } => buy_order_id,
            BracketResult::BuyOnly { buy_order_id, .. } => buy_order_id,
        }
    }
}

/// Submit the buy leg, record the position, then submit the sell leg.
///
/// Fails when the buy is not accepted, or when its id already backs a
/// position. Nothing new is recorded in either case.
#[instrument(skip(api, config, positions, signal), fields(market_id = %signal.market_id, ask = %signal.ask))]
pub async fn execute_buy<A: MarketApi + ?Sized>(
    api: &A,
    signal: &BuySignal,
    config: &TradingConfig,
    positions: &mut PositionBook,
) -> Result<BracketResult, TradingError> {
    let order = LimitOrder::buy(
        signal.token_id.clone(),
        config.buy_price,
        config.max_position_size,
        config.buy_order_ttl_secs,
    );

    let buy_order_id = match api.create_limit_order(&order).await {
        Ok(id) => id,
        Err(e) => {
            error!(error = %e, "Buy order failed");
            metrics::inc_orders_failed(Side::Buy);
            return Err(e);
        }
    };
    metrics::inc_orders_submitted(Side::Buy);

    info!(
        order_id = %buy_order_id,
        price = %order.price,
        size = %order.size,
        "Buy order placed"
    );

    let position = Position::new(
        signal.market_id.clone(),
        signal.token_id.clone(),
        order.price,
        order.size,
        buy_order_id.clone(),
    );
    if !positions.open(position) {
        warn!(order_id = %buy_order_id, "Order id already tracked, keeping original position");
        return Err(TradingError::DuplicateOrderId {
            order_id: buy_order_id,
        });
    }

    match place_sell(api, config, positions, &buy_order_id).await {
        Ok(sell_order_id) => Ok(BracketResult::Bracketed {
            buy_order_id,
            sell_order_id,
        }),
        Err(e) => Ok(BracketResult::BuyOnly {
            buy_order_id,
            reason: e.to_string(),
        }),
    }
}

/// Submit the sell leg for the position opened by `buy_order_id`.
///
/// A position that already has a sell order returns that id without submitting.
#[instrument(skip(api, config, positions))]
pub async fn place_sell<A: MarketApi + ?Sized>(
    api: &A,
    config: &TradingConfig,
    positions: &mut PositionBook,
    buy_order_id: &str,
) -> Result<String, TradingError> {
    let position = positions
        .get(buy_order_id)
        .ok_or_else(|| TradingError::InvalidParams(format!("no position for {}", buy_order_id)))?;

    if let Some(existing) = &position.sell_order_id {
        return Ok(existing.clone());
    }

    let order = LimitOrder::sell(
        position.token_id.clone(),
        config.sell_price,
        position.sell_size(),
        config.sell_order_ttl_secs,
    );

    let sell_order_id = match api.create_limit_order(&order).await {
        Ok(id) => id,
        Err(e) => {
            error!(error = %e, "Sell order failed");
            metrics::inc_orders_failed(Side::Sell);
            return Err(e);
        }
    };
    metrics::inc_orders_submitted(Side::Sell);

    positions.attach_sell_order(buy_order_id, sell_order_id.clone());

    info!(
        order_id = %sell_order_id,
        price = %order.price,
        size = %order.size,
        "Sell order placed"
    );

    Ok(sell_order_id)
}
