//! Position monitoring: order status polling, sell repair and pruning.

use tracing::{debug, info, instrument, warn};

use super::executor::place_sell;
use crate::config::TradingConfig;
use crate::market::MarketApi;
use crate::metrics;
use crate::trading::order::{OrderState, OrderStatus, Side};
use crate::trading::position::{Position, PositionBook};

/// Summary of one monitoring pass.
#[derive(Debug, Default)]
pub struct MonitorReport {
    /// Positions examined.
    pub checked: usize,
    /// Buy legs observed filled during this pass.
    pub buys_filled: usize,
    /// Sell legs observed filled during this pass.
    pub sells_filled: usize,
    /// Sell orders placed for filled buys that lacked one.
    pub sells_placed: usize,
    /// Positions whose status poll or sell placement failed.
    pub errors: usize,
    /// Positions removed because they can no longer change.
    pub pruned: Vec<Position>,
}

fn effective_status(state: &OrderState) -> Option<OrderStatus> {
    if state.is_filled() {
        Some(OrderStatus::Filled)
    } else {
        state.status
    }
}

/// Poll every tracked position once.
///
/// A failure on one position is logged and the pass moves on to the next.
#[instrument(skip_all, fields(positions = positions.len()))]
pub async fn check_positions<A: MarketApi + ?Sized>(
    api: &A,
    config: &TradingConfig,
    positions: &mut PositionBook,
) -> MonitorReport {
    let mut report = MonitorReport::default();

    for order_id in positions.order_ids() {
        report.checked += 1;

        let buy_terminal = positions
            .get(&order_id)
            .and_then(|p| p.buy_status)
            .map(|s| s.is_terminal())
            .unwrap_or(false);

        if !buy_terminal {
            match api.get_order_status(&order_id).await {
                Ok(state) => {
                    let status = effective_status(&state);
                    if let Some(position) = positions.get_mut(&order_id) {
                        let was_filled = position.buy_filled();
                        if let Some(filled) = state.filled_size {
                            position.filled_size = filled;
                        }
                        if status.is_some() {
                            position.buy_status = status;
                        }
                        if position.buy_filled() && !was_filled {
                            if status == Some(OrderStatus::Filled) {
                                info!(order_id = %order_id, "Buy order filled");
                            } else {
                                info!(
                                    order_id = %order_id,
                                    status = ?status,
                                    filled = %position.filled_size,
                                    "Buy order ended partially filled"
                                );
                            }
                            metrics::inc_orders_filled(Side::Buy);
                            report.buys_filled += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!(order_id = %order_id, error = %e, "Failed to check buy order");
                    report.errors += 1;
                    continue;
                }
            }
        }

        let Some(position) = positions.get(&order_id) else {
            continue;
        };

        if position.buy_filled() && position.needs_sell() {
            match place_sell(api, config, positions, &order_id).await {
                Ok(_) => report.sells_placed += 1,
                Err(e) => {
                    warn!(order_id = %order_id, error = %e, "Failed to place missing sell order");
                    report.errors += 1;
                    continue;
                }
            }
        }

        let Some(position) = positions.get(&order_id) else {
            continue;
        };

        let sell_to_poll = match (&position.sell_order_id, position.sell_status) {
            (Some(sell_id), status) if !status.map(|s| s.is_terminal()).unwrap_or(false) => {
                Some(sell_id.clone())
            }
            _ => None,
        };

        // The sell leg only matters once the buy has filled
        let Some(sell_id) = sell_to_poll.filter(|_| position.buy_filled()) else {
            continue;
        };

        match api.get_order_status(&sell_id).await {
            Ok(state) => {
                let status = effective_status(&state);
                if let Some(position) = positions.get_mut(&order_id) {
                    if status == Some(OrderStatus::Filled) {
                        info!(
                            order_id = %order_id,
                            sell_order_id = %sell_id,
                            "Sell order filled, bracket complete"
                        );
                        metrics::inc_orders_filled(Side::Sell);
                        report.sells_filled += 1;
                    }
                    if status.is_some() {
                        position.sell_status = status;
                    }
                }
            }
            Err(e) => {
                warn!(sell_order_id = %sell_id, error = %e, "Failed to check sell order");
                report.errors += 1;
            }
        }
    }

    report.pruned = positions.prune_closed();
    if !report.pruned.is_empty() {
        for closed in &report.pruned {
            debug!(
                order_id = %closed.order_id,
                buy_status = ?closed.buy_status,
                sell_status = ?closed.sell_status,
                "Position closed"
            );
        }
        metrics::add_positions_pruned(report.pruned.len());
    }
    metrics::set_open_positions(positions.len());

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MockMarketApi;
    use crate::trading::order::LimitOrder;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn open(positions: &mut PositionBook, order_id: &str) {
        positions.open(Position::new("m1", "yes-token", dec!(0.80), dec!(100), order_id));
    }

    #[tokio::test]
    async fn filled_buy_without_sell_gets_one() {
        let api = MockMarketApi::new();
        let config = TradingConfig::default();
        let mut positions = PositionBook::new();
        open(&mut positions, "buy-1");
        api.set_order_status("buy-1", OrderStatus::Filled);

        let report = check_positions(&api, &config, &mut positions).await;

        assert_eq!(report.buys_filled, 1);
        assert_eq!(report.sells_placed, 1);
        assert_eq!(report.errors, 0);

        let position = positions.get("buy-1").unwrap();
        assert_eq!(position.sell_order_id.as_deref(), Some("mock-sell-1"));
        assert_eq!(position.sell_status, Some(OrderStatus::Live));

        let sells = api.submitted(Side::Sell);
        assert_eq!(sells.len(), 1);
        assert_eq!(sells[0].1.price, dec!(0.90));
        assert_eq!(sells[0].1.size, dec!(100));
    }

    #[tokio::test]
    async fn unfilled_buy_places_nothing() {
        let api = MockMarketApi::new();
        let mut positions = PositionBook::new();
        open(&mut positions, "buy-1");
        api.set_order_status("buy-1", OrderStatus::Live);

        let report = check_positions(&api, &TradingConfig::default(), &mut positions).await;
        assert_eq!(report.sells_placed, 0);
        assert!(api.submitted_orders().is_empty());
        assert_eq!(positions.len(), 1);
    }

    #[tokio::test]
    async fn one_failing_position_does_not_stop_the_pass() {
        let api = MockMarketApi::new();
        let mut positions = PositionBook::new();
        open(&mut positions, "a-unknown");
        open(&mut positions, "b-filled");
        api.set_order_status("b-filled", OrderStatus::Filled);

        let report = check_positions(&api, &TradingConfig::default(), &mut positions).await;
        assert_eq!(report.checked, 2);
        assert_eq!(report.errors, 1);
        assert_eq!(report.sells_placed, 1);
        assert!(!positions.get("b-filled").unwrap().needs_sell());
    }

    #[tokio::test]
    async fn failed_sell_is_retried_next_pass() {
        let api = MockMarketApi::new();
        let config = TradingConfig::default();
        let mut positions = PositionBook::new();
        open(&mut positions, "buy-1");
        api.set_order_status("buy-1", OrderStatus::Filled);
        api.fail_sell(true);

        let report = check_positions(&api, &config, &mut positions).await;
        assert_eq!(report.errors, 1);
        assert!(positions.get("buy-1").unwrap().needs_sell());

        api.fail_sell(false);
        let report = check_positions(&api, &config, &mut positions).await;
        assert_eq!(report.sells_placed, 1);
        assert_eq!(report.buys_filled, 0);
        assert!(!positions.get("buy-1").unwrap().needs_sell());
    }

    #[tokio::test]
    async fn completed_and_dead_brackets_are_pruned() {
        let api = MockMarketApi::new();
        let mut positions = PositionBook::new();

        // Filled buy whose sell then fills
        let buy = LimitOrder::buy("yes-token", dec!(0.80), dec!(100), 300);
        let buy_id = api.create_limit_order(&buy).await.unwrap();
        open(&mut positions, &buy_id);
        let sell = LimitOrder::sell("yes-token", dec!(0.90), dec!(100), 900);
        let sell_id = api.create_limit_order(&sell).await.unwrap();
        positions.attach_sell_order(&buy_id, sell_id.clone());
        api.set_order_status(&buy_id, OrderStatus::Filled);
        api.set_order_status(&sell_id, OrderStatus::Filled);

        // Buy that expired without filling
        open(&mut positions, "expired");
        api.set_order_status("expired", OrderStatus::Expired);

        // Buy still resting
        open(&mut positions, "resting");
        api.set_order_status("resting", OrderStatus::Live);

        let report = check_positions(&api, &TradingConfig::default(), &mut positions).await;

        let mut pruned: Vec<_> = report.pruned.iter().map(|p| p.order_id.clone()).collect();
        pruned.sort();
        let mut expected = vec![buy_id, "expired".to_string()];
        expected.sort();

        assert_eq!(pruned, expected);
        assert_eq!(report.sells_filled, 1);
        assert_eq!(positions.order_ids(), vec!["resting".to_string()]);
    }

    #[tokio::test]
    async fn partially_filled_buy_gets_sell_for_matched_size() {
        let api = MockMarketApi::new();
        let config = TradingConfig::default();
        let mut positions = PositionBook::new();
        open(&mut positions, "buy-1");
        api.set_order_fill("buy-1", OrderStatus::Expired, dec!(40));

        let report = check_positions(&api, &config, &mut positions).await;

        assert_eq!(report.buys_filled, 1);
        assert_eq!(report.sells_placed, 1);
        assert!(report.pruned.is_empty());

        let sells = api.submitted(Side::Sell);
        assert_eq!(sells.len(), 1);
        assert_eq!(sells[0].1.size, dec!(40));

        let position = positions.get("buy-1").unwrap();
        assert_eq!(position.filled_size, dec!(40));
        let sell_id = position.sell_order_id.clone().unwrap();

        // Still tracked while the sell rests, pruned once it fills
        let report = check_positions(&api, &config, &mut positions).await;
        assert!(report.pruned.is_empty());
        assert_eq!(positions.len(), 1);

        api.set_order_status(&sell_id, OrderStatus::Filled);
        let report = check_positions(&api, &config, &mut positions).await;
        assert_eq!(report.sells_filled, 1);
        assert_eq!(report.pruned.len(), 1);
        assert!(positions.is_empty());
    }

    #[tokio::test]
    async fn status_failure_keeps_position() {
        let api = MockMarketApi::new();
        api.fail_status(true);
        let mut positions = PositionBook::new();
        open(&mut positions, "buy-1");

        let report = check_positions(&api, &TradingConfig::default(), &mut positions).await;
        assert_eq!(report.errors, 1);
        assert!(report.pruned.is_empty());
        assert_eq!(positions.len(), 1);
    }
}
