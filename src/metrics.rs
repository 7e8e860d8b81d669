//! Prometheus metrics for the trading loop.
//!
//! This module provides:
//! - HTTP request and cycle latency histograms
//! - Order, signal and position counters
//! - The Prometheus recorder served at `/metrics`

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::debug;

use crate::error::BotError;
use crate::trading::order::Side;

// === Metric Name Constants ===

/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";
/// Full loop cycle latency metric name.
pub const METRIC_CYCLE_LATENCY: &str = "cycle_latency_ms";
/// Orders submitted counter metric name.
pub const METRIC_ORDERS_SUBMITTED: &str = "orders_submitted_total";
/// Orders filled counter metric name.
pub const METRIC_ORDERS_FILLED: &str = "orders_filled_total";
/// Orders failed counter metric name.
pub const METRIC_ORDERS_FAILED: &str = "orders_failed_total";
/// Buy signals counter metric name.
pub const METRIC_BUY_SIGNALS: &str = "buy_signals_total";
/// Selected market changes counter metric name.
pub const METRIC_MARKET_CHANGES: &str = "market_changes_total";
/// Failed cycles counter metric name.
pub const METRIC_CYCLE_ERRORS: &str = "cycle_errors_total";
/// Pruned positions counter metric name.
pub const METRIC_POSITIONS_PRUNED: &str = "positions_pruned_total";
/// Open positions gauge metric name.
pub const METRIC_OPEN_POSITIONS: &str = "open_positions";

/// Initialize all metric descriptions.
/// Call this once at startup, after the recorder is installed.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );
    describe_histogram!(METRIC_CYCLE_LATENCY, "Trading loop cycle latency in milliseconds");

    describe_counter!(METRIC_ORDERS_SUBMITTED, "Total number of orders accepted");
    describe_counter!(METRIC_ORDERS_FILLED, "Total number of orders observed filled");
    describe_counter!(METRIC_ORDERS_FAILED, "Total number of orders that failed");
    describe_counter!(METRIC_BUY_SIGNALS, "Total number of buy signals");
    describe_counter!(METRIC_MARKET_CHANGES, "Total number of selected market changes");
    describe_counter!(METRIC_CYCLE_ERRORS, "Total number of failed loop cycles");
    describe_counter!(METRIC_POSITIONS_PRUNED, "Total number of closed positions pruned");

    describe_gauge!(METRIC_OPEN_POSITIONS, "Number of tracked positions");

    debug!("Metrics initialized");
}

/// Install the global Prometheus recorder and return its render handle.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, BotError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| BotError::Metrics(e.to_string()))
}

/// Record HTTP request latency.
pub fn record_http_latency(start: Instant, endpoint: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => endpoint.to_string()).record(latency_ms);
}

fn side_label(side: Side) -> &'static str {
    match side {
        Side::Buy => "buy",
        Side::Sell => "sell",
    }
}

/// Increment order submitted counter.
pub fn inc_orders_submitted(side: Side) {
    counter!(METRIC_ORDERS_SUBMITTED, "side" => side_label(side)).increment(1);
}

/// Increment orders filled counter.
pub fn inc_orders_filled(side: Side) {
    counter!(METRIC_ORDERS_FILLED, "side" => side_label(side)).increment(1);
}

/// Increment orders failed counter.
pub fn inc_orders_failed(side: Side) {
    counter!(METRIC_ORDERS_FAILED, "side" => side_label(side)).increment(1);
}

/// Increment buy signals counter.
pub fn inc_buy_signals(source: &'static str) {
    counter!(METRIC_BUY_SIGNALS, "source" => source).increment(1);
}

/// Increment market changes counter.
pub fn inc_market_changes() {
    counter!(METRIC_MARKET_CHANGES).increment(1);
}

/// Increment failed cycles counter.
pub fn inc_cycle_errors() {
    counter!(METRIC_CYCLE_ERRORS).increment(1);
}

/// Add to pruned positions counter.
pub fn add_positions_pruned(count: usize) {
    counter!(METRIC_POSITIONS_PRUNED).increment(count as u64);
}

/// Set the open positions gauge.
pub fn set_open_positions(count: usize) {
    gauge!(METRIC_OPEN_POSITIONS).set(count as f64);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(self.metric_name).record(self.elapsed_ms());
    }
}

/// Create a latency timer for one loop cycle.
pub fn timer_cycle() -> LatencyTimer {
    LatencyTimer::new(METRIC_CYCLE_LATENCY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn latency_timer_measures_time() {
        let timer = timer_cycle();
        sleep(Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 9.0);
    }

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        inc_orders_submitted(Side::Buy);
        inc_buy_signals("order_book");
        add_positions_pruned(2);
        set_open_positions(1);
    }
}
