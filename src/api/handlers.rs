//! HTTP API handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::trading::position::Position;

/// Application state shared with handlers.
///
/// The trading loop owns the real position table and publishes a
/// [`BotSnapshot`] here after every cycle.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Whether the bot is ready to trade.
    pub ready: Arc<AtomicBool>,
    /// Latest published loop state.
    pub snapshot: Arc<RwLock<BotSnapshot>>,
    /// Prometheus render handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state.
    pub fn new() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
            snapshot: Arc::new(RwLock::new(BotSnapshot::default())),
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Replace the published snapshot.
    pub async fn publish(&self, snapshot: BotSnapshot) {
        *self.snapshot.write().await = snapshot;
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Loop state visible to the status endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BotSnapshot {
    /// Underlying being traded.
    pub underlying: String,
    /// Whether orders are simulated.
    pub dry_run: bool,
    /// Selected market id.
    pub market_id: Option<String>,
    /// Selected market title.
    pub market: Option<String>,
    /// Completed loop cycles.
    pub cycles: u64,
    /// Outcome of the last cycle.
    pub last_outcome: Option<String>,
    /// Running counters.
    pub stats: BotStats,
    /// Buy-side cost of tracked positions.
    pub open_cost_basis: String,
    /// Tracked positions with no sell order yet.
    pub awaiting_sell: usize,
    /// Tracked positions.
    pub positions: Vec<PositionSummary>,
}

/// Running counters since startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BotStats {
    /// Buy signals seen.
    pub buy_signals: u64,
    /// Buy orders accepted.
    pub buys_placed: u64,
    /// Sell orders accepted, including repairs by the monitor.
    pub sells_placed: u64,
    /// Buy orders that failed.
    pub buy_failures: u64,
    /// Positions pruned after closing.
    pub positions_closed: u64,
    /// Cycles that ended in an error.
    pub cycle_errors: u64,
}

/// One tracked position.
#[derive(Debug, Clone, Serialize)]
pub struct PositionSummary {
    /// Buy order id.
    pub order_id: String,
    /// Market id.
    pub market_id: String,
    /// Token id.
    pub token_id: String,
    /// Buy limit price.
    pub buy_price: String,
    /// Shares.
    pub amount: String,
    /// Shares the buy has matched.
    pub filled_size: String,
    /// Sell order id.
    pub sell_order_id: Option<String>,
    /// Last buy status.
    pub buy_status: Option<String>,
    /// Last sell status.
    pub sell_status: Option<String>,
    /// When the buy was accepted.
    #[serde(with = "time::serde::rfc3339")]
    pub opened_at: OffsetDateTime,
}

impl From<&Position> for PositionSummary {
    fn from(position: &Position) -> Self {
        Self {
            order_id: position.order_id.clone(),
            market_id: position.market_id.clone(),
            token_id: position.token_id.clone(),
            buy_price: position.buy_price.to_string(),
            amount: position.amount.to_string(),
            filled_size: position.filled_size.to_string(),
            sell_order_id: position.sell_order_id.clone(),
            buy_status: position.buy_status.map(|s| s.to_string()),
            sell_status: position.sell_status.map(|s| s.to_string()),
            opened_at: position.timestamp,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether service is ready.
    pub ready: bool,
    /// Current market if available.
    pub market: Option<String>,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Loop state.
    #[serde(flatten)]
    pub snapshot: BotSnapshot,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let market = state.snapshot.read().await.market.clone();

    let response = ReadyResponse {
        ready: is_ready,
        market,
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns the loop snapshot.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await.clone();
    let status = if state.is_ready() { "running" } else { "starting" };

    Json(StatusResponse { status, snapshot })
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::NOT_FOUND,
            "metrics recorder not installed".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading::order::OrderStatus;
    use rust_decimal_macros::dec;

    #[test]
    fn app_state_ready_toggle() {
        let state = AppState::new();
        assert!(!state.is_ready());

        state.set_ready(true);
        assert!(state.is_ready());

        state.set_ready(false);
        assert!(!state.is_ready());
    }

    #[tokio::test]
    async fn publish_replaces_snapshot() {
        let state = AppState::new();
        state
            .publish(BotSnapshot {
                market_id: Some("m1".to_string()),
                cycles: 3,
                ..Default::default()
            })
            .await;

        let snapshot = state.snapshot.read().await;
        assert_eq!(snapshot.market_id.as_deref(), Some("m1"));
        assert_eq!(snapshot.cycles, 3);
    }

    #[test]
    fn position_summary_from_position() {
        let mut position = Position::new("m1", "yes", dec!(0.80), dec!(100), "buy-1");
        position.buy_status = Some(OrderStatus::Filled);

        let summary = PositionSummary::from(&position);
        assert_eq!(summary.buy_price, "0.80");
        assert_eq!(summary.buy_status.as_deref(), Some("FILLED"));
        assert_eq!(summary.sell_status, None);

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["opened_at"].as_str().is_some());
    }
}
