//! The trading loop.
//!
//! Each cycle selects a market, evaluates the buy rule, places a bracket when
//! it fires and then polls open positions. The loop is sequential and owns the
//! position table; the HTTP server only sees published snapshots.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::api::{AppState, BotSnapshot, BotStats, PositionSummary};
use crate::bracket::{check_positions, evaluate, execute_buy, BracketResult};
use crate::config::{Config, TradingConfig};
use crate::market::{find_active_market, Market, MarketApi};
use crate::metrics;
use crate::trading::position::PositionBook;

/// What a single cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No eligible market.
    NoMarket,
    /// Market found, no buy signal.
    Idle,
    /// A buy was accepted.
    Bought(BracketResult),
    /// A buy signal fired but the buy order failed or did not open a new position.
    BuyFailed(String),
    /// The cycle failed before reaching a decision.
    Error(String),
}

impl CycleOutcome {
    /// Short label for status output.
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::NoMarket => "no_market",
            CycleOutcome::Idle => "idle",
            CycleOutcome::Bought(BracketResult::Bracketed { .. }) => "bracketed",
            CycleOutcome::Bought(BracketResult::BuyOnly { .. }) => "buy_only",
            CycleOutcome::BuyFailed(_) => "buy_failed",
            CycleOutcome::Error(_) => "error",
        }
    }

    /// Whether the next sleep uses the longer backoff.
    pub fn needs_backoff(&self) -> bool {
        matches!(self, CycleOutcome::NoMarket | CycleOutcome::Error(_))
    }
}

/// The bracket trading bot.
pub struct BracketBot<A: MarketApi> {
    api: A,
    trading: TradingConfig,
    poll_interval: Duration,
    error_backoff: Duration,
    dry_run: bool,
    positions: PositionBook,
    current_market: Option<Market>,
    running: Arc<AtomicBool>,
    state: Option<AppState>,
    stats: BotStats,
    cycles: u64,
}

impl<A: MarketApi> BracketBot<A> {
    /// Create a bot. The run flag starts set.
    pub fn new(api: A, config: &Config) -> Self {
        Self {
            api,
            trading: config.trading(),
            poll_interval: config.poll_interval(),
            error_backoff: config.error_backoff(),
            dry_run: config.dry_run,
            positions: PositionBook::new(),
            current_market: None,
            running: Arc::new(AtomicBool::new(true)),
            state: None,
            stats: BotStats::default(),
            cycles: 0,
        }
    }

    /// Publish snapshots into `state` after every cycle.
    pub fn with_state(mut self, state: AppState) -> Self {
        self.state = Some(state);
        self
    }

    /// Shared run flag; clearing it stops the loop at the top of the next cycle.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Request a stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the run flag is set.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Exchange adapter.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Trading parameters.
    pub fn trading(&self) -> &TradingConfig {
        &self.trading
    }

    /// Tracked positions.
    pub fn positions(&self) -> &PositionBook {
        &self.positions
    }

    /// Market selected by the last successful search.
    pub fn current_market(&self) -> Option<&Market> {
        self.current_market.as_ref()
    }

    /// Counters since startup.
    pub fn stats(&self) -> &BotStats {
        &self.stats
    }

    /// Completed cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Sleep that follows a cycle with this outcome.
    pub fn sleep_after(&self, outcome: &CycleOutcome) -> Duration {
        if outcome.needs_backoff() {
            self.error_backoff
        } else {
            self.poll_interval
        }
    }

    /// Run one find / evaluate / place / monitor pass.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let _timer = metrics::timer_cycle();
        self.cycles += 1;

        let outcome = self.cycle_inner().await;

        if let CycleOutcome::Error(reason) = &outcome {
            error!(reason = %reason, "Cycle failed");
            self.stats.cycle_errors += 1;
            metrics::inc_cycle_errors();
        }

        self.publish(&outcome).await;
        outcome
    }

    async fn cycle_inner(&mut self) -> CycleOutcome {
        let market = match find_active_market(&self.api, &self.trading).await {
            Ok(Some(market)) => market,
            Ok(None) => {
                info!(
                    underlying = %self.trading.underlying,
                    duration = %self.trading.duration,
                    "No active market found"
                );
                return CycleOutcome::NoMarket;
            }
            Err(e) => return CycleOutcome::Error(format!("market search failed: {}", e)),
        };

        self.track_market(&market);

        let outcome = match evaluate(&self.api, &market, &self.trading).await {
            Some(signal) => {
                self.stats.buy_signals += 1;
                match execute_buy(&self.api, &signal, &self.trading, &mut self.positions).await {
                    Ok(result) => {
                        self.stats.buys_placed += 1;
                        if matches!(result, BracketResult::Bracketed { .. }) {
                            self.stats.sells_placed += 1;
                        }
                        CycleOutcome::Bought(result)
                    }
                    Err(e) => {
                        self.stats.buy_failures += 1;
                        CycleOutcome::BuyFailed(e.to_string())
                    }
                }
            }
            None => CycleOutcome::Idle,
        };

        let report = check_positions(&self.api, &self.trading, &mut self.positions).await;
        self.stats.sells_placed += report.sells_placed as u64;
        self.stats.positions_closed += report.pruned.len() as u64;
        if report.errors > 0 {
            warn!(errors = report.errors, checked = report.checked, "Position check had failures");
        }

        outcome
    }

    fn track_market(&mut self, market: &Market) {
        let changed = self
            .current_market
            .as_ref()
            .map(|current| current.id != market.id)
            .unwrap_or(true);

        if changed {
            info!(
                market_id = %market.id,
                market = %market.title(),
                volume = %market.volume_or_zero(),
                "Switched to market"
            );
            metrics::inc_market_changes();
        }

        self.current_market = Some(market.clone());
    }

    async fn publish(&self, outcome: &CycleOutcome) {
        let Some(state) = &self.state else {
            return;
        };

        let snapshot = BotSnapshot {
            underlying: self.trading.underlying.clone(),
            dry_run: self.dry_run,
            market_id: self.current_market.as_ref().map(|m| m.id.clone()),
            market: self.current_market.as_ref().map(|m| m.title().to_string()),
            cycles: self.cycles,
            last_outcome: Some(outcome.label().to_string()),
            stats: self.stats.clone(),
            open_cost_basis: self.positions.total_cost_basis().to_string(),
            awaiting_sell: self.positions.awaiting_sell(),
            positions: self.positions.iter().map(PositionSummary::from).collect(),
        };
        state.publish(snapshot).await;
    }

    /// Loop until the run flag is cleared. The flag is checked once per cycle.
    pub async fn run(&mut self) {
        info!(
            underlying = %self.trading.underlying,
            duration = %self.trading.duration,
            buy_price = %self.trading.buy_price,
            sell_price = %self.trading.sell_price,
            spread = %self.trading.spread(),
            size = %self.trading.max_position_size,
            min_profit_rate = %self.trading.min_profit_rate,
            dry_run = self.dry_run,
            "Bracket bot started"
        );

        if let Some(state) = &self.state {
            state.set_ready(true);
        }

        while self.is_running() {
            let outcome = self.run_cycle().await;
            let pause = self.sleep_after(&outcome);
            debug!(outcome = outcome.label(), sleep_ms = pause.as_millis() as u64, "Cycle complete");
            tokio::time::sleep(pause).await;
        }

        if let Some(state) = &self.state {
            state.set_ready(false);
        }

        info!(
            cycles = self.cycles,
            open_positions = self.positions.len(),
            buys = self.stats.buys_placed,
            "Bracket bot stopped"
        );
    }
}
