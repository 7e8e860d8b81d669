//! Market selection for the configured underlying and duration.

use tracing::{debug, instrument};

use super::api::MarketApi;
use super::types::Market;
use crate::config::TradingConfig;
use crate::error::MarketError;

/// Search for markets and pick the one to trade.
///
/// An empty result is `Ok(None)`; only a failed search is an error.
#[instrument(skip(api, config), fields(underlying = %config.underlying, duration = %config.duration))]
pub async fn find_active_market<A: MarketApi + ?Sized>(
    api: &A,
    config: &TradingConfig,
) -> Result<Option<Market>, MarketError> {
    let query = config.search_query();
    let markets = api.search_markets(&query, config.search_limit).await?;

    debug!(query = %query, candidates = markets.len(), "Market search returned");

    Ok(select_market(markets, config))
}

/// Keep eligible markets and return the one with the highest volume.
///
/// Missing volume counts as zero. Among equal volumes the first candidate wins.
pub fn select_market(markets: Vec<Market>, config: &TradingConfig) -> Option<Market> {
    markets
        .into_iter()
        .filter(|m| is_eligible(m, config))
        .fold(None, |best: Option<Market>, m| match best {
            Some(b) if b.volume_or_zero() >= m.volume_or_zero() => Some(b),
            _ => Some(m),
        })
}

/// Whether a market is tradeable for this configuration.
pub fn is_eligible(market: &Market, config: &TradingConfig) -> bool {
    market.active
        && !market.resolved
        && matches_duration(market, &config.duration)
        && market
            .underlying
            .as_deref()
            .map(|u| u.eq_ignore_ascii_case(&config.underlying))
            .unwrap_or(false)
}

/// Duration matches on the explicit tag, or on the question text mentioning it.
fn matches_duration(market: &Market, duration: &str) -> bool {
    if market
        .duration
        .as_deref()
        .map(|d| d.eq_ignore_ascii_case(duration))
        .unwrap_or(false)
    {
        return true;
    }

    let Some(question) = market.question.as_deref() else {
        return false;
    };

    let question = question.to_lowercase();
    if question.contains(&duration.to_lowercase()) {
        return true;
    }

    // "15m" is also written "15分钟"
    duration
        .strip_suffix('m')
        .map(|minutes| question.contains(&format!("{}分钟", minutes)))
        .unwrap_or(false)
}
