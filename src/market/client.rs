//! Polymarket API client: Gamma for market data, CLOB for books and orders.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::error::{BotError, MarketError, TradingError};
use crate::metrics;
use crate::orderbook::{OrderBook, OrderBookResponse};
use crate::signing::Wallet;
use crate::trading::execution::{
    fetch_order_state, is_simulated_order_id, simulated_order_id, submit_limit_order,
};
use crate::trading::order::{LimitOrder, OrderState, OrderStatus};

use super::api::MarketApi;
use super::types::{GammaMarket, Market};

/// Markets requested from Gamma per listing before local query filtering.
const GAMMA_PAGE_SIZE: u32 = 500;

/// Recurring windows looked up by slug: the current one plus the next few.
const SLUG_WINDOWS: i64 = 3;

/// Polymarket REST client.
#[derive(Debug, Clone)]
pub struct PolymarketClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL for the Gamma API.
    gamma_url: String,
    /// Base URL for the CLOB API.
    clob_url: String,
    /// Signing wallet.
    wallet: Wallet,
    /// Chain ID (137 for Polygon).
    chain_id: u64,
    /// Log orders instead of sending them.
    dry_run: bool,
}

impl PolymarketClient {
    /// Create a new client from config. Fails on an unusable key or network.
    pub fn new(config: &Config) -> Result<Self, BotError> {
        let chain_id = config
            .network()
            .map_err(BotError::InvalidConfig)?
            .chain_id();
        let wallet = Wallet::from_private_key(&config.private_key, chain_id)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(Duration::from_secs(2))
            .tcp_keepalive(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("bracket-bot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            gamma_url: config.gamma_url.trim_end_matches('/').to_string(),
            clob_url: config.clob_url.trim_end_matches('/').to_string(),
            wallet,
            chain_id,
            dry_run: config.dry_run,
        })
    }

    /// Get the HTTP client reference.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Signing wallet.
    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Wallet address.
    pub fn get_address(&self) -> &str {
        self.wallet.address()
    }

    /// Get the CLOB base URL.
    pub fn clob_url(&self) -> &str {
        &self.clob_url
    }

    /// Get the Gamma base URL.
    pub fn gamma_url(&self) -> &str {
        &self.gamma_url
    }

    /// Get the chain ID.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Whether orders are only simulated.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        resource: &str,
    ) -> Result<T, MarketError> {
        let start = Instant::now();
        let response = self.http.get(url).query(query).send().await?;
        metrics::record_http_latency(start, resource);

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketError::NotFound {
                id: resource.to_string(),
            });
        }

        if !response.status().is_success() {
            return Err(MarketError::FetchFailed {
                resource: resource.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        response
            .json()
            .await
            .map_err(|e| MarketError::ParseError(format!("{}: {}", resource, e)))
    }

    async fn list_markets(&self, params: &[(&str, String)]) -> Result<Vec<Market>, MarketError> {
        let url = format!("{}/markets", self.gamma_url);
        let payload: Vec<GammaMarket> = self.get_json(&url, params, "markets").await?;
        Ok(payload
            .into_iter()
            .filter_map(GammaMarket::into_market)
            .collect())
    }

    /// Look up the current and upcoming windows of a recurring series by slug.
    #[instrument(skip(self))]
    async fn try_computed_slugs(&self, prefix: &str, window: i64) -> Vec<Market> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let mut found = Vec::new();

        for slug in window_slugs(prefix, window, now) {
            debug!(slug = %slug, "Checking computed slug");
            match self.list_markets(&[("slug", slug.clone())]).await {
                Ok(markets) => found.extend(markets.into_iter().filter(|m| m.active && !m.resolved)),
                Err(e) => debug!(slug = %slug, error = %e, "Slug lookup failed"),
            }
        }

        found
    }

    /// Open markets whose slug contains `prefix`.
    async fn try_slug_contains(&self, prefix: &str, limit: u32) -> Result<Vec<Market>, MarketError> {
        self.list_markets(&[
            ("slug_contains", prefix.to_string()),
            ("active", "true".to_string()),
            ("closed", "false".to_string()),
            ("limit", limit.to_string()),
        ])
        .await
    }

    /// One page of open markets.
    async fn try_listing(&self, limit: u32) -> Result<Vec<Market>, MarketError> {
        self.list_markets(&[
            ("active", "true".to_string()),
            ("closed", "false".to_string()),
            ("limit", GAMMA_PAGE_SIZE.max(limit).to_string()),
        ])
        .await
    }
}

/// Slug prefix of the recurring up/down series a query like "ETH 15m" names.
pub fn recurring_slug_prefix(query: &str) -> Option<String> {
    let mut terms = query.split_whitespace();
    let asset = terms.next()?;
    let duration = terms.next()?;
    window_secs(duration)?;
    Some(format!(
        "{}-updown-{}",
        asset.to_lowercase(),
        duration.to_lowercase()
    ))
}

/// Window length in seconds for a duration tag such as "15m" or "1h".
pub fn window_secs(duration: &str) -> Option<i64> {
    let unit = duration.chars().last()?;
    let count: i64 = duration[..duration.len() - unit.len_utf8()]
        .parse()
        .ok()
        .filter(|n| *n > 0)?;
    match unit.to_ascii_lowercase() {
        'm' => Some(count * 60),
        'h' => Some(count * 3600),
        _ => None,
    }
}

/// Slugs of the window containing `now` and the ones after it.
pub fn window_slugs(prefix: &str, window: i64, now: i64) -> Vec<String> {
    let start = (now / window) * window;
    (0..SLUG_WINDOWS)
        .map(|i| format!("{}-{}", prefix, start + i * window))
        .collect()
}

/// Whether every whitespace-separated term of `query` appears in the market's text.
pub fn matches_query(market: &Market, query: &str) -> bool {
    let haystack = [
        market.slug.as_deref(),
        market.question.as_deref(),
        market.underlying.as_deref(),
        market.duration.as_deref(),
    ]
    .iter()
    .flatten()
    .map(|s| s.to_lowercase())
    .collect::<Vec<_>>()
    .join(" ");

    query
        .split_whitespace()
        .all(|term| haystack.contains(&term.to_lowercase()))
}

#[async_trait]
impl MarketApi for PolymarketClient {
    /// Recurring series are found by computed slug, then by slug substring,
    /// then by filtering a page of open markets. The first strategy with a
    /// match wins.
    #[instrument(skip(self))]
    async fn search_markets(&self, query: &str, limit: u32) -> Result<Vec<Market>, MarketError> {
        let matching = |markets: Vec<Market>| -> Vec<Market> {
            markets
                .into_iter()
                .filter(|m| matches_query(m, query))
                .take(limit as usize)
                .collect()
        };

        let series = recurring_slug_prefix(query)
            .zip(query.split_whitespace().nth(1).and_then(window_secs));

        if let Some((prefix, window)) = series {
            let markets = matching(self.try_computed_slugs(&prefix, window).await);
            if !markets.is_empty() {
                debug!(matched = markets.len(), "Found markets via computed slug");
                return Ok(markets);
            }

            match self.try_slug_contains(&prefix, limit).await {
                Ok(markets) => {
                    let markets = matching(markets);
                    if !markets.is_empty() {
                        debug!(matched = markets.len(), "Found markets via slug search");
                        return Ok(markets);
                    }
                }
                Err(e) => debug!(error = %e, "Slug search failed"),
            }
        }

        let listing = self.try_listing(limit).await?;
        let total = listing.len();
        let markets = matching(listing);

        debug!(total, matched = markets.len(), "Found markets via listing");
        Ok(markets)
    }

    #[instrument(skip(self))]
    async fn get_market(&self, market_id: &str) -> Result<Market, MarketError> {
        let url = format!("{}/markets/{}", self.gamma_url, market_id);
        let payload: GammaMarket = self.get_json(&url, &[], market_id).await?;

        payload.into_market().ok_or_else(|| MarketError::NotFound {
            id: market_id.to_string(),
        })
    }

    #[instrument(skip(self))]
    async fn get_order_book(&self, token_id: &str) -> Result<OrderBook, MarketError> {
        let url = format!("{}/book", self.clob_url);
        let params = [("token_id", token_id.to_string())];

        let response: OrderBookResponse = self.get_json(&url, &params, token_id).await?;
        Ok(response.into_book(token_id))
    }

    async fn create_limit_order(&self, order: &LimitOrder) -> Result<String, TradingError> {
        if self.dry_run {
            order.validate().map_err(TradingError::InvalidParams)?;
            let order_id = simulated_order_id(order.side);
            info!(
                order_id = %order_id,
                token_id = %order.token_id,
                side = %order.side,
                price = %order.price,
                size = %order.size,
                "DRY RUN - order not sent"
            );
            return Ok(order_id);
        }

        let start = Instant::now();
        let result = submit_limit_order(self, order).await;
        metrics::record_http_latency(start, "order");
        result
    }

    async fn get_order_status(&self, order_id: &str) -> Result<OrderState, TradingError> {
        // Simulated orders rest on the book forever
        if is_simulated_order_id(order_id) {
            return Ok(OrderState {
                order_id: order_id.to_string(),
                status: Some(OrderStatus::Live),
                ..Default::default()
            });
        }

        fetch_order_state(self, order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn client_creation_works() {
        let config = Config {
            clob_url: "https://clob.polymarket.com/".to_string(),
            ..Config::for_tests()
        };
        let client = PolymarketClient::new(&config).unwrap();
        assert_eq!(client.chain_id(), 137);
        assert_eq!(client.clob_url(), "https://clob.polymarket.com");
        assert!(client.get_address().starts_with("0x"));
    }

    #[test]
    fn client_rejects_bad_key() {
        let config = Config {
            private_key: "0x1234".to_string(),
            ..Config::for_tests()
        };
        assert_err!(PolymarketClient::new(&config));
    }

    #[test]
    fn query_matching_uses_all_terms() {
        let market = Market {
            id: "1".to_string(),
            slug: Some("eth-updown-15m-1765301400".to_string()),
            question: Some("Ethereum Up or Down".to_string()),
            ..Default::default()
        };
        assert!(matches_query(&market, "ETH 15m"));
        assert!(!matches_query(&market, "BTC 15m"));
        assert!(!matches_query(&market, "ETH 1h"));
    }

    #[test]
    fn recurring_series_slugs() {
        assert_eq!(recurring_slug_prefix("ETH 15m").as_deref(), Some("eth-updown-15m"));
        assert_eq!(recurring_slug_prefix("btc 1h").as_deref(), Some("btc-updown-1h"));
        assert_eq!(recurring_slug_prefix("ETH"), None);
        assert_eq!(recurring_slug_prefix("ETH weekly"), None);

        assert_eq!(window_secs("15m"), Some(900));
        assert_eq!(window_secs("1H"), Some(3600));
        assert_eq!(window_secs("0m"), None);
        assert_eq!(window_secs(""), None);
    }

    #[test]
    fn window_slugs_start_at_current_window() {
        assert_eq!(
            window_slugs("btc-updown-15m", 900, 1765301400 + 421),
            vec![
                "btc-updown-15m-1765301400",
                "btc-updown-15m-1765302300",
                "btc-updown-15m-1765303200",
            ]
        );
    }

    #[tokio::test]
    async fn dry_run_orders_never_leave_the_process() {
        let client = PolymarketClient::new(&Config::for_tests()).unwrap();
        assert!(client.is_dry_run());

        let order = LimitOrder::buy("token-yes", dec!(0.80), dec!(10), 300);
        let order_id = assert_ok!(client.create_limit_order(&order).await);
        assert!(is_simulated_order_id(&order_id));

        let state = client.get_order_status(&order_id).await.unwrap();
        assert_eq!(state.status, Some(OrderStatus::Live));
    }

    #[tokio::test]
    async fn dry_run_still_validates_orders() {
        let client = PolymarketClient::new(&Config::for_tests()).unwrap();
        let order = LimitOrder::buy("", dec!(0.80), dec!(10), 300);
        assert_err!(client.create_limit_order(&order).await);
    }
}
