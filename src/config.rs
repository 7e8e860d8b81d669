//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use strum::{Display, EnumString};

use crate::error::BotError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Credentials ===
    /// Wallet private key (hex, starts with 0x).
    #[serde(default)]
    pub private_key: String,

    /// Chain the wallet trades on (`polygon` or `amoy`).
    #[serde(default = "default_network")]
    pub network: String,

    // === Trading Parameters ===
    /// Limit price for the buy leg (0.80 = odds of 80).
    #[serde(default = "default_buy_price")]
    pub buy_price: Decimal,

    /// Limit price for the sell leg.
    #[serde(default = "default_sell_price")]
    pub sell_price: Decimal,

    /// Underlying asset symbol, e.g. ETH or BTC.
    #[serde(default = "default_underlying")]
    pub underlying: String,

    /// Market duration tag.
    #[serde(default = "default_duration")]
    pub duration: String,

    /// Minimum profit rate. Reported at startup, not used by the decision logic.
    #[serde(default = "default_min_profit_rate")]
    pub min_profit_rate: Decimal,

    /// Shares per bracket.
    ///
    /// This sizes each buy order, it does not cap total holdings. Every cycle
    /// with a buy signal opens another bracket of this size.
    #[serde(default = "default_max_position_size")]
    pub max_position_size: Decimal,

    /// Buy order lifetime in seconds.
    #[serde(default = "default_buy_order_ttl")]
    pub buy_order_ttl_secs: i64,

    /// Sell order lifetime in seconds.
    #[serde(default = "default_sell_order_ttl")]
    pub sell_order_ttl_secs: i64,

    // === Loop Timing ===
    /// Sleep after a normal cycle.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Sleep after an empty market search or a failed cycle.
    #[serde(default = "default_error_backoff")]
    pub error_backoff_ms: u64,

    /// Number of markets requested per search.
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,

    // === Endpoints ===
    /// Gamma market-data API base URL.
    #[serde(default = "default_gamma_url")]
    pub gamma_url: String,

    /// CLOB API base URL.
    #[serde(default = "default_clob_url")]
    pub clob_url: String,

    /// Total timeout for a single HTTP request.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_ms: u64,

    // === Operation Modes ===
    /// Simulation mode (orders are logged, never sent).
    #[serde(default)]
    pub dry_run: bool,

    /// HTTP server port for health/status/metrics endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

/// Trading parameters, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingConfig {
    /// Limit price for the buy leg.
    pub buy_price: Decimal,
    /// Limit price for the sell leg.
    pub sell_price: Decimal,
    /// Underlying asset symbol.
    pub underlying: String,
    /// Market duration tag.
    pub duration: String,
    /// Minimum profit rate (informational).
    pub min_profit_rate: Decimal,
    /// Shares per bracket, not a cap on total holdings.
    pub max_position_size: Decimal,
    /// Buy order lifetime in seconds.
    pub buy_order_ttl_secs: i64,
    /// Sell order lifetime in seconds.
    pub sell_order_ttl_secs: i64,
    /// Markets requested per search.
    pub search_limit: u32,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            buy_price: default_buy_price(),
            sell_price: default_sell_price(),
            underlying: default_underlying(),
            duration: default_duration(),
            min_profit_rate: default_min_profit_rate(),
            max_position_size: default_max_position_size(),
            buy_order_ttl_secs: default_buy_order_ttl(),
            sell_order_ttl_secs: default_sell_order_ttl(),
            search_limit: default_search_limit(),
        }
    }
}

impl TradingConfig {
    /// Search query sent to the market-search endpoint, e.g. "ETH 15m".
    pub fn search_query(&self) -> String {
        format!("{} {}", self.underlying, self.duration)
    }

    /// Gross spread captured by one filled bracket, per share.
    pub fn spread(&self) -> Decimal {
        self.sell_price - self.buy_price
    }
}

/// Supported chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Network {
    /// Polygon mainnet.
    Polygon,
    /// Polygon Amoy testnet.
    Amoy,
}

impl Network {
    /// EVM chain id.
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Polygon => 137,
            Network::Amoy => 80002,
        }
    }
}

fn default_network() -> String {
    "polygon".to_string()
}

fn default_buy_price() -> Decimal {
    Decimal::new(80, 2) // 0.80
}

fn default_sell_price() -> Decimal {
    Decimal::new(90, 2) // 0.90
}

fn default_underlying() -> String {
    "ETH".to_string()
}

fn default_duration() -> String {
    "15m".to_string()
}

fn default_min_profit_rate() -> Decimal {
    Decimal::new(10, 2) // 10%
}

fn default_max_position_size() -> Decimal {
    Decimal::new(100, 0)
}

fn default_buy_order_ttl() -> i64 {
    300
}

fn default_sell_order_ttl() -> i64 {
    900
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_error_backoff() -> u64 {
    5000
}

fn default_search_limit() -> u32 {
    50
}

fn default_gamma_url() -> String {
    "https://gamma-api.polymarket.com".to_string()
}

fn default_clob_url() -> String {
    "https://clob.polymarket.com".to_string()
}

fn default_http_timeout() -> u64 {
    5000
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Load and validate in one step. Any failure here is fatal at startup.
    pub fn load_validated() -> Result<Self, BotError> {
        let config = Self::load()?;
        config.validate().map_err(BotError::InvalidConfig)?;
        Ok(config)
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.private_key.is_empty() {
            return Err("PRIVATE_KEY is required".to_string());
        }

        if !self.private_key.starts_with("0x") {
            return Err("PRIVATE_KEY must start with 0x".to_string());
        }

        self.network()?;

        if self.buy_price <= Decimal::ZERO || self.buy_price >= Decimal::ONE {
            return Err("BUY_PRICE must be between 0 and 1".to_string());
        }

        if self.sell_price <= Decimal::ZERO || self.sell_price >= Decimal::ONE {
            return Err("SELL_PRICE must be between 0 and 1".to_string());
        }

        if self.sell_price <= self.buy_price {
            return Err("SELL_PRICE must be greater than BUY_PRICE".to_string());
        }

        if self.max_position_size <= Decimal::ZERO {
            return Err("MAX_POSITION_SIZE must be positive".to_string());
        }

        if self.underlying.trim().is_empty() {
            return Err("UNDERLYING must not be empty".to_string());
        }

        if self.buy_order_ttl_secs <= 0 || self.sell_order_ttl_secs <= 0 {
            return Err("order TTLs must be positive".to_string());
        }

        for (name, value) in [("GAMMA_URL", &self.gamma_url), ("CLOB_URL", &self.clob_url)] {
            url::Url::parse(value).map_err(|e| format!("{} is not a valid URL: {}", name, e))?;
        }

        Ok(())
    }

    /// Parsed network.
    pub fn network(&self) -> Result<Network, String> {
        Network::from_str(&self.network).map_err(|_| format!("unsupported NETWORK: {}", self.network))
    }

    /// Immutable trading parameters.
    pub fn trading(&self) -> TradingConfig {
        TradingConfig {
            buy_price: self.buy_price,
            sell_price: self.sell_price,
            underlying: self.underlying.to_uppercase(),
            duration: self.duration.clone(),
            min_profit_rate: self.min_profit_rate,
            max_position_size: self.max_position_size,
            buy_order_ttl_secs: self.buy_order_ttl_secs,
            sell_order_ttl_secs: self.sell_order_ttl_secs,
            search_limit: self.search_limit,
        }
    }

    /// Sleep after a normal cycle.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Sleep after an empty search or a failed cycle.
    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    /// Base configuration for tests: every default plus a throwaway key.
    #[doc(hidden)]
    pub fn for_tests() -> Self {
        Self {
            private_key: "0x0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef"
                .to_string(),
            network: default_network(),
            buy_price: default_buy_price(),
            sell_price: default_sell_price(),
            underlying: default_underlying(),
            duration: default_duration(),
            min_profit_rate: default_min_profit_rate(),
            max_position_size: default_max_position_size(),
            buy_order_ttl_secs: default_buy_order_ttl(),
            sell_order_ttl_secs: default_sell_order_ttl(),
            poll_interval_ms: default_poll_interval(),
            error_backoff_ms: default_error_backoff(),
            search_limit: default_search_limit(),
            gamma_url: default_gamma_url(),
            clob_url: default_clob_url(),
            http_timeout_ms: default_http_timeout(),
            dry_run: true,
            port: default_port(),
            rust_log: default_log_level(),
        }
    }
}
