//! Unified error types for the bracket bot.

use thiserror::Error;

/// Unified error type for the bracket bot.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Market-related error.
    #[error("market error: {0}")]
    Market(#[from] MarketError),

    /// Trading/order error.
    #[error("trading error: {0}")]
    Trading(#[from] TradingError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Metrics recorder could not be installed.
    #[error("metrics error: {0}")]
    Metrics(String),
}

/// Market search and market-data errors.
#[derive(Error, Debug)]
pub enum MarketError {
    /// Failed to fetch a resource from the market-data API.
    #[error("failed to fetch {resource}: {reason}")]
    FetchFailed {
        /// What was being fetched (market id, token id, search query).
        resource: String,
        /// Reason for failure.
        reason: String,
    },

    /// Market does not exist.
    #[error("market {id} not found")]
    NotFound {
        /// The market id.
        id: String,
    },

    /// Failed to parse market data.
    #[error("failed to parse market data: {0}")]
    ParseError(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Trading and order execution errors.
#[derive(Error, Debug)]
pub enum TradingError {
    /// Order submission failed.
    #[error("order submission failed: {0}")]
    SubmissionFailed(String),

    /// The exchange accepted the request but returned no order id.
    #[error("order rejected: {reason}")]
    OrderRejected {
        /// Rejection reason from the exchange.
        reason: String,
    },

    /// Failed to get order status.
    #[error("failed to get order status for {order_id}: {reason}")]
    StatusFailed {
        /// Order ID.
        order_id: String,
        /// Reason for failure.
        reason: String,
    },

    /// Invalid order parameters.
    #[error("invalid order parameters: {0}")]
    InvalidParams(String),

    /// The exchange returned an order id that already backs a position.
    #[error("order id {order_id} is already tracked")]
    DuplicateOrderId {
        /// Order ID.
        order_id: String,
    },

    /// Signing error.
    #[error("signing error: {0}")]
    SigningError(String),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;
