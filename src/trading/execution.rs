//! Order submission and status queries against the CLOB REST API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::order::{LimitOrder, OrderState, OrderStatus, Side};
use crate::error::TradingError;
use crate::market::types::value_to_decimal;
use crate::market::PolymarketClient;

/// Order submission request body.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    /// Token ID to trade.
    pub token_id: String,
    /// Order side (BUY/SELL).
    pub side: String,
    /// Limit price.
    pub price: String,
    /// Order size.
    pub size: String,
    /// Fee rate basis points.
    pub fee_rate_bps: String,
    /// Nonce for order uniqueness.
    pub nonce: String,
    /// Expiration timestamp.
    pub expiration: String,
    /// Taker address.
    pub taker: String,
    /// Maker address.
    pub maker: String,
    /// Chain the order is signed for.
    pub chain_id: u64,
    /// Order signature.
    pub signature: String,
    /// Time in force. Orders with an expiration are good-till-date.
    pub order_type: String,
}

/// Order submission result.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResult {
    /// Order ID (various field names).
    #[serde(alias = "orderID", alias = "orderId", alias = "id")]
    pub order_id: Option<String>,
    /// Error message if any.
    #[serde(alias = "errorMsg")]
    pub error: Option<String>,
    /// Success flag.
    pub success: Option<bool>,
}

/// Build and sign the request body for a limit order.
pub async fn build_order_request(
    client: &PolymarketClient,
    order: &LimitOrder,
) -> Result<OrderRequest, TradingError> {
    let wallet = client.wallet();
    let nonce = chrono::Utc::now().timestamp_millis().to_string();
    let expiration = order.expiration.to_string();
    let side = order.side.to_string();

    // Format: token_id:side:price:size:nonce:expiration:chain
    let order_message = format!(
        "{}:{}:{}:{}:{}:{}:{}",
        order.token_id,
        side,
        order.price,
        order.size,
        nonce,
        expiration,
        client.chain_id()
    );

    let signature = wallet.sign_hex(order_message.as_bytes()).await?;

    Ok(OrderRequest {
        token_id: order.token_id.clone(),
        side,
        price: order.price.to_string(),
        size: order.size.to_string(),
        fee_rate_bps: "0".to_string(),
        nonce,
        expiration,
        taker: "0x0000000000000000000000000000000000000000".to_string(),
        maker: wallet.address().to_string(),
        chain_id: client.chain_id(),
        signature,
        order_type: "GTD".to_string(),
    })
}

/// Submit a limit order and return the exchange's order id.
#[instrument(skip(client, order), fields(token = %order.token_id, side = %order.side))]
pub async fn submit_limit_order(
    client: &PolymarketClient,
    order: &LimitOrder,
) -> Result<String, TradingError> {
    order.validate().map_err(TradingError::InvalidParams)?;

    debug!(
        price = %order.price,
        size = %order.size,
        expiration = order.expiration,
        "Submitting limit order"
    );

    let order_request = build_order_request(client, order).await?;
    let auth_headers = client.wallet().auth_headers().await?;

    let url = format!("{}/order", client.clob_url());
    let mut request = client.http().post(&url).json(&order_request);
    for (key, value) in auth_headers {
        request = request.header(&key, &value);
    }

    let response = request.send().await.map_err(|e| {
        TradingError::SubmissionFailed(format!("HTTP request failed: {}", e))
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(TradingError::SubmissionFailed(format!(
            "HTTP {} - {}",
            status, body
        )));
    }

    let json: Value = response.json().await.map_err(|e| {
        TradingError::SubmissionFailed(format!("Failed to parse response: {}", e))
    })?;

    let order_id = order_id_from_response(&json)?;

    info!(
        order_id = %order_id,
        token_id = %order.token_id,
        side = %order.side,
        price = %order.price,
        size = %order.size,
        "Limit order accepted"
    );

    Ok(order_id)
}

/// Interpret a submission response body.
pub fn order_id_from_response(json: &Value) -> Result<String, TradingError> {
    let result: SubmitResult = serde_json::from_value(json.clone()).unwrap_or(SubmitResult {
        order_id: None,
        error: None,
        success: None,
    });

    if let Some(error) = result.error.filter(|e| !e.is_empty()) {
        return Err(TradingError::OrderRejected { reason: error });
    }

    if result.success == Some(false) {
        return Err(TradingError::OrderRejected {
            reason: "exchange reported success=false".to_string(),
        });
    }

    result
        .order_id
        .filter(|id| !id.is_empty())
        .or_else(|| extract_order_id(json))
        .ok_or_else(|| TradingError::OrderRejected {
            reason: "no order id in response".to_string(),
        })
}

/// Get current order status from the API.
#[instrument(skip(client))]
pub async fn fetch_order_state(
    client: &PolymarketClient,
    order_id: &str,
) -> Result<OrderState, TradingError> {
    let url = format!("{}/data/order/{}", client.clob_url(), order_id);
    let auth_headers = client.wallet().auth_headers().await?;

    let mut request = client.http().get(&url);
    for (key, value) in auth_headers {
        request = request.header(&key, &value);
    }

    let response = request.send().await.map_err(|e| TradingError::StatusFailed {
        order_id: order_id.to_string(),
        reason: format!("HTTP request failed: {}", e),
    })?;

    if !response.status().is_success() {
        return Err(TradingError::StatusFailed {
            order_id: order_id.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let json: Value = response.json().await.map_err(|e| TradingError::StatusFailed {
        order_id: order_id.to_string(),
        reason: format!("Failed to parse response: {}", e),
    })?;

    Ok(parse_order_state(order_id, &json))
}

/// Parse an order status payload, tolerating the field names seen across API versions.
pub fn parse_order_state(order_id: &str, json: &Value) -> OrderState {
    let json = json.get("order").unwrap_or(json);

    let status = ["status", "orderStatus", "order_status"]
        .iter()
        .find_map(|key| json.get(*key))
        .and_then(|v| v.as_str())
        .and_then(|s| s.trim().parse::<OrderStatus>().ok());

    OrderState {
        order_id: order_id.to_string(),
        status,
        filled_size: parse_decimal_field(
            json,
            &["size_matched", "sizeMatched", "filled", "filledSize", "filled_size"],
        ),
        original_size: parse_decimal_field(json, &["original_size", "originalSize", "size"]),
    }
}

/// Parse a decimal field from JSON, trying multiple field names.
fn parse_decimal_field(json: &Value, keys: &[&str]) -> Option<Decimal> {
    keys.iter()
        .filter_map(|key| json.get(*key))
        .find_map(value_to_decimal)
}

/// Extract order ID from API response.
pub fn extract_order_id(result: &Value) -> Option<String> {
    for key in ["orderID", "orderId", "order_id", "id"] {
        if let Some(id) = result.get(key).and_then(|v| v.as_str()) {
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }

    for key in ["order", "data", "result"] {
        if let Some(nested) = result.get(key) {
            if let Some(id) = extract_order_id(nested) {
                return Some(id);
            }
        }
    }

    None
}

/// Order id used for orders that were only simulated.
pub fn simulated_order_id(side: Side) -> String {
    format!(
        "dry-{}-{}",
        side.to_string().to_lowercase(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

/// Whether an order id was produced by [`simulated_order_id`].
pub fn is_simulated_order_id(order_id: &str) -> bool {
    order_id.starts_with("dry-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn extract_order_id_various_formats() {
        let json1 = serde_json::json!({"orderID": "abc123"});
        assert_eq!(extract_order_id(&json1), Some("abc123".to_string()));

        let json2 = serde_json::json!({"orderId": "def456"});
        assert_eq!(extract_order_id(&json2), Some("def456".to_string()));

        let json3 = serde_json::json!({"order": {"id": "ghi789"}});
        assert_eq!(extract_order_id(&json3), Some("ghi789".to_string()));

        let json4 = serde_json::json!({"error": "something"});
        assert_eq!(extract_order_id(&json4), None);
    }

    #[test]
    fn submission_response_interpretation() {
        let ok = serde_json::json!({"success": true, "orderID": "0x1"});
        assert_eq!(order_id_from_response(&ok).unwrap(), "0x1");

        let nested = serde_json::json!({"data": {"orderId": "0x2"}});
        assert_eq!(order_id_from_response(&nested).unwrap(), "0x2");

        let rejected = serde_json::json!({"success": false, "errorMsg": "not enough balance"});
        assert!(matches!(
            order_id_from_response(&rejected),
            Err(TradingError::OrderRejected { reason }) if reason == "not enough balance"
        ));

        let empty = serde_json::json!({"success": true, "orderID": ""});
        assert!(order_id_from_response(&empty).is_err());
    }

    #[test]
    fn parse_order_state_reads_status_and_sizes() {
        let json = serde_json::json!({
            "status": "MATCHED",
            "original_size": "100",
            "size_matched": 100
        });
        let state = parse_order_state("o1", &json);
        assert_eq!(state.status, Some(OrderStatus::Matched));
        assert_eq!(state.original_size, Some(dec!(100)));
        assert_eq!(state.filled_size, Some(dec!(100)));
        assert!(state.is_filled());
    }

    #[test]
    fn parse_order_state_nested_and_unknown_status() {
        let json = serde_json::json!({"order": {"orderStatus": "filled"}});
        assert_eq!(parse_order_state("o2", &json).status, Some(OrderStatus::Filled));

        let json = serde_json::json!({"status": "SOMETHING_NEW"});
        let state = parse_order_state("o3", &json);
        assert_eq!(state.status, None);
        assert!(!state.is_filled());
    }

    #[test]
    fn simulated_ids_are_recognizable() {
        let id = simulated_order_id(Side::Buy);
        assert!(id.starts_with("dry-buy-"));
        assert!(is_simulated_order_id(&id));
        assert!(!is_simulated_order_id("0xabc"));
    }
}
