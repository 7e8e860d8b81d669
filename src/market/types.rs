//! Market-related types for short-duration binary markets.

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Market outcome for binary markets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Affirmative resolution (YES / UP token).
    #[strum(to_string = "yes", serialize = "up", serialize = "Yes", serialize = "Up", serialize = "YES", serialize = "UP")]
    #[default]
    Yes,
    /// Negative resolution (NO / DOWN token).
    #[strum(to_string = "no", serialize = "down", serialize = "No", serialize = "Down", serialize = "NO", serialize = "DOWN")]
    No,
}

/// One tradable outcome token of a market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeToken {
    /// CLOB token id.
    pub token_id: String,
    /// Which side of the market this token pays out on.
    pub outcome: Outcome,
    /// Last known price, if the API reported one.
    pub price: Option<Decimal>,
}

/// A binary market as seen by the bot. Read-only.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Market {
    /// Unique market identifier.
    pub id: String,
    /// Market slug (e.g. "eth-updown-15m-1765301400").
    pub slug: Option<String>,
    /// Market question text.
    pub question: Option<String>,
    /// Whether the market accepts orders.
    pub active: bool,
    /// Whether the market has closed or resolved.
    pub resolved: bool,
    /// Duration tag, e.g. "15m".
    pub duration: Option<String>,
    /// Underlying symbol, e.g. "ETH".
    pub underlying: Option<String>,
    /// Traded volume.
    pub volume: Option<Decimal>,
    /// Outcome tokens.
    pub tokens: Vec<OutcomeToken>,
}

impl Market {
    /// The YES (or UP) token.
    pub fn yes_token(&self) -> Option<&OutcomeToken> {
        self.tokens.iter().find(|t| t.outcome == Outcome::Yes)
    }

    /// Human-readable name for logs.
    pub fn title(&self) -> &str {
        self.question
            .as_deref()
            .or(self.slug.as_deref())
            .unwrap_or("unknown market")
    }

    /// Volume, with a missing value counted as zero.
    pub fn volume_or_zero(&self) -> Decimal {
        self.volume.unwrap_or(Decimal::ZERO)
    }
}

/// Slug layout used by recurring crypto markets: `<asset>-updown-<duration>-<start ts>`.
static RECURRING_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z0-9]+)-updown-(\d+[mh])-\d+$").expect("valid regex"));

/// Asset names that show up in question text, mapped to their symbols.
const ASSET_NAMES: &[(&str, &str)] = &[
    ("bitcoin", "BTC"),
    ("ethereum", "ETH"),
    ("solana", "SOL"),
    ("xrp", "XRP"),
];

/// Infer the underlying symbol from a slug or question.
pub fn infer_underlying(slug: Option<&str>, question: Option<&str>) -> Option<String> {
    if let Some(caps) = slug.and_then(|s| RECURRING_SLUG.captures(s)) {
        return Some(caps[1].to_uppercase());
    }

    let question = question?.to_lowercase();
    ASSET_NAMES
        .iter()
        .find(|(name, _)| question.contains(name))
        .map(|(_, symbol)| symbol.to_string())
}

/// Infer the duration tag from a slug.
pub fn infer_duration(slug: Option<&str>) -> Option<String> {
    slug.and_then(|s| RECURRING_SLUG.captures(s))
        .map(|caps| caps[2].to_string())
}

/// Market payload from the Gamma API.
///
/// Gamma encodes several list fields as JSON strings and mixes numeric and
/// string representations; everything here is optional and coerced.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaMarket {
    /// Market ID.
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    /// Market slug.
    pub slug: Option<String>,
    /// Market question.
    pub question: Option<String>,
    /// Whether market is active.
    pub active: Option<bool>,
    /// Whether market is closed.
    pub closed: Option<bool>,
    /// Explicit resolution flag, when present.
    pub resolved: Option<bool>,
    /// Explicit duration tag, when present.
    pub duration: Option<String>,
    /// Explicit underlying symbol, when present.
    pub underlying: Option<String>,
    /// Volume.
    #[serde(default, deserialize_with = "decimal_lenient")]
    pub volume: Option<Decimal>,
    /// Numeric volume.
    #[serde(default, deserialize_with = "decimal_lenient")]
    pub volume_num: Option<Decimal>,
    /// CLOB token IDs.
    #[serde(default, deserialize_with = "string_list")]
    pub clob_token_ids: Option<Vec<String>>,
    /// Outcome labels, aligned with `clob_token_ids`.
    #[serde(default, deserialize_with = "string_list")]
    pub outcomes: Option<Vec<String>>,
    /// Outcome prices, aligned with `clob_token_ids`.
    #[serde(default, deserialize_with = "string_list")]
    pub outcome_prices: Option<Vec<String>>,
    /// Inline token objects (CLOB-style payloads).
    #[serde(default)]
    pub tokens: Option<Vec<TokenPayload>>,
}

/// Inline token object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenPayload {
    /// Token id.
    #[serde(default, alias = "tokenId", alias = "id", deserialize_with = "string_or_number")]
    pub token_id: Option<String>,
    /// Outcome label.
    pub outcome: Option<String>,
    /// Last price.
    #[serde(default, deserialize_with = "decimal_lenient")]
    pub price: Option<Decimal>,
}

impl GammaMarket {
    /// Convert into the domain type. Returns `None` when the payload has no id.
    pub fn into_market(self) -> Option<Market> {
        let id = self.id?;

        let mut tokens: Vec<OutcomeToken> = self
            .tokens
            .unwrap_or_default()
            .into_iter()
            .filter_map(|t| {
                Some(OutcomeToken {
                    token_id: t.token_id?,
                    outcome: Outcome::from_str(t.outcome?.trim()).ok()?,
                    price: t.price,
                })
            })
            .collect();

        if tokens.is_empty() {
            let ids = self.clob_token_ids.unwrap_or_default();
            let labels = self.outcomes.unwrap_or_default();
            let prices = self.outcome_prices.unwrap_or_default();

            tokens = ids
                .into_iter()
                .zip(labels)
                .enumerate()
                .filter_map(|(i, (token_id, label))| {
                    Some(OutcomeToken {
                        token_id,
                        outcome: Outcome::from_str(label.trim()).ok()?,
                        price: prices.get(i).and_then(|p| p.parse().ok()),
                    })
                })
                .collect();
        }

        let underlying = self
            .underlying
            .map(|u| u.to_uppercase())
            .or_else(|| infer_underlying(self.slug.as_deref(), self.question.as_deref()));
        let duration = self
            .duration
            .or_else(|| infer_duration(self.slug.as_deref()));

        Some(Market {
            id,
            active: self.active.unwrap_or(false),
            resolved: self.resolved.unwrap_or(false) || self.closed.unwrap_or(false),
            duration,
            underlying,
            volume: self.volume_num.or(self.volume),
            tokens,
            slug: self.slug,
            question: self.question,
        })
    }
}

/// Accept a JSON string or number as a string.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accept a decimal encoded as a JSON string or number; anything unparseable becomes `None`.
pub fn decimal_lenient<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(value_to_decimal))
}

/// Accept a list either as a JSON array or as a JSON-encoded string of an array.
pub fn string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => serde_json::from_str::<Value>(&s).ok(),
        other => other,
    };

    Ok(match value {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

/// Coerce a JSON value to a decimal.
pub fn value_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => {
            let text = n.to_string();
            text.parse()
                .ok()
                .or_else(|| Decimal::from_scientific(&text).ok())
        }
        _ => None,
    }
}
