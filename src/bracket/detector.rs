//! Buy-signal detection on the YES token.

use rust_decimal::Decimal;
use strum::{Display, IntoStaticStr};
use tracing::{debug, info, instrument, warn};

use crate::config::TradingConfig;
use crate::market::{Market, MarketApi};
use crate::metrics;

/// Where a quoted ask came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum PriceSource {
    /// Best ask of the live order book.
    OrderBook,
    /// Last traded price carried on the market listing.
    LastPrice,
}

/// Reference price for the YES token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// YES token id.
    pub token_id: String,
    /// Ask, or the last price standing in for it.
    pub ask: Decimal,
    /// Where the ask came from.
    pub source: PriceSource,
}

/// A market whose YES ask is at or below the buy threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuySignal {
    /// Market to trade.
    pub market_id: String,
    /// YES token id.
    pub token_id: String,
    /// Ask that triggered the signal.
    pub ask: Decimal,
    /// Where the ask came from.
    pub source: PriceSource,
}

/// The buy rule: a positive ask at or below the threshold.
pub fn is_buy_signal(ask: Decimal, buy_price: Decimal) -> bool {
    ask > Decimal::ZERO && ask <= buy_price
}

/// Quote the YES token of `market`.
///
/// Uses the order book's best ask. When the book cannot be fetched the market
/// is reloaded for a fresher last price; when the book has no asks, or the
/// reload fails, the listing's last price is used. `None` when the market has
/// no YES token or no usable price.
#[instrument(skip(api, market), fields(market_id = %market.id))]
pub async fn quote_yes<A: MarketApi + ?Sized>(api: &A, market: &Market) -> Option<Quote> {
    let Some(yes) = market.yes_token() else {
        debug!("Market has no YES token");
        return None;
    };

    match api.get_order_book(&yes.token_id).await {
        Ok(book) => {
            if let Some(ask) = book.best_ask() {
                return Some(Quote {
                    token_id: yes.token_id.clone(),
                    ask,
                    source: PriceSource::OrderBook,
                });
            }
            debug!(token_id = %yes.token_id, "Order book has no asks, using last price");
            yes.price.map(|ask| Quote {
                token_id: yes.token_id.clone(),
                ask,
                source: PriceSource::LastPrice,
            })
        }
        Err(e) => {
            warn!(token_id = %yes.token_id, error = %e, "Order book unavailable, using last price");

            let refreshed = match api.get_market(&market.id).await {
                Ok(fresh) => fresh
                    .yes_token()
                    .filter(|t| t.token_id == yes.token_id)
                    .and_then(|t| t.price),
                Err(e) => {
                    debug!(error = %e, "Market reload failed");
                    None
                }
            };

            refreshed.or(yes.price).map(|ask| Quote {
                token_id: yes.token_id.clone(),
                ask,
                source: PriceSource::LastPrice,
            })
        }
    }
}

/// Decide whether to open a bracket in `market`.
pub async fn evaluate<A: MarketApi + ?Sized>(
    api: &A,
    market: &Market,
    config: &TradingConfig,
) -> Option<BuySignal> {
    let quote = quote_yes(api, market).await?;

    if !is_buy_signal(quote.ask, config.buy_price) {
        debug!(
            ask = %quote.ask,
            buy_price = %config.buy_price,
            source = %quote.source,
            "No buy signal"
        );
        return None;
    }

    info!(
        market_id = %market.id,
        ask = %quote.ask,
        buy_price = %config.buy_price,
        source = %quote.source,
        "Buy signal"
    );
    metrics::inc_buy_signals(quote.source.into());

    Some(BuySignal {
        market_id: market.id.clone(),
        token_id: quote.token_id,
        ask: quote.ask,
        source: quote.source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::{Outcome, OutcomeToken};
    use crate::market::{MockMarketApi, MockOrderBookBuilder};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn market(last_price: Option<Decimal>) -> Market {
        Market {
            id: "m1".to_string(),
            active: true,
            tokens: vec![
                OutcomeToken {
                    token_id: "yes-token".to_string(),
                    outcome: Outcome::Yes,
                    price: last_price,
                },
                OutcomeToken {
                    token_id: "no-token".to_string(),
                    outcome: Outcome::No,
                    price: None,
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn buy_rule_boundaries() {
        let threshold = dec!(0.80);
        assert!(is_buy_signal(dec!(0.80), threshold));
        assert!(is_buy_signal(dec!(0.01), threshold));
        assert!(!is_buy_signal(dec!(0.81), threshold));
        assert!(!is_buy_signal(Decimal::ZERO, threshold));
        assert!(!is_buy_signal(dec!(-0.10), threshold));
    }

    #[tokio::test]
    async fn signal_from_order_book() {
        let api = MockMarketApi::new();
        api.set_order_book(
            MockOrderBookBuilder::new("yes-token")
                .with_spread(dec!(0.75), dec!(0.78), dec!(50))
                .build(),
        );

        let signal = evaluate(&api, &market(Some(dec!(0.95))), &TradingConfig::default())
            .await
            .unwrap();
        assert_eq!(
            signal,
            BuySignal {
                market_id: "m1".to_string(),
                token_id: "yes-token".to_string(),
                ask: dec!(0.78),
                source: PriceSource::OrderBook,
            }
        );
    }

    #[tokio::test]
    async fn ask_above_threshold_is_no_signal() {
        let api = MockMarketApi::new();
        api.set_order_book(MockOrderBookBuilder::new("yes-token").ask(dec!(0.85), dec!(10)).build());

        let signal = evaluate(&api, &market(Some(dec!(0.50))), &TradingConfig::default()).await;
        assert_eq!(signal, None);
    }

    #[tokio::test]
    async fn empty_book_falls_back_to_last_price() {
        let api = MockMarketApi::new();
        api.set_order_book(MockOrderBookBuilder::new("yes-token").bid(dec!(0.70), dec!(10)).build());

        let quote = quote_yes(&api, &market(Some(dec!(0.79)))).await.unwrap();
        assert_eq!(quote.ask, dec!(0.79));
        assert_eq!(quote.source, PriceSource::LastPrice);
    }

    #[tokio::test]
    async fn missing_book_uses_refreshed_last_price() {
        let api = MockMarketApi::new();
        api.add_market(market(Some(dec!(0.60))));

        let stale = market(Some(dec!(0.90)));
        let quote = quote_yes(&api, &stale).await.unwrap();
        assert_eq!(quote.ask, dec!(0.60));
        assert_eq!(quote.source, PriceSource::LastPrice);
    }

    #[tokio::test]
    async fn missing_book_and_failed_reload_use_listing_price() {
        let api = MockMarketApi::new();
        api.fail_order_book(true);
        api.fail_get_market(true);

        let signal = evaluate(&api, &market(Some(dec!(0.70))), &TradingConfig::default())
            .await
            .unwrap();
        assert_eq!(signal.ask, dec!(0.70));
        assert_eq!(signal.source, PriceSource::LastPrice);
    }

    #[tokio::test]
    async fn no_price_anywhere_is_no_signal() {
        let api = MockMarketApi::new();
        assert_eq!(quote_yes(&api, &market(None)).await, None);
    }

    #[tokio::test]
    async fn missing_yes_token_is_no_signal() {
        let api = MockMarketApi::new();
        let mut no_only = market(Some(dec!(0.50)));
        no_only.tokens.retain(|t| t.outcome == Outcome::No);

        assert_eq!(
            evaluate(&api, &no_only, &TradingConfig::default()).await,
            None
        );
    }

    #[test]
    fn price_source_labels() {
        let label: &'static str = PriceSource::OrderBook.into();
        assert_eq!(label, "order_book");
        assert_eq!(PriceSource::LastPrice.to_string(), "last_price");
    }
}
