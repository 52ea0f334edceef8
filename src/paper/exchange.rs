use std::collections::HashMap;

use serde::Serialize;

use super::market::SyntheticMarket;
use crate::config::PairConfig;
use crate::execution::{ExchangeError, MarketInputs, OrderGateway};
use crate::models::{Balance, OrderConfirmation, OrderIntent, OrderKind, OrderSide};

const DEFAULT_HISTORY: usize = 200;
const DEFAULT_TREND_FACTOR: usize = 3;
const BOOK_LEVELS: usize = 10;
/// Rounding slack when checking balances
const BALANCE_EPSILON: f64 = 1e-9;

/// Executed paper order
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaperFill {
    pub txid: String,
    pub side: OrderSide,
    pub volume: f64,
    pub price: f64,
}

/// In-memory exchange over a synthetic market
///
/// Market orders fill at the last price, limit orders at their limit once
/// marketable. Orders the balance cannot cover are rejected.
pub struct PaperExchange {
    market: SyntheticMarket,
    pair: PairConfig,
    balances: HashMap<String, f64>,
    history: usize,
    trend_factor: usize,
    fills: Vec<PaperFill>,
}

impl PaperExchange {
    pub fn new(market: SyntheticMarket, pair: PairConfig, initial_quote: f64) -> Self {
        let mut balances = HashMap::new();
        balances.insert(pair.quote.clone(), initial_quote);
        balances.insert(pair.asset.clone(), 0.0);

        Self {
            market,
            pair,
            balances,
            history: DEFAULT_HISTORY,
            trend_factor: DEFAULT_TREND_FACTOR,
            fills: Vec::new(),
        }
    }

    /// Number of candles returned per timeframe
    pub fn with_history(mut self, history: usize) -> Self {
        self.history = history;
        self
    }

    /// Primary candles per trend candle
    pub fn with_trend_factor(mut self, trend_factor: usize) -> Self {
        self.trend_factor = trend_factor.max(1);
        self
    }

    pub fn market(&self) -> &SyntheticMarket {
        &self.market
    }

    pub fn fills(&self) -> &[PaperFill] {
        &self.fills
    }

    pub fn balance(&self) -> Balance {
        self.balances
            .iter()
            .map(|(asset, amount)| (asset.clone(), *amount))
            .collect()
    }

    pub fn last_price(&self) -> f64 {
        self.market.last_price()
    }

    /// Mark-to-market value in the quote currency
    pub fn equity(&self) -> f64 {
        self.free(&self.pair.quote) + self.free(&self.pair.asset) * self.last_price()
    }

    /// Move the market forward one primary candle
    pub fn advance(&mut self) {
        self.market.advance();
    }

    /// Everything a trading cycle needs, as the exchange currently sees it
    pub fn market_inputs(&mut self) -> MarketInputs {
        let primary = self.market.recent(self.history);
        let trend = self.market.aggregated(self.trend_factor, self.history);
        let order_book = self.market.order_book(BOOK_LEVELS);

        MarketInputs::new(
            primary,
            trend,
            order_book,
            self.market.ticker(),
            self.balance(),
        )
    }

    fn free(&self, asset: &str) -> f64 {
        self.balances.get(asset).copied().unwrap_or(0.0)
    }

    fn fill_price(&self, intent: &OrderIntent) -> Result<f64, ExchangeError> {
        let last = self.last_price();

        match intent.kind {
            OrderKind::Market => Ok(last),
            OrderKind::Limit { limit_price } => {
                let marketable = match intent.side {
                    OrderSide::Buy => limit_price >= last,
                    OrderSide::Sell => limit_price <= last,
                };
                if marketable {
                    Ok(limit_price)
                } else {
                    Err(ExchangeError::Rejected(format!(
                        "limit {:.2} not marketable at {:.2}",
                        limit_price, last
                    )))
                }
            }
        }
    }
}

impl OrderGateway for PaperExchange {
    fn place_order(&mut self, intent: &OrderIntent) -> Result<OrderConfirmation, ExchangeError> {
        if intent.pair != self.pair.symbol {
            return Err(ExchangeError::Rejected(format!(
                "unknown pair {}",
                intent.pair
            )));
        }
        if intent.volume <= 0.0 || !intent.volume.is_finite() {
            return Err(ExchangeError::Rejected(format!(
                "invalid volume {}",
                intent.volume
            )));
        }

        let price = self.fill_price(intent)?;
        let cost = intent.volume * price;
        let quote_free = self.free(&self.pair.quote);
        let asset_free = self.free(&self.pair.asset);

        let (quote_after, asset_after) = match intent.side {
            OrderSide::Buy => {
                if cost > quote_free + BALANCE_EPSILON {
                    return Err(ExchangeError::Rejected(format!(
                        "insufficient {}: need {:.2}, have {:.2}",
                        self.pair.quote, cost, quote_free
                    )));
                }
                ((quote_free - cost).max(0.0), asset_free + intent.volume)
            }
            OrderSide::Sell => {
                if intent.volume > asset_free + BALANCE_EPSILON {
                    return Err(ExchangeError::Rejected(format!(
                        "insufficient {}: need {:.8}, have {:.8}",
                        self.pair.asset, intent.volume, asset_free
                    )));
                }
                (quote_free + cost, (asset_free - intent.volume).max(0.0))
            }
        };

        self.balances.insert(self.pair.quote.clone(), quote_after);
        self.balances.insert(self.pair.asset.clone(), asset_after);

        let txid = format!("PAPER-{:06}", self.fills.len() + 1);
        tracing::debug!(
            "Paper fill {}: {:?} {:.8} @ {:.2}",
            txid,
            intent.side,
            intent.volume,
            price
        );

        self.fills.push(PaperFill {
            txid: txid.clone(),
            side: intent.side,
            volume: intent.volume,
            price,
        });

        Ok(OrderConfirmation::new(txid).filled_at(price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::MarketScenario;
    use chrono::Utc;

    fn exchange() -> PaperExchange {
        let mut market = SyntheticMarket::new(1, MarketScenario::Sideways, 100.0, 5, Utc::now());
        market.generate(120);
        PaperExchange::new(market, PairConfig::default(), 1000.0)
            .with_history(60)
            .with_trend_factor(3)
    }

    #[test]
    fn test_market_buy_then_sell() {
        let mut exchange = exchange();
        let price = exchange.last_price();

        let confirmation = exchange
            .place_order(&OrderIntent::market("BTCUSDT", OrderSide::Buy, 2.0))
            .unwrap();
        assert_eq!(confirmation.txid, "PAPER-000001");

        let balance = exchange.balance();
        assert!((balance.free("USDT") - (1000.0 - 2.0 * price)).abs() < 1e-9);
        assert_eq!(balance.free("BTC"), 2.0);

        exchange
            .place_order(&OrderIntent::market("BTCUSDT", OrderSide::Sell, 2.0))
            .unwrap();
        assert!((exchange.balance().free("USDT") - 1000.0).abs() < 1e-9);
        assert_eq!(exchange.fills().len(), 2);
    }

    #[test]
    fn test_insufficient_funds_rejected() {
        let mut exchange = exchange();

        let buy = exchange.place_order(&OrderIntent::market("BTCUSDT", OrderSide::Buy, 100.0));
        assert!(matches!(buy, Err(ExchangeError::Rejected(_))));

        let sell = exchange.place_order(&OrderIntent::market("BTCUSDT", OrderSide::Sell, 0.5));
        assert!(matches!(sell, Err(ExchangeError::Rejected(_))));

        assert_eq!(exchange.balance().free("USDT"), 1000.0);
        assert!(exchange.fills().is_empty());
    }

    #[test]
    fn test_limit_fills_only_when_marketable() {
        let mut exchange = exchange();
        let price = exchange.last_price();

        let passive = OrderIntent::limit("BTCUSDT", OrderSide::Buy, 1.0, price * 0.9);
        assert!(exchange.place_order(&passive).is_err());

        let aggressive = OrderIntent::limit("BTCUSDT", OrderSide::Buy, 1.0, price * 1.001);
        exchange.place_order(&aggressive).unwrap();
        assert_eq!(exchange.fills()[0].price, price * 1.001);
    }

    #[test]
    fn test_limit_buy_spending_all_quote_reports_fill() {
        let mut exchange = exchange();
        let limit = exchange.last_price() * 1.001;

        let intent = OrderIntent::limit("BTCUSDT", OrderSide::Buy, 1000.0 / limit, limit);
        let confirmation = exchange.place_order(&intent).unwrap();

        assert_eq!(confirmation.fill_price, Some(limit));
        assert!(exchange.balance().free("USDT") < 1e-6);
    }

    #[test]
    fn test_unknown_pair_rejected() {
        let mut exchange = exchange();
        let result = exchange.place_order(&OrderIntent::market("ETHUSDT", OrderSide::Buy, 1.0));
        assert!(matches!(result, Err(ExchangeError::Rejected(_))));
    }

    #[test]
    fn test_market_inputs_assemble() {
        let mut exchange = exchange();
        exchange.advance();

        let (snapshot, balance) = exchange.market_inputs().assemble().unwrap();
        assert_eq!(snapshot.primary.len(), 60);
        assert_eq!(snapshot.trend.len(), 40);
        assert_eq!(snapshot.last_close(), Some(exchange.last_price()));
        assert_eq!(snapshot.ticker.last, exchange.last_price());
        assert_eq!(balance.free("USDT"), 1000.0);
        assert_eq!(exchange.equity(), 1000.0);
    }
}
