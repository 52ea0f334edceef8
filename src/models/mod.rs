use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// OHLCV candlestick as delivered by the exchange
///
/// Sequences are ordered oldest to newest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub vwap: f64,
    pub volume: f64,
    pub trade_count: u64,
}

/// Last trade price plus 24 hour extremes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Ticker {
    pub last: f64,
    pub high_24h: f64,
    pub low_24h: f64,
}

/// One side of the book: `(price, size)` pairs, best price first
pub type BookSide = Vec<(f64, f64)>;

/// Order-book depth snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderBook {
    pub bids: BookSide,
    pub asks: BookSide,
}

impl OrderBook {
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|&(price, _)| price)
    }

    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|&(price, _)| price)
    }

    pub fn bid_depth(&self) -> f64 {
        self.bids.iter().map(|&(_, size)| size).sum()
    }

    pub fn ask_depth(&self) -> f64 {
        self.asks.iter().map(|&(_, size)| size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// Free balance per asset symbol
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Balance(pub HashMap<String, f64>);

impl Balance {
    /// Free balance for an asset, zero when the asset is absent
    pub fn free(&self, asset: &str) -> f64 {
        self.0.get(asset).copied().unwrap_or(0.0)
    }
}

impl FromIterator<(String, f64)> for Balance {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Market inputs for one decision cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshot {
    /// Primary timeframe candles, oldest first
    pub primary: Vec<Candle>,
    /// Slower trend timeframe candles, oldest first
    pub trend: Vec<Candle>,
    pub order_book: OrderBook,
    pub ticker: Ticker,
}

impl MarketSnapshot {
    /// Close of the newest primary candle
    pub fn last_close(&self) -> Option<f64> {
        self.primary.last().map(|c| c.close)
    }
}

/// Direction of a decision signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    /// Classify a decision signal against symmetric-or-not buy/sell thresholds
    pub fn from_signal(value: f64, buy_threshold: f64, sell_threshold: f64) -> Self {
        if value > buy_threshold {
            Direction::Bullish
        } else if value < sell_threshold {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OrderKind {
    Market,
    Limit { limit_price: f64 },
}

/// Order the core asks the exchange client to place
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderIntent {
    pub pair: String,
    pub side: OrderSide,
    pub volume: f64,
    pub kind: OrderKind,
}

impl OrderIntent {
    pub fn market(pair: &str, side: OrderSide, volume: f64) -> Self {
        Self {
            pair: pair.to_string(),
            side,
            volume,
            kind: OrderKind::Market,
        }
    }

    pub fn limit(pair: &str, side: OrderSide, volume: f64, limit_price: f64) -> Self {
        Self {
            pair: pair.to_string(),
            side,
            volume,
            kind: OrderKind::Limit { limit_price },
        }
    }
}

/// Success token returned by the exchange client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderConfirmation {
    pub txid: String,
    /// Execution price when the client reports one
    #[serde(default)]
    pub fill_price: Option<f64>,
}

impl OrderConfirmation {
    pub fn new(txid: impl Into<String>) -> Self {
        Self {
            txid: txid.into(),
            fill_price: None,
        }
    }

    pub fn filled_at(mut self, price: f64) -> Self {
        self.fill_price = Some(price);
        self
    }
}

impl OrderIntent {
    /// Limit price, or `market_price` for market orders
    pub fn effective_price(&self, market_price: f64) -> f64 {
        match self.kind {
            OrderKind::Market => market_price,
            OrderKind::Limit { limit_price } => limit_price,
        }
    }
}
