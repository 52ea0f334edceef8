use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::SignalConfig;
use crate::indicators::{
    body_direction, candle_pattern_score, check_near_support_resistance, CandleShape,
    IndicatorSnapshot, MarketRegime, VolumeSignal,
};
use crate::models::{Candle, MarketSnapshot, OrderBook, Ticker};

/// Name of each scored signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SignalName {
    /// Candlestick patterns
    Cnd,
    /// Trend-timeframe body direction
    HrTrend,
    Rsi,
    /// MACD histogram sign
    Macd,
    /// Support / resistance proximity
    Sr,
    /// Top-of-book spread
    Odb,
    /// Volume spike aligned with candle colour
    Vol,
    /// Bid vs ask depth
    Dpm,
    /// Proximity to 24h high / low
    Hl,
    SmaPos,
    Regime,
}

impl SignalName {
    pub const ALL: [SignalName; 11] = [
        SignalName::Cnd,
        SignalName::HrTrend,
        SignalName::Rsi,
        SignalName::Macd,
        SignalName::Sr,
        SignalName::Odb,
        SignalName::Vol,
        SignalName::Dpm,
        SignalName::Hl,
        SignalName::SmaPos,
        SignalName::Regime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalName::Cnd => "CND",
            SignalName::HrTrend => "HR_TREND",
            SignalName::Rsi => "RSI",
            SignalName::Macd => "MACD",
            SignalName::Sr => "SR",
            SignalName::Odb => "ODB",
            SignalName::Vol => "VOL",
            SignalName::Dpm => "DPM",
            SignalName::Hl => "HL",
            SignalName::SmaPos => "SMA_POS",
            SignalName::Regime => "REGIME",
        }
    }
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score per signal for one cycle; None is a non-vote
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SignalVector {
    pub cnd: Option<f64>,
    pub hr_trend: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub sr: Option<f64>,
    pub odb: Option<f64>,
    pub vol: Option<f64>,
    pub dpm: Option<f64>,
    pub hl: Option<f64>,
    pub sma_pos: Option<f64>,
    pub regime: Option<f64>,
}

impl SignalVector {
    pub fn get(&self, name: SignalName) -> Option<f64> {
        match name {
            SignalName::Cnd => self.cnd,
            SignalName::HrTrend => self.hr_trend,
            SignalName::Rsi => self.rsi,
            SignalName::Macd => self.macd,
            SignalName::Sr => self.sr,
            SignalName::Odb => self.odb,
            SignalName::Vol => self.vol,
            SignalName::Dpm => self.dpm,
            SignalName::Hl => self.hl,
            SignalName::SmaPos => self.sma_pos,
            SignalName::Regime => self.regime,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SignalName, Option<f64>)> + '_ {
        SignalName::ALL.into_iter().map(move |name| (name, self.get(name)))
    }

    /// Sum of every defined score not listed in `excluded`
    pub fn decision_signal(&self, excluded: &[SignalName]) -> f64 {
        self.iter()
            .filter(|(name, _)| !excluded.contains(name))
            .filter_map(|(_, score)| score)
            .sum()
    }
}

impl fmt::Display for SignalVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(name, score)| match score {
                Some(v) => format!("{}:{}", name, v),
                None => format!("{}:-", name),
            })
            .collect();
        f.write_str(&parts.join(" | "))
    }
}

/// Maps indicators and market microstructure to a `SignalVector`
#[derive(Debug, Clone)]
pub struct SignalAggregator {
    config: SignalConfig,
}

impl SignalAggregator {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    pub fn evaluate(&self, market: &MarketSnapshot, indicators: &IndicatorSnapshot) -> SignalVector {
        let price = market.last_close();
        let current = market.primary.last();

        SignalVector {
            cnd: candle_pattern_score(&market.primary).map(f64::from),
            hr_trend: market.trend.last().map(|c| f64::from(body_direction(c))),
            rsi: indicators.rsi.map(|rsi| self.score_rsi(rsi)),
            macd: indicators.macd.map(|m| sign(m.histogram)),
            sr: match (&indicators.levels, price) {
                (Some(levels), Some(price)) => Some(f64::from(check_near_support_resistance(
                    price,
                    levels,
                    self.config.sr_proximity,
                ))),
                _ => None,
            },
            odb: self.score_spread(&market.order_book),
            vol: match (indicators.volume, current) {
                (Some(volume), Some(candle)) => Some(score_volume(volume.signal, candle)),
                _ => None,
            },
            dpm: self.score_depth(&market.order_book),
            hl: price.and_then(|p| self.score_range(p, &market.ticker)),
            sma_pos: match (indicators.sma, price) {
                (Some(sma), Some(price)) => Some(sign(price - sma)),
                _ => None,
            },
            regime: indicators.regime.map(|r| match (r.regime, indicators.macd) {
                (MarketRegime::Trending, Some(m)) => 0.5 * sign(m.histogram),
                _ => 0.0,
            }),
        }
    }

    /// Oversold +1, overbought -1, neutral band 0, ±0.5 between
    pub fn score_rsi(&self, rsi: f64) -> f64 {
        let c = &self.config;
        if rsi < c.rsi_oversold {
            1.0
        } else if rsi > c.rsi_overbought {
            -1.0
        } else if rsi < c.rsi_neutral_low {
            0.5
        } else if rsi > c.rsi_neutral_high {
            -0.5
        } else {
            0.0
        }
    }

    /// Tight spread +1, crossed/locked 0, wide -1; None for a one-sided book
    pub fn score_spread(&self, book: &OrderBook) -> Option<f64> {
        let bid = book.best_bid()?;
        let ask = book.best_ask()?;

        if ask == bid {
            return Some(0.0);
        }
        if ask > bid && bid > 0.0 && (ask - bid) / bid < self.config.max_spread {
            Some(1.0)
        } else {
            Some(-1.0)
        }
    }

    /// Heavier bids +1, heavier asks -1; None for an empty book
    pub fn score_depth(&self, book: &OrderBook) -> Option<f64> {
        if book.is_empty() {
            return None;
        }

        let bid_depth = book.bid_depth();
        let ask_depth = book.ask_depth();
        let ratio = self.config.depth_ratio;

        if bid_depth > ask_depth * ratio {
            Some(1.0)
        } else if ask_depth > bid_depth * ratio {
            Some(-1.0)
        } else {
            Some(0.0)
        }
    }

    /// Near the 24h high -1, near the 24h low +1
    pub fn score_range(&self, price: f64, ticker: &Ticker) -> Option<f64> {
        if ticker.high_24h <= 0.0 || ticker.low_24h <= 0.0 {
            return None;
        }

        let proximity = self.config.range_proximity;
        if price >= ticker.high_24h * (1.0 - proximity) {
            Some(-1.0)
        } else if price <= ticker.low_24h * (1.0 + proximity) {
            Some(1.0)
        } else {
            Some(0.0)
        }
    }
}

fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn score_volume(signal: VolumeSignal, candle: &Candle) -> f64 {
    if signal != VolumeSignal::Spike {
        return 0.0;
    }

    let shape = CandleShape::of(candle);
    if shape.is_bullish() {
        1.0
    } else if shape.is_bearish() {
        -1.0
    } else {
        0.0
    }
}
