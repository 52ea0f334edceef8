use serde::{Deserialize, Serialize};

use crate::indicators::{body_direction, calculate_sma, closes, CandleShape};
use crate::models::{Candle, Direction};

/// Primary candles inspected for divergence
const DIVERGENCE_WINDOW: usize = 5;
/// Primary candles that must oppose the trend candle
const DIVERGENCE_MIN_COUNT: usize = 4;
/// Trend candles used for strength
const STRENGTH_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Divergence {
    /// Trend candle bearish while the primary timeframe rallies
    Bullish,
    /// Trend candle bullish while the primary timeframe sells off
    Bearish,
}

/// Confirms primary-timeframe decisions against a slower timeframe
#[derive(Debug, Clone)]
pub struct TimeframeValidator {
    sma_period: usize,
}

impl TimeframeValidator {
    pub fn new(sma_period: usize) -> Self {
        Self { sma_period }
    }

    /// Whether the trend timeframe supports trading in `direction`
    ///
    /// The latest trend candle must not have a dominant opposing body and
    /// its close must sit on the right side of the trend SMA. The SMA check
    /// is skipped when the series is too short for it. Neutral never validates.
    pub fn validate(&self, direction: Direction, trend: &[Candle]) -> bool {
        if trend.len() < 2 {
            return false;
        }
        let Some(current) = trend.last() else {
            return false;
        };

        let trend_direction = body_direction(current);
        let period = self.sma_period.min(trend.len());
        let sma = calculate_sma(&closes(trend), period);

        let aligned = match direction {
            Direction::Bullish => {
                trend_direction >= 0 && sma.map_or(true, |sma| current.close >= sma)
            }
            Direction::Bearish => {
                trend_direction <= 0 && sma.map_or(true, |sma| current.close <= sma)
            }
            Direction::Neutral => false,
        };

        tracing::debug!(
            "Trend validation: direction={:?}, trend_body={}, sma={:?}, aligned={}",
            direction,
            trend_direction,
            sma,
            aligned
        );

        aligned
    }

    /// Flag ≥4 of the last 5 primary candles moving against the trend candle
    pub fn check_divergence(&self, primary: &[Candle], trend: &[Candle]) -> Option<Divergence> {
        if primary.len() < DIVERGENCE_WINDOW || trend.len() < 2 {
            return None;
        }

        let trend_candle = CandleShape::of(trend.last()?);
        let recent: Vec<CandleShape> = primary[primary.len() - DIVERGENCE_WINDOW..]
            .iter()
            .map(CandleShape::of)
            .collect();

        let bullish = recent.iter().filter(|c| c.is_bullish()).count();
        let bearish = recent.iter().filter(|c| c.is_bearish()).count();

        if trend_candle.is_bearish() && bullish >= DIVERGENCE_MIN_COUNT {
            Some(Divergence::Bullish)
        } else if trend_candle.is_bullish() && bearish >= DIVERGENCE_MIN_COUNT {
            Some(Divergence::Bearish)
        } else {
            None
        }
    }

    /// Signed average body ratio of the last 3 trend candles, in [-1, 1]
    pub fn trend_strength(&self, trend: &[Candle]) -> f64 {
        if trend.len() < STRENGTH_WINDOW {
            return 0.0;
        }

        let recent: Vec<CandleShape> = trend[trend.len() - STRENGTH_WINDOW..]
            .iter()
            .map(CandleShape::of)
            .collect();

        let bullish = recent.iter().filter(|c| c.is_bullish()).count();
        let bearish = recent.iter().filter(|c| c.is_bearish()).count();
        let avg_body_ratio =
            recent.iter().map(|c| c.body_ratio()).sum::<f64>() / recent.len() as f64;

        if bullish >= 2 {
            avg_body_ratio
        } else if bearish >= 2 {
            -avg_body_ratio
        } else {
            0.0
        }
    }
}
