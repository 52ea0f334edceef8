/// Candlestick geometry and pattern scoring
///
/// Single-candle patterns (Marubozu, Hammer, Shooting Star, body colour)
/// and two-candle patterns (Engulfing, Piercing Line, Dark Cloud Cover)
/// add to a raw score that is clamped to -1 / 0 / +1.

use crate::models::Candle;

/// Body dominance above which a candle is a Marubozu
const MARUBOZU_BODY_RATIO: f64 = 0.8;
/// Maximum body share of range for hammer-type candles
const SMALL_BODY_RATIO: f64 = 0.3;
/// Body dominance that gives a trend candle conviction
const TREND_BODY_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleShape {
    pub open: f64,
    pub close: f64,
    pub body: f64,
    pub range: f64,
    pub upper_wick: f64,
    pub lower_wick: f64,
}

impl CandleShape {
    pub fn of(candle: &Candle) -> Self {
        Self {
            open: candle.open,
            close: candle.close,
            body: (candle.close - candle.open).abs(),
            range: candle.high - candle.low,
            upper_wick: candle.high - candle.open.max(candle.close),
            lower_wick: candle.open.min(candle.close) - candle.low,
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Body as a share of the full range, zero for a flat candle
    pub fn body_ratio(&self) -> f64 {
        if self.range > 0.0 {
            self.body / self.range
        } else {
            0.0
        }
    }

    pub fn midpoint(&self) -> f64 {
        (self.open + self.close) / 2.0
    }
}

/// Score the latest candle(s): +1 strong buy, -1 strong sell, 0 neutral
///
/// Returns None for an empty sequence.
pub fn candle_pattern_score(candles: &[Candle]) -> Option<i8> {
    let current = CandleShape::of(candles.last()?);
    let mut score = 0.0;

    // Marubozu
    if current.body_ratio() > MARUBOZU_BODY_RATIO {
        score += if current.is_bullish() { 1.0 } else { -1.0 };
    }

    // Hammer / Shooting Star
    let small_body = current.body < SMALL_BODY_RATIO * current.range;
    if current.upper_wick > 0.0 && current.lower_wick > 2.0 * current.upper_wick && small_body {
        score += 1.0;
    } else if current.lower_wick > 0.0
        && current.upper_wick > 2.0 * current.lower_wick
        && small_body
    {
        score -= 1.0;
    }

    // Body colour
    if current.is_bullish() {
        score += 0.5;
    } else if current.is_bearish() {
        score -= 0.5;
    }

    if candles.len() >= 2 {
        let previous = CandleShape::of(&candles[candles.len() - 2]);
        score += two_candle_score(&previous, &current);
    }

    Some(if score >= 1.0 {
        1
    } else if score <= -1.0 {
        -1
    } else {
        0
    })
}

fn two_candle_score(previous: &CandleShape, current: &CandleShape) -> f64 {
    // Engulfing
    if previous.is_bearish()
        && current.is_bullish()
        && current.close > previous.open
        && current.open < previous.close
    {
        return 1.5;
    }
    if previous.is_bullish()
        && current.is_bearish()
        && current.close < previous.open
        && current.open > previous.close
    {
        return -1.5;
    }

    // Piercing Line / Dark Cloud Cover
    if previous.is_bearish() && current.is_bullish() {
        if current.close > previous.midpoint() && current.open < previous.close {
            return 1.0;
        }
    } else if previous.is_bullish()
        && current.is_bearish()
        && current.close < previous.midpoint()
        && current.open > previous.close
    {
        return -1.0;
    }

    0.0
}

/// Direction of a single candle with body dominance above 50% of its range
///
/// +1 for a dominant bullish body, -1 for a dominant bearish body, else 0.
pub fn body_direction(candle: &Candle) -> i8 {
    let shape = CandleShape::of(candle);

    if shape.body_ratio() > TREND_BODY_RATIO {
        if shape.is_bullish() {
            return 1;
        }
        if shape.is_bearish() {
            return -1;
        }
    }

    0
}
