/// Average Directional Index (ADX) - Measures trend strength
///
/// ADX ranges from 0 to 100:
/// - ADX > 25: Strong trend (bull or bear)
/// - ADX < 20: Weak trend / choppy / ranging market
///
/// True range and directional movement are smoothed with the same
/// recursive EMA smoother used by MACD (seed = first value,
/// multiplier = 2 / (period + 1)), and ADX is the smoothed DX series.

use serde::{Deserialize, Serialize};

use super::atr::true_ranges;
use super::moving_average::calculate_ema_series;
use crate::models::Candle;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Adx {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MarketRegime {
    Trending,
    Ranging,
}

/// Regime classification together with the ADX value it came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RegimeReading {
    pub regime: MarketRegime,
    pub adx: f64,
}

/// Calculate ADX, +DI, and -DI for trend strength and direction
///
/// Returns None if insufficient data
pub fn calculate_adx(candles: &[Candle], period: usize) -> Option<Adx> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    // Step 1: True Range and Directional Movement (+DM, -DM)
    let trs = true_ranges(candles);
    let mut plus_dms = Vec::with_capacity(trs.len());
    let mut minus_dms = Vec::with_capacity(trs.len());

    for pair in candles.windows(2) {
        let up_move = pair[1].high - pair[0].high;
        let down_move = pair[0].low - pair[1].low;

        plus_dms.push(if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        });
        minus_dms.push(if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        });
    }

    // Step 2: Smooth
    let smoothed_tr = calculate_ema_series(&trs, period);
    let smoothed_plus = calculate_ema_series(&plus_dms, period);
    let smoothed_minus = calculate_ema_series(&minus_dms, period);

    // Step 3: DI and DX per bar
    let mut dx_series = Vec::with_capacity(smoothed_tr.len());
    let mut last_di = (0.0, 0.0);
    for i in 0..smoothed_tr.len() {
        let (plus_di, minus_di) = if smoothed_tr[i] > 0.0 {
            (
                100.0 * smoothed_plus[i] / smoothed_tr[i],
                100.0 * smoothed_minus[i] / smoothed_tr[i],
            )
        } else {
            (0.0, 0.0)
        };

        let di_sum = plus_di + minus_di;
        let dx = if di_sum > 0.0 {
            100.0 * (plus_di - minus_di).abs() / di_sum
        } else {
            0.0
        };

        dx_series.push(dx);
        last_di = (plus_di, minus_di);
    }

    // Step 4: ADX = smoothed DX
    let adx = *calculate_ema_series(&dx_series, period).last()?;

    Some(Adx {
        adx,
        plus_di: last_di.0,
        minus_di: last_di.1,
    })
}

/// Classify the market as trending when ADX exceeds `threshold`
pub fn detect_market_regime(
    candles: &[Candle],
    period: usize,
    threshold: f64,
) -> Option<RegimeReading> {
    let adx = calculate_adx(candles, period)?;

    let regime = if adx.adx > threshold {
        MarketRegime::Trending
    } else {
        MarketRegime::Ranging
    };

    Some(RegimeReading {
        regime,
        adx: adx.adx,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_candles::candles_from_ohlc;

    fn uptrend() -> Vec<(f64, f64, f64, f64)> {
        (0..30)
            .map(|i| {
                let base = 100.0 + 3.0 * i as f64;
                (base, base + 5.0, base - 1.0, base + 3.0)
            })
            .collect()
    }

    fn choppy() -> Vec<(f64, f64, f64, f64)> {
        (0..30)
            .map(|i| {
                if i % 2 == 0 {
                    (100.0, 102.0, 98.0, 101.0)
                } else {
                    (101.0, 103.0, 97.0, 99.0)
                }
            })
            .collect()
    }

    #[test]
    fn test_adx_strong_uptrend() {
        let candles = candles_from_ohlc(&uptrend());
        let adx = calculate_adx(&candles, 14).unwrap();

        assert!(adx.plus_di > adx.minus_di, "+DI should be > -DI in uptrend");
        assert!(adx.adx > 25.0, "ADX should be high, got {:.2}", adx.adx);
    }

    #[test]
    fn test_adx_choppy_market() {
        let candles = candles_from_ohlc(&choppy());
        let adx = calculate_adx(&candles, 14).unwrap();

        assert!(adx.adx < 25.0, "ADX should be low in chop, got {:.2}", adx.adx);
    }

    #[test]
    fn test_regime_classification() {
        let trending = candles_from_ohlc(&uptrend());
        let ranging = candles_from_ohlc(&choppy());

        assert_eq!(
            detect_market_regime(&trending, 14, 25.0).unwrap().regime,
            MarketRegime::Trending
        );
        assert_eq!(
            detect_market_regime(&ranging, 14, 25.0).unwrap().regime,
            MarketRegime::Ranging
        );
    }

    #[test]
    fn test_adx_insufficient_data() {
        let candles = candles_from_ohlc(&uptrend()[..14]);

        assert!(calculate_adx(&candles, 14).is_none());
        assert!(detect_market_regime(&candles, 14, 25.0).is_none());
    }
}
