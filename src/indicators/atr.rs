/// Average True Range (ATR) indicator
///
/// Measures market volatility by averaging true ranges over a period.
/// True Range is the greatest of:
/// - Current High - Current Low
/// - Abs(Current High - Previous Close)
/// - Abs(Current Low - Previous Close)
///
/// The average is a plain mean of the last `period` true ranges, not
/// Wilder's recursive smoothing. Stop distances downstream depend on
/// this exact value.

use crate::models::Candle;

/// True range for every candle after the first
pub fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .windows(2)
        .map(|pair| {
            let high = pair[1].high;
            let low = pair[1].low;
            let prev_close = pair[0].close;

            (high - low)
                .max((high - prev_close).abs())
                .max((low - prev_close).abs())
        })
        .collect()
}

/// Calculate ATR for the given candles
///
/// Returns the current ATR value, or None if insufficient data
pub fn calculate_atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    let ranges = true_ranges(candles);
    let sum: f64 = ranges.iter().rev().take(period).sum();

    Some(sum / period as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_candles::candles_from_ohlc;

    #[test]
    fn test_calculate_atr_flat_market() {
        let prices = vec![(100.0, 101.0, 99.0, 100.0); 15];
        let candles = candles_from_ohlc(&prices);

        let atr = calculate_atr(&candles, 14).unwrap();
        assert!((atr - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_calculate_atr_uses_gaps() {
        // Gap up: high - prev_close dominates
        let prices = vec![(100.0, 101.0, 99.0, 100.0), (110.0, 112.0, 109.0, 111.0)];
        let candles = candles_from_ohlc(&prices);

        assert_eq!(calculate_atr(&candles, 1), Some(12.0));
    }

    #[test]
    fn test_calculate_atr_is_plain_mean_of_latest_ranges() {
        let prices = vec![
            (100.0, 110.0, 90.0, 100.0), // ignored (first candle)
            (100.0, 130.0, 70.0, 100.0), // TR 60, outside window
            (100.0, 101.0, 99.0, 100.0), // TR 2
            (100.0, 104.0, 96.0, 100.0), // TR 8
        ];
        let candles = candles_from_ohlc(&prices);

        assert_eq!(calculate_atr(&candles, 2), Some(5.0));
    }

    #[test]
    fn test_insufficient_data() {
        let prices = vec![(100.0, 101.0, 99.0, 100.0); 14];
        let candles = candles_from_ohlc(&prices);

        assert!(calculate_atr(&candles, 14).is_none());
        assert!(calculate_atr(&candles, 0).is_none());
    }

    #[test]
    fn test_true_ranges_length() {
        let prices = vec![(100.0, 105.0, 95.0, 100.0); 15];
        let candles = candles_from_ohlc(&prices);

        assert_eq!(true_ranges(&candles).len(), 14);
        assert!(true_ranges(&candles[..1]).is_empty());
    }
}
