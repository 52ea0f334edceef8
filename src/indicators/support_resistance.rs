use serde::{Deserialize, Serialize};

use crate::models::Candle;

/// Number of neighbours on each side a pivot must beat
const PIVOT_WING: usize = 2;

/// Clustered price levels, each list ascending
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SupportResistance {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

/// Detect support and resistance from pivot lows/highs over `lookback` candles
///
/// A low is support when it is strictly lower than the two candles on each
/// side; highs are the mirror for resistance. Both lists are clustered with
/// `cluster_threshold` (fractional distance, e.g. 0.005).
///
/// Returns None when the window cannot hold a single pivot.
pub fn detect_support_resistance(
    candles: &[Candle],
    lookback: usize,
    cluster_threshold: f64,
) -> Option<SupportResistance> {
    let start = candles.len().saturating_sub(lookback);
    let window = &candles[start..];

    if window.len() < 2 * PIVOT_WING + 1 {
        return None;
    }

    let mut support = Vec::new();
    let mut resistance = Vec::new();

    for i in PIVOT_WING..window.len() - PIVOT_WING {
        let neighbours = (i - PIVOT_WING..=i + PIVOT_WING).filter(|&j| j != i);

        let low = window[i].low;
        let high = window[i].high;

        if neighbours.clone().all(|j| low < window[j].low) {
            support.push(low);
        }
        if neighbours.clone().all(|j| high > window[j].high) {
            resistance.push(high);
        }
    }

    Some(SupportResistance {
        support: cluster_levels(&support, cluster_threshold),
        resistance: cluster_levels(&resistance, cluster_threshold),
    })
}

/// Merge levels lying within `threshold` of the running cluster mean
///
/// Levels are sorted first; each output value is the mean of its cluster.
/// Feeding the output back in with the same threshold returns it unchanged.
pub fn cluster_levels(levels: &[f64], threshold: f64) -> Vec<f64> {
    let mut sorted: Vec<f64> = levels.iter().copied().filter(|l| l.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut clustered = Vec::new();
    let mut sum = 0.0;
    let mut count = 0usize;

    for level in sorted {
        if count > 0 {
            let mean = sum / count as f64;
            if (level - mean).abs() <= threshold * mean.abs() {
                sum += level;
                count += 1;
                continue;
            }
            clustered.push(mean);
        }
        sum = level;
        count = 1;
    }

    if count > 0 {
        clustered.push(sum / count as f64);
    }

    clustered
}

/// Score proximity to levels: +1 near support, -1 near resistance, else 0
///
/// Support wins when price is near both.
pub fn check_near_support_resistance(
    price: f64,
    levels: &SupportResistance,
    proximity: f64,
) -> i8 {
    let near = |level: &f64| (price - level).abs() <= proximity * level.abs();

    if levels.support.iter().any(near) {
        1
    } else if levels.resistance.iter().any(near) {
        -1
    } else {
        0
    }
}
