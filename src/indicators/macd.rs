use serde::{Deserialize, Serialize};

use super::moving_average::calculate_ema_series;

/// MACD triple at the latest index
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Macd {
    /// fast EMA - slow EMA
    pub macd: f64,
    /// EMA of the MACD line
    pub signal: f64,
    /// macd - signal
    pub histogram: f64,
}

/// Calculate MACD over the entire price series
///
/// Both EMAs are computed recursively over all available prices (seeded
/// with the first price), the signal line is an EMA of the MACD line, and
/// the histogram is taken at the latest index only.
///
/// Returns None until `slow + signal` prices are available.
pub fn calculate_macd(
    prices: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> Option<Macd> {
    if fast_period == 0 || slow_period == 0 || signal_period == 0 {
        return None;
    }
    if prices.len() < slow_period + signal_period {
        return None;
    }

    let fast = calculate_ema_series(prices, fast_period);
    let slow = calculate_ema_series(prices, slow_period);

    let macd_line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal_line = calculate_ema_series(&macd_line, signal_period);

    let macd = *macd_line.last()?;
    let signal = *signal_line.last()?;

    Some(Macd {
        macd,
        signal,
        histogram: macd - signal,
    })
}
