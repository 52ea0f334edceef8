/// Calculate Simple Moving Average (SMA) over the last `period` values
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: f64 = prices.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Exponential moving average series over the whole input
///
/// Seeded with the first value, multiplier `2 / (period + 1)`. The output is
/// aligned index-for-index with `values`.
pub fn calculate_ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let Some(&seed) = values.first() else {
        return Vec::new();
    };

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut series = Vec::with_capacity(values.len());
    let mut ema = seed;
    series.push(ema);

    for value in &values[1..] {
        ema = (value - ema) * multiplier + ema;
        series.push(ema);
    }

    series
}

/// Calculate Exponential Moving Average (EMA), latest value only
pub fn calculate_ema(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    calculate_ema_series(prices, period).last().copied()
}
