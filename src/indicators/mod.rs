// Technical indicators module
// Pure functions over candle sequences; None means "not enough data"

pub mod adx;
pub mod atr;
pub mod candlestick;
pub mod macd;
pub mod moving_average;
pub mod rsi;
pub mod snapshot;
pub mod support_resistance;
pub mod volume;

pub use adx::{calculate_adx, detect_market_regime, Adx, MarketRegime, RegimeReading};
pub use atr::{calculate_atr, true_ranges};
pub use candlestick::{body_direction, candle_pattern_score, CandleShape};
pub use macd::{calculate_macd, Macd};
pub use moving_average::{calculate_ema, calculate_ema_series, calculate_sma};
pub use rsi::calculate_rsi;
pub use snapshot::IndicatorSnapshot;
pub use support_resistance::{
    check_near_support_resistance, cluster_levels, detect_support_resistance, SupportResistance,
};
pub use volume::{analyze_volume, VolumeAnalysis, VolumeSignal};

use crate::models::Candle;

/// Close prices, oldest first
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}
