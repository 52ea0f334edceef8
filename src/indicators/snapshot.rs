use serde::{Deserialize, Serialize};

use super::{
    analyze_volume, calculate_atr, calculate_macd, calculate_rsi, calculate_sma, closes,
    detect_market_regime, detect_support_resistance, Macd, RegimeReading, SupportResistance,
    VolumeAnalysis,
};
use crate::config::IndicatorConfig;
use crate::models::Candle;

/// Every derived value for one cycle; None marks an indicator that lacked data
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndicatorSnapshot {
    pub sma: Option<f64>,
    pub atr: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<Macd>,
    pub levels: Option<SupportResistance>,
    pub volume: Option<VolumeAnalysis>,
    pub regime: Option<RegimeReading>,
}

impl IndicatorSnapshot {
    pub fn compute(candles: &[Candle], config: &IndicatorConfig) -> Self {
        let prices = closes(candles);

        let snapshot = Self {
            sma: calculate_sma(&prices, config.sma_period),
            atr: calculate_atr(candles, config.atr_period),
            rsi: calculate_rsi(&prices, config.rsi_period),
            macd: calculate_macd(
                &prices,
                config.macd_fast,
                config.macd_slow,
                config.macd_signal,
            ),
            levels: detect_support_resistance(
                candles,
                config.sr_lookback,
                config.sr_cluster_threshold,
            ),
            volume: analyze_volume(
                candles,
                config.volume_lookback,
                config.volume_spike_threshold,
            ),
            regime: detect_market_regime(
                candles,
                config.adx_period,
                config.adx_trend_threshold,
            ),
        };

        tracing::debug!(
            "Indicators: SMA={:?}, ATR={:?}, RSI={:?}, MACD hist={:?}, regime={:?}",
            snapshot.sma,
            snapshot.atr,
            snapshot.rsi,
            snapshot.macd.map(|m| m.histogram),
            snapshot.regime.map(|r| r.regime)
        );

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_candles::candles_from_closes;

    #[test]
    fn test_snapshot_with_enough_history() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 3.0).collect();
        let candles = candles_from_closes(&closes);

        let snapshot = IndicatorSnapshot::compute(&candles, &IndicatorConfig::default());

        assert!(snapshot.sma.is_some());
        assert!(snapshot.atr.is_some());
        assert!(snapshot.rsi.is_some());
        assert!(snapshot.macd.is_some());
        assert!(snapshot.levels.is_some());
        assert!(snapshot.volume.is_some());
        assert!(snapshot.regime.is_some());
    }

    #[test]
    fn test_snapshot_marks_short_history_undefined() {
        let candles = candles_from_closes(&[100.0, 101.0, 102.0]);

        let snapshot = IndicatorSnapshot::compute(&candles, &IndicatorConfig::default());

        assert_eq!(snapshot, IndicatorSnapshot::default());
    }
}
