/// Volume analysis
///
/// Compares the latest candle's volume against the mean of the preceding
/// `lookback` candles (latest excluded).

use serde::{Deserialize, Serialize};

use crate::models::Candle;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VolumeSignal {
    Spike,
    Drop,
    Normal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VolumeAnalysis {
    pub signal: VolumeSignal,
    pub average: f64,
    pub current: f64,
    pub ratio: f64,
}

/// Classify the latest volume: spike if ratio > threshold, drop if ratio < 1/threshold
///
/// Returns None with fewer than `lookback + 1` candles or a zero average.
pub fn analyze_volume(candles: &[Candle], lookback: usize, threshold: f64) -> Option<VolumeAnalysis> {
    if lookback == 0 || candles.len() < lookback + 1 {
        return None;
    }

    let current = candles.last()?.volume;
    let previous = &candles[candles.len() - lookback - 1..candles.len() - 1];
    let average = previous.iter().map(|c| c.volume).sum::<f64>() / lookback as f64;

    if average <= 0.0 {
        return None;
    }

    let ratio = current / average;
    let signal = if ratio > threshold {
        VolumeSignal::Spike
    } else if ratio < 1.0 / threshold {
        VolumeSignal::Drop
    } else {
        VolumeSignal::Normal
    };

    Some(VolumeAnalysis {
        signal,
        average,
        current,
        ratio,
    })
}
