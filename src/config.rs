//! Trading configuration
//!
//! Every field has a default, so an empty file (or no file) yields a
//! working configuration. Values are layered: defaults, then the optional
//! TOML file, then `TRADECORE__<SECTION>__<FIELD>` environment variables.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::strategy::signals::SignalName;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub pair: PairConfig,
    pub indicators: IndicatorConfig,
    pub signals: SignalConfig,
    pub risk: RiskConfig,
    pub analytics: AnalyticsConfig,
    pub execution: ExecutionConfig,
}

/// Trading pair and the currencies it is made of
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PairConfig {
    pub symbol: String,
    pub asset: String,
    pub quote: String,
}

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            asset: "BTC".to_string(),
            quote: "USDT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub sma_period: usize,
    pub atr_period: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub adx_period: usize,
    pub adx_trend_threshold: f64,
    pub volume_lookback: usize,
    pub volume_spike_threshold: f64,
    pub sr_lookback: usize,
    pub sr_cluster_threshold: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_period: 20,
            atr_period: 14,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            adx_period: 14,
            adx_trend_threshold: 25.0,
            volume_lookback: 20,
            volume_spike_threshold: 1.5,
            sr_lookback: 50,
            sr_cluster_threshold: 0.005,
        }
    }
}

impl IndicatorConfig {
    /// Primary candles needed before a trading decision is attempted
    pub fn min_primary_candles(&self) -> usize {
        self.sma_period.max(self.atr_period) + 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub rsi_neutral_low: f64,
    pub rsi_neutral_high: f64,
    /// Relative top-of-book spread below which the book scores +1
    pub max_spread: f64,
    /// Bid/ask depth ratio that scores the book +1 (inverse scores -1)
    pub depth_ratio: f64,
    /// Distance from the 24h extremes that counts as "near"
    pub range_proximity: f64,
    /// Distance from a support/resistance level that counts as "near"
    pub sr_proximity: f64,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    /// Signals reported but left out of the decision sum
    pub excluded: Vec<SignalName>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_neutral_low: 45.0,
            rsi_neutral_high: 55.0,
            max_spread: 0.001,
            depth_ratio: 1.2,
            range_proximity: 0.005,
            sr_proximity: 0.005,
            buy_threshold: 1.0,
            sell_threshold: -1.0,
            excluded: vec![SignalName::HrTrend, SignalName::Hl],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub max_risk_fraction: f64,
    pub atr_stop_multiplier: f64,
    pub max_drawdown: f64,
    pub max_concurrent_positions: usize,
    pub breakeven_trigger: f64,
    pub profit_target_1: f64,
    pub profit_target_1_size: f64,
    pub profit_target_2: f64,
    pub profit_target_2_size: f64,
    pub profit_target_3: f64,
    pub profit_target_3_size: f64,
    pub trailing_distance: f64,
    /// Size multiplier applied when the regime is ranging
    pub ranging_volatility_factor: f64,
    /// Share of equity/price a position may use
    pub max_equity_usage: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_risk_fraction: 0.05,
            atr_stop_multiplier: 2.0,
            max_drawdown: 0.05,
            max_concurrent_positions: 3,
            breakeven_trigger: 0.015,
            profit_target_1: 0.02,
            profit_target_1_size: 0.5,
            profit_target_2: 0.035,
            profit_target_2_size: 0.5,
            profit_target_3: 0.05,
            profit_target_3_size: 1.0,
            trailing_distance: 0.01,
            ranging_volatility_factor: 0.5,
            max_equity_usage: 0.95,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub enable_trade_logging: bool,
    pub trade_log_path: PathBuf,
    pub equity_log_path: PathBuf,
    pub risk_free_rate: f64,
    pub periods_per_year: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enable_trade_logging: true,
            trade_log_path: PathBuf::from("logs/trades.jsonl"),
            equity_log_path: PathBuf::from("logs/equity.jsonl"),
            risk_free_rate: 0.02,
            periods_per_year: 252.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub min_order_volume: f64,
    pub use_limit_orders: bool,
    pub cycle_interval_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            min_order_volume: 0.0001,
            use_limit_orders: false,
            cycle_interval_secs: 60,
        }
    }
}

impl TradingConfig {
    /// Load defaults, then an optional TOML file, then environment overrides
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let config: TradingConfig = builder
            .add_source(
                config::Environment::with_prefix("TRADECORE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ind = &self.indicators;
        let periods = [
            ("sma_period", ind.sma_period),
            ("atr_period", ind.atr_period),
            ("rsi_period", ind.rsi_period),
            ("macd_fast", ind.macd_fast),
            ("macd_slow", ind.macd_slow),
            ("macd_signal", ind.macd_signal),
            ("adx_period", ind.adx_period),
            ("volume_lookback", ind.volume_lookback),
            ("sr_lookback", ind.sr_lookback),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return Err(ConfigError::Validation(format!("{} must be positive", name)));
        }
        if ind.macd_fast >= ind.macd_slow {
            return Err(ConfigError::Validation(
                "macd_fast must be shorter than macd_slow".to_string(),
            ));
        }

        let risk = &self.risk;
        let fractions = [
            ("max_risk_fraction", risk.max_risk_fraction),
            ("max_drawdown", risk.max_drawdown),
            ("profit_target_1_size", risk.profit_target_1_size),
            ("profit_target_2_size", risk.profit_target_2_size),
            ("profit_target_3_size", risk.profit_target_3_size),
            ("trailing_distance", risk.trailing_distance),
            ("ranging_volatility_factor", risk.ranging_volatility_factor),
            ("max_equity_usage", risk.max_equity_usage),
        ];
        if let Some((name, value)) = fractions.iter().find(|(_, v)| !(*v > 0.0 && *v <= 1.0)) {
            return Err(ConfigError::Validation(format!(
                "{} must be in (0, 1], got {}",
                name, value
            )));
        }
        let sig = &self.signals;
        let positives = [
            ("adx_trend_threshold", ind.adx_trend_threshold),
            ("volume_spike_threshold", ind.volume_spike_threshold),
            ("sr_cluster_threshold", ind.sr_cluster_threshold),
            ("max_spread", sig.max_spread),
            ("depth_ratio", sig.depth_ratio),
            ("range_proximity", sig.range_proximity),
            ("sr_proximity", sig.sr_proximity),
            ("atr_stop_multiplier", risk.atr_stop_multiplier),
            ("breakeven_trigger", risk.breakeven_trigger),
        ];
        if let Some((name, value)) = positives.iter().find(|(_, v)| v.is_nan() || *v <= 0.0) {
            return Err(ConfigError::Validation(format!(
                "{} must be positive, got {}",
                name, value
            )));
        }
        if risk.max_concurrent_positions == 0 {
            return Err(ConfigError::Validation(
                "max_concurrent_positions must be at least 1".to_string(),
            ));
        }
        if !(risk.profit_target_1 < risk.profit_target_2
            && risk.profit_target_2 < risk.profit_target_3)
        {
            return Err(ConfigError::Validation(
                "profit targets must be strictly ascending".to_string(),
            ));
        }

        if self.signals.buy_threshold < self.signals.sell_threshold {
            return Err(ConfigError::Validation(
                "buy_threshold must not be below sell_threshold".to_string(),
            ));
        }

        Ok(())
    }
}
