// Decision strategy: signal aggregation plus multi-timeframe confirmation
pub mod signals;
pub mod timeframe;

pub use signals::{SignalAggregator, SignalName, SignalVector};
pub use timeframe::{Divergence, TimeframeValidator};

use serde::{Deserialize, Serialize};

use crate::config::{IndicatorConfig, SignalConfig};
use crate::indicators::IndicatorSnapshot;
use crate::models::{Direction, MarketSnapshot};

/// Outcome of one signal evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub signals: SignalVector,
    /// Sum of the included signal scores
    pub value: f64,
    /// Direction implied by `value` alone
    pub direction: Direction,
    /// Whether the trend timeframe confirms `direction`
    pub confirmed: bool,
    pub divergence: Option<Divergence>,
    pub trend_strength: f64,
}

impl Decision {
    /// Direction to act on: the raw direction when confirmed, else neutral
    pub fn action(&self) -> Direction {
        if self.confirmed {
            self.direction
        } else {
            Direction::Neutral
        }
    }
}

/// Confluence strategy: many small votes, gated by the trend timeframe
#[derive(Debug, Clone)]
pub struct ConfluenceStrategy {
    aggregator: SignalAggregator,
    validator: TimeframeValidator,
}

impl ConfluenceStrategy {
    pub fn new(signals: SignalConfig, indicators: &IndicatorConfig) -> Self {
        Self {
            aggregator: SignalAggregator::new(signals),
            validator: TimeframeValidator::new(indicators.sma_period),
        }
    }

    pub fn decide(&self, market: &MarketSnapshot, indicators: &IndicatorSnapshot) -> Decision {
        let config = self.aggregator.config();
        let signals = self.aggregator.evaluate(market, indicators);
        let value = signals.decision_signal(&config.excluded);
        let direction = Direction::from_signal(value, config.buy_threshold, config.sell_threshold);

        let confirmed = self.validator.validate(direction, &market.trend);
        let divergence = self.validator.check_divergence(&market.primary, &market.trend);
        let trend_strength = self.validator.trend_strength(&market.trend);

        tracing::info!("Signals: {}", signals);
        tracing::info!(
            "Decision signal {:.2} => {:?} (confirmed: {}, trend strength: {:.2})",
            value,
            direction,
            confirmed,
            trend_strength
        );
        if let Some(divergence) = divergence {
            tracing::info!("Timeframe divergence detected: {:?}", divergence);
        }

        Decision {
            signals,
            value,
            direction,
            confirmed,
            divergence,
            trend_strength,
        }
    }
}
