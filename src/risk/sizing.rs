use serde::{Deserialize, Serialize};

/// Entry volume and its protective stop
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PositionSize {
    pub volume: f64,
    pub stop_loss: f64,
}

impl PositionSize {
    pub fn is_tradeable(&self) -> bool {
        self.volume > 0.0
    }
}

/// ATR-based position sizing
///
/// Risks `max_risk_fraction` of equity over a stop placed
/// `atr * stop_multiplier` below price, scaled by `volatility_factor` and
/// capped at `max_equity_usage` of equity / price. Returns a zero size for
/// a non-positive price or ATR.
pub fn calculate_position_size(
    equity: f64,
    price: f64,
    atr: f64,
    max_risk_fraction: f64,
    stop_multiplier: f64,
    volatility_factor: f64,
    max_equity_usage: f64,
) -> PositionSize {
    if atr <= 0.0 || price <= 0.0 {
        return PositionSize::default();
    }

    let risk_amount = equity * max_risk_fraction;
    let stop_distance = atr * stop_multiplier;
    let raw_size = risk_amount / stop_distance;

    let adjusted = raw_size * volatility_factor;
    let max_affordable = equity / price * max_equity_usage;

    PositionSize {
        volume: adjusted.min(max_affordable).max(0.0),
        stop_loss: price - stop_distance,
    }
}
