use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RiskConfig;

/// Entry limits checked before every new position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakers {
    pub max_drawdown_pct: f64,
    pub max_concurrent_positions: usize,
}

impl Default for CircuitBreakers {
    fn default() -> Self {
        Self::from(&RiskConfig::default())
    }
}

impl From<&RiskConfig> for CircuitBreakers {
    fn from(config: &RiskConfig) -> Self {
        Self {
            max_drawdown_pct: config.max_drawdown,
            max_concurrent_positions: config.max_concurrent_positions,
        }
    }
}

/// Equity tracking for one trading session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EquityState {
    pub initial_equity: f64,
    /// High-water mark
    pub peak_equity: f64,
    pub current_equity: f64,
    pub max_drawdown: f64,
    /// Latches on at the drawdown limit; cleared only by `reset`
    pub circuit_breaker_active: bool,
}

impl EquityState {
    pub fn new(initial_equity: f64) -> Self {
        Self {
            initial_equity,
            peak_equity: initial_equity,
            current_equity: initial_equity,
            max_drawdown: 0.0,
            circuit_breaker_active: false,
        }
    }

    pub fn drawdown(&self) -> f64 {
        if self.peak_equity > 0.0 {
            (self.peak_equity - self.current_equity) / self.peak_equity
        } else {
            0.0
        }
    }

    pub fn roi(&self) -> f64 {
        if self.initial_equity > 0.0 {
            (self.current_equity - self.initial_equity) / self.initial_equity
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CircuitBreakerTrip {
    #[error("circuit breaker active due to max drawdown")]
    MaxDrawdown,
    #[error("maximum concurrent positions reached")]
    ConcurrencyLimit,
}

impl CircuitBreakers {
    /// Record a new equity reading and return the current drawdown
    pub fn update_equity(&self, state: &mut EquityState, equity: f64) -> f64 {
        state.current_equity = equity;
        if equity > state.peak_equity {
            state.peak_equity = equity;
        }

        let drawdown = state.drawdown();
        if drawdown > state.max_drawdown {
            state.max_drawdown = drawdown;
        }

        if drawdown >= self.max_drawdown_pct && !state.circuit_breaker_active {
            state.circuit_breaker_active = true;
            tracing::warn!(
                "🛑 Circuit breaker tripped: drawdown {:.2}% reached the {:.2}% limit, entries halted",
                drawdown * 100.0,
                self.max_drawdown_pct * 100.0
            );
        }

        drawdown
    }

    pub fn check(
        &self,
        state: &EquityState,
        open_positions: usize,
    ) -> Result<(), CircuitBreakerTrip> {
        if state.circuit_breaker_active {
            return Err(CircuitBreakerTrip::MaxDrawdown);
        }

        if open_positions >= self.max_concurrent_positions {
            return Err(CircuitBreakerTrip::ConcurrencyLimit);
        }

        Ok(())
    }

    /// Clear the latch and restart the high-water mark at current equity
    pub fn reset(&self, state: &mut EquityState) {
        state.circuit_breaker_active = false;
        state.peak_equity = state.current_equity;
        tracing::info!(
            "Circuit breaker reset, peak equity now ${:.2}",
            state.peak_equity
        );
    }
}
