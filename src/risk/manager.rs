use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    calculate_position_size, CircuitBreakerTrip, CircuitBreakers, EquityState, ExitReason,
    Position, PositionAction, PositionSize, ProfitTier, RiskError,
};
use crate::analytics::TradeRecord;
use crate::config::RiskConfig;

/// Session risk state for one instrument
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskState {
    pub equity: EquityState,
    /// Active positions in opening order
    pub positions: Vec<Position>,
    pub trade_history: Vec<TradeRecord>,
}

impl RiskState {
    pub fn new(initial_equity: f64) -> Self {
        Self {
            equity: EquityState::new(initial_equity),
            positions: Vec::new(),
            trade_history: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskStatistics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub avg_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub total_pnl: f64,
    pub max_drawdown: f64,
    pub current_equity: f64,
    pub roi: f64,
}

/// Sizes entries, runs the exit lifecycle and guards new positions
pub struct RiskManager {
    config: RiskConfig,
    circuit_breakers: CircuitBreakers,
    state: RiskState,
}

impl RiskManager {
    pub fn new(config: RiskConfig, initial_equity: f64) -> Self {
        let circuit_breakers = CircuitBreakers::from(&config);
        Self {
            config,
            circuit_breakers,
            state: RiskState::new(initial_equity),
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn state(&self) -> &RiskState {
        &self.state
    }

    pub fn positions(&self) -> &[Position] {
        &self.state.positions
    }

    pub fn position(&self, id: Uuid) -> Option<&Position> {
        self.state.positions.iter().find(|p| p.id == id)
    }

    pub fn is_circuit_breaker_active(&self) -> bool {
        self.state.equity.circuit_breaker_active
    }

    /// Record current equity; returns the drawdown from peak
    pub fn update_equity(&mut self, equity: f64) -> f64 {
        self.circuit_breakers
            .update_equity(&mut self.state.equity, equity)
    }

    pub fn can_open_position(&self) -> Result<(), CircuitBreakerTrip> {
        self.circuit_breakers
            .check(&self.state.equity, self.state.positions.len())
    }

    /// Size a new entry against current equity
    pub fn size_position(&self, price: f64, atr: f64, volatility_factor: f64) -> PositionSize {
        calculate_position_size(
            self.state.equity.current_equity,
            price,
            atr,
            self.config.max_risk_fraction,
            self.config.atr_stop_multiplier,
            volatility_factor,
            self.config.max_equity_usage,
        )
    }

    /// Track a confirmed entry
    pub fn open_position(
        &mut self,
        entry_price: f64,
        volume: f64,
        stop_loss: f64,
    ) -> Result<Uuid, RiskError> {
        self.open_position_at(entry_price, volume, stop_loss, None)
    }

    /// Track a confirmed entry with an explicit timestamp
    pub fn open_position_at(
        &mut self,
        entry_price: f64,
        volume: f64,
        stop_loss: f64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Uuid, RiskError> {
        self.can_open_position()?;

        if volume <= 0.0 || !volume.is_finite() {
            return Err(RiskError::InvalidVolume(volume));
        }

        let position = Position::new(
            entry_price,
            volume,
            stop_loss,
            timestamp.unwrap_or_else(Utc::now),
        );
        let id = position.id;

        tracing::info!(
            "📈 Opened position {}: {:.6} @ ${:.2}, stop ${:.2}",
            id,
            volume,
            entry_price,
            stop_loss
        );

        self.state.positions.push(position);
        Ok(id)
    }

    /// Run one lifecycle step for a position
    ///
    /// Stop moves take effect immediately; exits are returned as requests
    /// and only change the position via `apply_partial_exit` / `close_position`.
    pub fn evaluate_position(&mut self, id: Uuid, price: f64) -> Result<PositionAction, RiskError> {
        let config = &self.config;
        let position = self
            .state
            .positions
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RiskError::UnknownPosition(id))?;

        let action = position.evaluate(price, config);

        match action {
            PositionAction::StopUpdated { reason, stop_loss } => {
                tracing::info!("Position {} stop moved to ${:.2} ({:?})", id, stop_loss, reason);
            }
            PositionAction::PartialExit { tier, volume } => {
                tracing::info!(
                    "Position {} reached target {}: exit {:.6} requested",
                    id,
                    tier,
                    volume
                );
            }
            PositionAction::FullExit { volume, reason } => {
                tracing::info!(
                    "Position {} full exit requested: {:.6} ({})",
                    id,
                    volume,
                    reason
                );
            }
            PositionAction::Hold => {}
        }

        Ok(action)
    }

    /// Evaluate every active position at `price`, in opening order
    pub fn evaluate_positions(&mut self, price: f64) -> Vec<(Uuid, PositionAction)> {
        let ids: Vec<Uuid> = self.state.positions.iter().map(|p| p.id).collect();

        ids.into_iter()
            .filter_map(|id| self.evaluate_position(id, price).ok().map(|a| (id, a)))
            .collect()
    }

    /// Apply a partial exit after the sell order was confirmed
    pub fn apply_partial_exit(
        &mut self,
        id: Uuid,
        tier: ProfitTier,
        volume: f64,
    ) -> Result<(), RiskError> {
        let position = self
            .state
            .positions
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RiskError::UnknownPosition(id))?;

        if volume <= 0.0 || !volume.is_finite() {
            return Err(RiskError::InvalidVolume(volume));
        }
        if volume > position.volume {
            return Err(RiskError::ExcessiveExit {
                requested: volume,
                available: position.volume,
            });
        }

        position.apply_partial_exit(tier, volume);
        tracing::info!(
            "💰 Partial exit confirmed for {} (target {}): {:.6} sold, {:.6} remaining",
            id,
            tier,
            volume,
            position.volume
        );

        Ok(())
    }

    /// Remove a position after its final sell was confirmed
    pub fn close_position(
        &mut self,
        id: Uuid,
        exit_price: f64,
        reason: ExitReason,
    ) -> Result<TradeRecord, RiskError> {
        self.close_position_at(id, exit_price, reason, None)
    }

    pub fn close_position_at(
        &mut self,
        id: Uuid,
        exit_price: f64,
        reason: ExitReason,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<TradeRecord, RiskError> {
        let index = self
            .state
            .positions
            .iter()
            .position(|p| p.id == id)
            .ok_or(RiskError::UnknownPosition(id))?;

        let mut position = self.state.positions.remove(index);
        if let Some(tier) = reason.tier() {
            if !position.has_hit(tier) {
                position.profit_targets_hit.push(tier);
            }
        }

        let record = TradeRecord::from_position(
            &position,
            exit_price,
            timestamp.unwrap_or_else(Utc::now),
            reason,
        );

        let emoji = if record.is_win() { "✅" } else { "❌" };
        tracing::info!(
            "{} Closed position {} ({}): P&L ${:.2} ({:+.2}%)",
            emoji,
            id,
            reason,
            record.pnl,
            record.pnl_pct * 100.0
        );

        self.state.trade_history.push(record.clone());
        Ok(record)
    }

    /// Clear a latched circuit breaker; peak equity restarts at current equity
    pub fn reset_circuit_breaker(&mut self) {
        self.circuit_breakers.reset(&mut self.state.equity);
    }

    pub fn statistics(&self) -> RiskStatistics {
        let trades = &self.state.trade_history;
        let equity = &self.state.equity;

        let wins: Vec<f64> = trades.iter().filter(|t| t.is_win()).map(|t| t.pnl).collect();
        let losses: Vec<f64> = trades.iter().filter(|t| !t.is_win()).map(|t| t.pnl).collect();
        let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();

        let average = |values: &[f64]| {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        };

        RiskStatistics {
            total_trades: trades.len(),
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate: if trades.is_empty() {
                0.0
            } else {
                wins.len() as f64 / trades.len() as f64
            },
            avg_pnl: if trades.is_empty() {
                0.0
            } else {
                total_pnl / trades.len() as f64
            },
            avg_win: average(&wins),
            avg_loss: average(&losses),
            total_pnl,
            max_drawdown: equity.max_drawdown,
            current_equity: equity.current_equity,
            roi: equity.roi(),
        }
    }
}
