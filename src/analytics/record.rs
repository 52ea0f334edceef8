use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::risk::{ExitReason, Position, ProfitTier};

/// Record of a fully closed position
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRecord {
    pub position_id: Uuid,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Initial position volume
    pub volume: f64,
    pub pnl: f64,
    /// Fractional return, e.g. 0.02 for +2%
    pub pnl_pct: f64,
    pub duration_secs: f64,
    pub exit_reason: ExitReason,
    pub profit_targets_hit: Vec<ProfitTier>,
}

impl TradeRecord {
    /// Snapshot a position at its final exit
    ///
    /// P&L is measured on the initial volume at the final exit price.
    pub fn from_position(
        position: &Position,
        exit_price: f64,
        exit_time: DateTime<Utc>,
        exit_reason: ExitReason,
    ) -> Self {
        let pnl = (exit_price - position.entry_price) * position.initial_volume;
        let pnl_pct = (exit_price - position.entry_price) / position.entry_price;
        let duration_secs = (exit_time - position.entry_time).num_milliseconds() as f64 / 1000.0;

        Self {
            position_id: position.id,
            entry_time: position.entry_time,
            exit_time,
            entry_price: position.entry_price,
            exit_price,
            volume: position.initial_volume,
            pnl,
            pnl_pct,
            duration_secs,
            exit_reason,
            profit_targets_hit: position.profit_targets_hit.clone(),
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}

/// One reading of total account equity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}
