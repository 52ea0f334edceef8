// Risk management module
pub mod circuit_breakers;
pub mod manager;
pub mod position;
pub mod sizing;

pub use circuit_breakers::{CircuitBreakerTrip, CircuitBreakers, EquityState};
pub use manager::{RiskManager, RiskState, RiskStatistics};
pub use position::{ExitReason, Position, PositionAction, ProfitTier, StopReason};
pub use sizing::{calculate_position_size, PositionSize};

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq)]
pub enum RiskError {
    #[error("position {0} not found")]
    UnknownPosition(Uuid),
    #[error("entry blocked: {0}")]
    EntryBlocked(#[from] CircuitBreakerTrip),
    #[error("invalid position volume {0}")]
    InvalidVolume(f64),
    #[error("exit volume {requested} exceeds open volume {available}")]
    ExcessiveExit { requested: f64, available: f64 },
}
