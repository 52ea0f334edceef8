// Order execution and the per-cycle decision loop
pub mod engine;
pub mod market_data;

pub use engine::{CycleEvent, CycleReport, SkipReason, TradingEngine};
pub use market_data::MarketInputs;

use thiserror::Error;

use crate::models::{OrderConfirmation, OrderIntent};

/// Failure reported by the exchange client
///
/// The core treats every variant as "no result"; retry policy belongs to
/// the client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("no data returned: {0}")]
    NoData(String),
    #[error("order rejected: {0}")]
    Rejected(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Exchange client boundary for order placement
pub trait OrderGateway {
    /// Place an order; Ok only when the exchange confirmed execution
    fn place_order(&mut self, intent: &OrderIntent) -> Result<OrderConfirmation, ExchangeError>;
}

impl<G: OrderGateway + ?Sized> OrderGateway for Box<G> {
    fn place_order(&mut self, intent: &OrderIntent) -> Result<OrderConfirmation, ExchangeError> {
        (**self).place_order(intent)
    }
}
