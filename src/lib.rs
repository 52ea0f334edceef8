// Core modules
pub mod analytics;
pub mod config;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod paper;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use analytics::{PerformanceSummary, TradeAnalytics, TradeRecord};
pub use config::TradingConfig;
pub use execution::{
    CycleEvent, CycleReport, ExchangeError, MarketInputs, OrderGateway, TradingEngine,
};
pub use indicators::IndicatorSnapshot;
pub use models::*;
pub use risk::RiskManager;
pub use strategy::{ConfluenceStrategy, Decision};
