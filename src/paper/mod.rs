// Paper trading: a seeded synthetic market and an in-memory exchange
pub mod exchange;
pub mod market;

pub use exchange::{PaperExchange, PaperFill};
pub use market::{MarketScenario, SyntheticMarket};
