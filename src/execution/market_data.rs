use super::ExchangeError;
use crate::models::{Balance, Candle, MarketSnapshot, OrderBook, Ticker};

/// Raw collaborator results for one cycle
///
/// Each field is the exchange client's answer, success or failure.
#[derive(Debug, Clone)]
pub struct MarketInputs {
    pub primary: Result<Vec<Candle>, ExchangeError>,
    pub trend: Result<Vec<Candle>, ExchangeError>,
    pub order_book: Result<OrderBook, ExchangeError>,
    pub ticker: Result<Ticker, ExchangeError>,
    pub balance: Result<Balance, ExchangeError>,
}

impl MarketInputs {
    /// All-successful inputs
    pub fn new(
        primary: Vec<Candle>,
        trend: Vec<Candle>,
        order_book: OrderBook,
        ticker: Ticker,
        balance: Balance,
    ) -> Self {
        Self {
            primary: Ok(primary),
            trend: Ok(trend),
            order_book: Ok(order_book),
            ticker: Ok(ticker),
            balance: Ok(balance),
        }
    }

    /// Combine into a snapshot, failing on the first missing input
    pub fn assemble(self) -> Result<(MarketSnapshot, Balance), ExchangeError> {
        let primary = self.primary?;
        if primary.is_empty() {
            return Err(ExchangeError::NoData("primary candles".to_string()));
        }

        let trend = self.trend?;
        if trend.is_empty() {
            return Err(ExchangeError::NoData("trend candles".to_string()));
        }

        let snapshot = MarketSnapshot {
            primary,
            trend,
            order_book: self.order_book?,
            ticker: self.ticker?,
        };

        Ok((snapshot, self.balance?))
    }
}
