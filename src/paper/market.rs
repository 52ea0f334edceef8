use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::models::{Candle, OrderBook, Ticker};

/// Price path shapes for the synthetic market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MarketScenario {
    /// Steady drift up with noise
    Uptrend,
    /// Steady drift down with noise
    Downtrend,
    /// Mean-reverting chop around the start price
    Sideways,
    /// Large random swings
    Volatile,
}

/// Seeded random-walk market producing fixed-interval candles
pub struct SyntheticMarket {
    rng: StdRng,
    scenario: MarketScenario,
    base_price: f64,
    base_volume: f64,
    interval_minutes: i64,
    price: f64,
    next_time: DateTime<Utc>,
    candles: Vec<Candle>,
}

impl SyntheticMarket {
    pub fn new(
        seed: u64,
        scenario: MarketScenario,
        base_price: f64,
        interval_minutes: i64,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            scenario,
            base_price,
            base_volume: 1_000.0,
            interval_minutes,
            price: base_price,
            next_time: start_time,
            candles: Vec::new(),
        }
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn last_price(&self) -> f64 {
        self.price
    }

    /// Append `count` candles
    pub fn generate(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    /// Append one candle and return it
    pub fn advance(&mut self) -> &Candle {
        let open = self.price;
        self.price = self.next_price();

        let timestamp = self.next_time;
        self.next_time = timestamp + Duration::minutes(self.interval_minutes);

        let candle = self.create_candle(open, self.price, timestamp);
        self.candles.push(candle);
        &self.candles[self.candles.len() - 1]
    }

    /// The most recent `count` primary candles merged `factor` at a time
    ///
    /// Groups are aligned to the newest candle; a partial oldest group is
    /// dropped.
    pub fn aggregated(&self, factor: usize, count: usize) -> Vec<Candle> {
        if factor == 0 {
            return Vec::new();
        }

        let usable = (self.candles.len() / factor).min(count) * factor;
        let start = self.candles.len() - usable;

        self.candles[start..]
            .chunks(factor)
            .filter_map(merge_candles)
            .collect()
    }

    /// Newest `count` primary candles
    pub fn recent(&self, count: usize) -> Vec<Candle> {
        let start = self.candles.len().saturating_sub(count);
        self.candles[start..].to_vec()
    }

    /// Book around the last price with a random spread and depth
    pub fn order_book(&mut self, levels: usize) -> OrderBook {
        let half_spread = self.price * self.rng.gen_range(0.0001..0.0008);
        let tick = self.price * 0.0002;

        let mut book = OrderBook::default();
        for i in 0..levels {
            let offset = half_spread + tick * i as f64;
            book.bids
                .push((self.price - offset, self.rng.gen_range(0.1..2.0)));
            book.asks
                .push((self.price + offset, self.rng.gen_range(0.1..2.0)));
        }
        book
    }

    /// Last price with extremes over the trailing 24 hours
    pub fn ticker(&self) -> Ticker {
        let per_day = (24 * 60 / self.interval_minutes.max(1)) as usize;
        let window = self.recent(per_day);

        let high_24h = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let low_24h = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);

        Ticker {
            last: self.price,
            high_24h: if window.is_empty() { self.price } else { high_24h },
            low_24h: if window.is_empty() { self.price } else { low_24h },
        }
    }

    fn next_price(&mut self) -> f64 {
        let price = self.price;
        let candles_per_day = 24.0 * 60.0 / self.interval_minutes as f64;

        let next = match self.scenario {
            MarketScenario::Uptrend => {
                let drift = price * 0.02 / candles_per_day;
                price + drift + price * self.rng.gen_range(-0.002..0.002)
            }
            MarketScenario::Downtrend => {
                let drift = -price * 0.02 / candles_per_day;
                price + drift + price * self.rng.gen_range(-0.002..0.002)
            }
            MarketScenario::Sideways => {
                let reversion = (self.base_price - price) * 0.1;
                price + reversion + price * self.rng.gen_range(-0.005..0.005)
            }
            MarketScenario::Volatile => price + price * self.rng.gen_range(-0.03..0.03),
        };

        next.max(self.base_price * 0.1)
    }

    fn create_candle(&mut self, open: f64, close: f64, timestamp: DateTime<Utc>) -> Candle {
        let noise_pct = 0.002;

        let high = open.max(close) * (1.0 + self.rng.gen_range(0.0..noise_pct));
        let low = open.min(close) * (1.0 - self.rng.gen_range(0.0..noise_pct));
        let volume = self.base_volume * self.rng.gen_range(0.5..1.5);

        // Occasional volume burst
        let volume = if self.rng.gen_bool(0.05) {
            volume * 3.0
        } else {
            volume
        };

        Candle {
            timestamp,
            open,
            high,
            low,
            close,
            vwap: (high + low + close) / 3.0,
            volume,
            trade_count: self.rng.gen_range(10..500),
        }
    }
}

fn merge_candles(group: &[Candle]) -> Option<Candle> {
    let first = group.first()?;
    let last = group.last()?;
    let volume: f64 = group.iter().map(|c| c.volume).sum();
    let vwap = if volume > 0.0 {
        group.iter().map(|c| c.vwap * c.volume).sum::<f64>() / volume
    } else {
        last.close
    };

    Some(Candle {
        timestamp: first.timestamp,
        open: first.open,
        high: group.iter().map(|c| c.high).fold(f64::MIN, f64::max),
        low: group.iter().map(|c| c.low).fold(f64::MAX, f64::min),
        close: last.close,
        vwap,
        volume,
        trade_count: group.iter().map(|c| c.trade_count).sum(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(scenario: MarketScenario) -> SyntheticMarket {
        SyntheticMarket::new(42, scenario, 50000.0, 5, Utc::now())
    }

    #[test]
    fn test_uptrend_ends_higher() {
        let mut market = market(MarketScenario::Uptrend);
        market.generate(2000);

        let candles = market.candles();
        assert_eq!(candles.len(), 2000);
        assert!(candles[candles.len() - 1].close > candles[0].open);
    }

    #[test]
    fn test_sideways_stays_near_base() {
        let mut market = market(MarketScenario::Sideways);
        market.generate(500);

        for candle in market.candles() {
            assert!(candle.close > 45000.0 && candle.close < 55000.0);
        }
    }

    #[test]
    fn test_same_seed_same_path() {
        let start = Utc::now();
        let mut a = SyntheticMarket::new(7, MarketScenario::Volatile, 100.0, 5, start);
        let mut b = SyntheticMarket::new(7, MarketScenario::Volatile, 100.0, 5, start);
        a.generate(50);
        b.generate(50);

        assert_eq!(a.candles(), b.candles());
    }

    #[test]
    fn test_ohlc_consistency() {
        let mut market = market(MarketScenario::Volatile);
        market.generate(200);

        for candle in market.candles() {
            assert!(candle.high >= candle.open.max(candle.close));
            assert!(candle.low <= candle.open.min(candle.close));
        }
        for pair in market.candles().windows(2) {
            assert_eq!((pair[1].timestamp - pair[0].timestamp).num_minutes(), 5);
        }
    }

    #[test]
    fn test_aggregated_candles() {
        let mut market = market(MarketScenario::Uptrend);
        market.generate(10);

        let trend = market.aggregated(3, 100);
        assert_eq!(trend.len(), 3);

        let primary = market.candles();
        assert_eq!(trend[2].close, primary[9].close);
        assert_eq!(trend[2].open, primary[7].open);
        assert_eq!(trend[0].timestamp, primary[1].timestamp);
        assert_eq!(market.aggregated(3, 2).len(), 2);
    }

    #[test]
    fn test_book_and_ticker_bracket_price() {
        let mut market = market(MarketScenario::Sideways);
        market.generate(300);

        let book = market.order_book(5);
        let price = market.last_price();
        assert_eq!(book.bids.len(), 5);
        assert!(book.best_bid().unwrap() < price);
        assert!(book.best_ask().unwrap() > price);

        let ticker = market.ticker();
        assert!(ticker.low_24h <= price && price <= ticker.high_24h);
    }
}
