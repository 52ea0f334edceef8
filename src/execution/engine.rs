use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{ExchangeError, MarketInputs, OrderGateway};
use crate::analytics::TradeAnalytics;
use crate::config::TradingConfig;
use crate::indicators::{IndicatorSnapshot, MarketRegime};
use crate::models::{Direction, MarketSnapshot, OrderIntent, OrderSide};
use crate::risk::{ExitReason, PositionAction, ProfitTier, RiskManager};
use crate::strategy::{ConfluenceStrategy, Decision};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum SkipReason {
    /// A collaborator returned no data or an error
    MissingData(String),
    InsufficientHistory { have: usize, need: usize },
}

/// Something that changed (or failed to) during a cycle
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum CycleEvent {
    StopMoved {
        position_id: Uuid,
        stop_loss: f64,
    },
    PartialExit {
        position_id: Uuid,
        tier: ProfitTier,
        volume: f64,
        txid: String,
    },
    Closed {
        position_id: Uuid,
        reason: ExitReason,
        pnl: f64,
        txid: String,
    },
    Opened {
        position_id: Uuid,
        volume: f64,
        price: f64,
        stop_loss: f64,
        txid: String,
    },
    OrderFailed {
        side: OrderSide,
        volume: f64,
        error: String,
    },
    EntrySkipped(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CycleReport {
    pub timestamp: DateTime<Utc>,
    pub skipped: Option<SkipReason>,
    pub price: Option<f64>,
    pub equity: Option<f64>,
    pub drawdown: Option<f64>,
    pub decision: Option<Decision>,
    pub events: Vec<CycleEvent>,
}

impl CycleReport {
    fn skipped(timestamp: DateTime<Utc>, reason: SkipReason) -> Self {
        Self {
            timestamp,
            skipped: Some(reason),
            price: None,
            equity: None,
            drawdown: None,
            decision: None,
            events: Vec::new(),
        }
    }
}

/// Runs one decision cycle at a time for a single trading pair
///
/// Positions and risk state change only after the gateway confirms an order.
pub struct TradingEngine<G: OrderGateway> {
    config: TradingConfig,
    strategy: ConfluenceStrategy,
    risk: RiskManager,
    analytics: TradeAnalytics,
    gateway: G,
}

impl<G: OrderGateway> TradingEngine<G> {
    pub fn new(config: TradingConfig, initial_equity: f64, gateway: G) -> Self {
        let strategy = ConfluenceStrategy::new(config.signals.clone(), &config.indicators);
        let risk = RiskManager::new(config.risk.clone(), initial_equity);
        let analytics = TradeAnalytics::new(config.analytics.clone());

        Self {
            config,
            strategy,
            risk,
            analytics,
            gateway,
        }
    }

    pub fn config(&self) -> &TradingConfig {
        &self.config
    }

    pub fn risk(&self) -> &RiskManager {
        &self.risk
    }

    pub fn risk_mut(&mut self) -> &mut RiskManager {
        &mut self.risk
    }

    pub fn analytics(&self) -> &TradeAnalytics {
        &self.analytics
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    pub fn run_cycle(&mut self, inputs: MarketInputs) -> CycleReport {
        self.run_cycle_at(inputs, Utc::now())
    }

    /// Fetched inputs -> indicators -> exits -> signal -> entry/exit orders
    pub fn run_cycle_at(&mut self, inputs: MarketInputs, now: DateTime<Utc>) -> CycleReport {
        let (market, balance) = match inputs.assemble() {
            Ok(assembled) => assembled,
            Err(e) => {
                tracing::warn!("Skipping cycle: {}", e);
                return CycleReport::skipped(now, SkipReason::MissingData(e.to_string()));
            }
        };

        let need = self.config.indicators.min_primary_candles();
        if market.primary.len() < need {
            tracing::warn!(
                "Skipping cycle: {} primary candles, need {}",
                market.primary.len(),
                need
            );
            return CycleReport::skipped(
                now,
                SkipReason::InsufficientHistory {
                    have: market.primary.len(),
                    need,
                },
            );
        }

        let Some(price) = market.last_close() else {
            return CycleReport::skipped(now, SkipReason::MissingData("price".to_string()));
        };

        let indicators = IndicatorSnapshot::compute(&market.primary, &self.config.indicators);

        let pair = &self.config.pair;
        let quote_free = balance.free(&pair.quote);
        let equity = quote_free + balance.free(&pair.asset) * price;
        let drawdown = self.risk.update_equity(equity);
        self.analytics.record_equity(equity, now);

        let unrealized: f64 = self
            .risk
            .positions()
            .iter()
            .map(|p| p.unrealized_pnl(price))
            .sum();
        tracing::info!(
            "💹 {} @ ${:.2} | equity ${:.2} | drawdown {:.2}% | {} open position(s), unrealized ${:.2}",
            pair.symbol,
            price,
            equity,
            drawdown * 100.0,
            self.risk.positions().len(),
            unrealized
        );

        let mut events = self.manage_positions(&market, price, now);

        let decision = self.strategy.decide(&market, &indicators);
        match decision.action() {
            Direction::Bullish => {
                events.extend(self.try_enter(&market, &indicators, price, quote_free, now));
            }
            Direction::Bearish => {
                events.extend(self.exit_all(&market, price, ExitReason::SignalSell, now));
            }
            Direction::Neutral => {}
        }

        CycleReport {
            timestamp: now,
            skipped: None,
            price: Some(price),
            equity: Some(equity),
            drawdown: Some(drawdown),
            decision: Some(decision),
            events,
        }
    }

    /// Run the exit lifecycle for every active position
    fn manage_positions(
        &mut self,
        market: &MarketSnapshot,
        price: f64,
        now: DateTime<Utc>,
    ) -> Vec<CycleEvent> {
        let mut events = Vec::new();

        for (id, action) in self.risk.evaluate_positions(price) {
            match action {
                PositionAction::Hold => {}
                PositionAction::StopUpdated { stop_loss, .. } => {
                    events.push(CycleEvent::StopMoved {
                        position_id: id,
                        stop_loss,
                    });
                }
                PositionAction::PartialExit { tier, volume } => {
                    let intent = self.order_intent(market, OrderSide::Sell, volume);
                    match self.gateway.place_order(&intent) {
                        Ok(confirmation) => match self.risk.apply_partial_exit(id, tier, volume) {
                            Ok(()) => events.push(CycleEvent::PartialExit {
                                position_id: id,
                                tier,
                                volume,
                                txid: confirmation.txid,
                            }),
                            Err(e) => tracing::error!("Confirmed partial exit not applied: {}", e),
                        },
                        Err(e) => events.push(self.order_failed(OrderSide::Sell, volume, e)),
                    }
                }
                PositionAction::FullExit { volume, reason } => {
                    events.extend(self.close(market, id, volume, price, reason, now));
                }
            }
        }

        events
    }

    fn try_enter(
        &mut self,
        market: &MarketSnapshot,
        indicators: &IndicatorSnapshot,
        price: f64,
        quote_free: f64,
        now: DateTime<Utc>,
    ) -> Vec<CycleEvent> {
        if let Err(trip) = self.risk.can_open_position() {
            tracing::info!("Buy signal ignored: {}", trip);
            return vec![CycleEvent::EntrySkipped(trip.to_string())];
        }

        let Some(atr) = indicators.atr else {
            return vec![CycleEvent::EntrySkipped("ATR undefined".to_string())];
        };

        let volatility_factor = match indicators.regime.map(|r| r.regime) {
            Some(MarketRegime::Ranging) => self.config.risk.ranging_volatility_factor,
            _ => 1.0,
        };

        // Size and cap against the price the order will actually pay
        let order_price = self.touch_price(market, OrderSide::Buy).unwrap_or(price);
        let size = self
            .risk
            .size_position(order_price, atr, volatility_factor);
        let volume = size.volume.min(quote_free / order_price);

        if !size.is_tradeable() || volume < self.config.execution.min_order_volume {
            tracing::info!(
                "Buy signal ignored: volume {:.8} below minimum {}",
                volume,
                self.config.execution.min_order_volume
            );
            return vec![CycleEvent::EntrySkipped(format!(
                "volume {:.8} below minimum",
                volume
            ))];
        }

        let intent = self.order_intent(market, OrderSide::Buy, volume);
        let confirmation = match self.gateway.place_order(&intent) {
            Ok(confirmation) => confirmation,
            Err(e) => return vec![self.order_failed(OrderSide::Buy, volume, e)],
        };

        let entry_price = confirmation
            .fill_price
            .unwrap_or_else(|| intent.effective_price(price));
        let stop_loss = entry_price - (order_price - size.stop_loss);

        match self
            .risk
            .open_position_at(entry_price, volume, stop_loss, Some(now))
        {
            Ok(position_id) => vec![CycleEvent::Opened {
                position_id,
                volume,
                price: entry_price,
                stop_loss,
                txid: confirmation.txid,
            }],
            Err(e) => {
                tracing::error!("Confirmed buy not tracked: {}", e);
                Vec::new()
            }
        }
    }

    fn exit_all(
        &mut self,
        market: &MarketSnapshot,
        price: f64,
        reason: ExitReason,
        now: DateTime<Utc>,
    ) -> Vec<CycleEvent> {
        let open: Vec<(Uuid, f64)> = self
            .risk
            .positions()
            .iter()
            .map(|p| (p.id, p.volume))
            .collect();

        open.into_iter()
            .flat_map(|(id, volume)| self.close(market, id, volume, price, reason, now))
            .collect()
    }

    fn close(
        &mut self,
        market: &MarketSnapshot,
        id: Uuid,
        volume: f64,
        price: f64,
        reason: ExitReason,
        now: DateTime<Utc>,
    ) -> Option<CycleEvent> {
        let intent = self.order_intent(market, OrderSide::Sell, volume);
        let confirmation = match self.gateway.place_order(&intent) {
            Ok(confirmation) => confirmation,
            Err(e) => return Some(self.order_failed(OrderSide::Sell, volume, e)),
        };

        let exit_price = confirmation
            .fill_price
            .unwrap_or_else(|| intent.effective_price(price));

        match self.risk.close_position_at(id, exit_price, reason, Some(now)) {
            Ok(record) => {
                let pnl = record.pnl;
                self.analytics.record_trade(record);
                Some(CycleEvent::Closed {
                    position_id: id,
                    reason,
                    pnl,
                    txid: confirmation.txid,
                })
            }
            Err(e) => {
                tracing::error!("Confirmed exit not applied: {}", e);
                None
            }
        }
    }

    /// Best ask for buys, best bid for sells, when limit orders are enabled
    fn touch_price(&self, market: &MarketSnapshot, side: OrderSide) -> Option<f64> {
        if !self.config.execution.use_limit_orders {
            return None;
        }
        match side {
            OrderSide::Buy => market.order_book.best_ask(),
            OrderSide::Sell => market.order_book.best_bid(),
        }
    }

    /// Market order, or a limit at the touch when limit orders are enabled
    fn order_intent(&self, market: &MarketSnapshot, side: OrderSide, volume: f64) -> OrderIntent {
        let symbol = &self.config.pair.symbol;

        match self.touch_price(market, side) {
            Some(limit_price) => OrderIntent::limit(symbol, side, volume, limit_price),
            None => OrderIntent::market(symbol, side, volume),
        }
    }

    fn order_failed(&self, side: OrderSide, volume: f64, error: ExchangeError) -> CycleEvent {
        tracing::warn!("⚠️  {:?} order for {:.8} failed: {}", side, volume, error);
        CycleEvent::OrderFailed {
            side,
            volume,
            error: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_candles::candles_from_closes;
    use crate::models::{Balance, OrderBook, OrderConfirmation, OrderKind, Ticker};

    #[derive(Default)]
    struct MockGateway {
        orders: Vec<OrderIntent>,
        reject: bool,
    }

    impl OrderGateway for MockGateway {
        fn place_order(&mut self, intent: &OrderIntent) -> Result<OrderConfirmation, ExchangeError> {
            self.orders.push(intent.clone());
            if self.reject {
                return Err(ExchangeError::Rejected("insufficient funds".to_string()));
            }
            Ok(OrderConfirmation::new(format!("TX{}", self.orders.len())))
        }
    }

    /// Thresholds that force every cycle to one direction
    fn config(direction: Direction) -> TradingConfig {
        let mut config = TradingConfig::default();
        config.analytics.enable_trade_logging = false;
        match direction {
            Direction::Bullish => {
                config.signals.buy_threshold = -100.0;
                config.signals.sell_threshold = -200.0;
            }
            Direction::Bearish => {
                config.signals.buy_threshold = 200.0;
                config.signals.sell_threshold = 100.0;
            }
            Direction::Neutral => {
                config.signals.buy_threshold = 100.0;
                config.signals.sell_threshold = -100.0;
            }
        }
        config
    }

    fn inputs(closes: &[f64], quote: f64, asset: f64) -> MarketInputs {
        let last = closes[closes.len() - 1];
        MarketInputs::new(
            candles_from_closes(closes),
            candles_from_closes(closes),
            OrderBook {
                bids: vec![(last - 0.01, 5.0)],
                asks: vec![(last + 0.01, 5.0)],
            },
            Ticker {
                last,
                high_24h: last * 1.2,
                low_24h: last * 0.8,
            },
            vec![("USDT".to_string(), quote), ("BTC".to_string(), asset)]
                .into_iter()
                .collect::<Balance>(),
        )
    }

    fn rising() -> Vec<f64> {
        (0..30).map(|i| 100.0 + i as f64).collect()
    }

    fn falling() -> Vec<f64> {
        (0..30).map(|i| 130.0 - i as f64).collect()
    }

    #[test]
    fn test_missing_input_skips_cycle() {
        let mut engine = TradingEngine::new(config(Direction::Bullish), 10000.0, MockGateway::default());
        let mut market = inputs(&rising(), 10000.0, 0.0);
        market.order_book = Err(ExchangeError::Transport("timeout".to_string()));

        let report = engine.run_cycle(market);

        assert!(matches!(report.skipped, Some(SkipReason::MissingData(_))));
        assert!(engine.gateway().orders.is_empty());
        assert!(engine.analytics().equity_curve().is_empty());
    }

    #[test]
    fn test_short_history_skips_cycle() {
        let mut engine = TradingEngine::new(config(Direction::Bullish), 10000.0, MockGateway::default());

        let report = engine.run_cycle(inputs(&rising()[..20], 10000.0, 0.0));

        assert_eq!(
            report.skipped,
            Some(SkipReason::InsufficientHistory { have: 20, need: 21 })
        );
    }

    #[test]
    fn test_bullish_cycle_opens_position() {
        let mut engine = TradingEngine::new(config(Direction::Bullish), 10000.0, MockGateway::default());

        let report = engine.run_cycle(inputs(&rising(), 10000.0, 0.0));

        assert_eq!(report.equity, Some(10000.0));
        assert!(matches!(report.events.as_slice(), [CycleEvent::Opened { .. }]));
        assert_eq!(engine.risk().positions().len(), 1);

        let order = &engine.gateway().orders[0];
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.kind, OrderKind::Market);
        // Never more than the quote balance can pay for
        assert!(order.volume * 129.0 <= 10000.0);
    }

    #[test]
    fn test_rejected_buy_leaves_state_unchanged() {
        let gateway = MockGateway {
            reject: true,
            ..Default::default()
        };
        let mut engine = TradingEngine::new(config(Direction::Bullish), 10000.0, gateway);

        let report = engine.run_cycle(inputs(&rising(), 10000.0, 0.0));

        assert!(matches!(
            report.events.as_slice(),
            [CycleEvent::OrderFailed { side: OrderSide::Buy, .. }]
        ));
        assert!(engine.risk().positions().is_empty());
    }

    #[test]
    fn test_bearish_cycle_sells_every_position() {
        let mut engine = TradingEngine::new(config(Direction::Bearish), 10000.0, MockGateway::default());
        engine.risk_mut().open_position(100.0, 1.0, 90.0).unwrap();
        engine.risk_mut().open_position(100.5, 2.0, 90.0).unwrap();

        let report = engine.run_cycle(inputs(&falling(), 9700.0, 3.0));

        let closed = report
            .events
            .iter()
            .filter(|e| matches!(e, CycleEvent::Closed { reason: ExitReason::SignalSell, .. }))
            .count();
        assert_eq!(closed, 2);
        assert!(engine.risk().positions().is_empty());
        assert_eq!(engine.analytics().trades().len(), 2);
        assert_eq!(engine.gateway().orders.len(), 2);
    }

    #[test]
    fn test_rejected_sell_keeps_position() {
        let gateway = MockGateway {
            reject: true,
            ..Default::default()
        };
        let mut engine = TradingEngine::new(config(Direction::Bearish), 10000.0, gateway);
        let id = engine.risk_mut().open_position(100.0, 1.0, 90.0).unwrap();

        engine.run_cycle(inputs(&falling(), 9900.0, 1.0));

        let position = engine.risk().position(id).unwrap();
        assert_eq!(position.volume, 1.0);
        assert!(engine.analytics().trades().is_empty());
    }

    #[test]
    fn test_limit_orders_use_the_touch() {
        let mut config = config(Direction::Bullish);
        config.execution.use_limit_orders = true;
        let mut engine = TradingEngine::new(config, 10000.0, MockGateway::default());

        engine.run_cycle(inputs(&rising(), 10000.0, 0.0));

        assert_eq!(
            engine.gateway().orders[0].kind,
            OrderKind::Limit {
                limit_price: 129.0 + 0.01
            }
        );
    }

    #[test]
    fn test_limit_buy_capped_by_quote_at_the_ask() {
        let mut config = config(Direction::Bullish);
        config.execution.use_limit_orders = true;
        let mut engine = TradingEngine::new(config, 500.0 + 10.0 * 129.0, MockGateway::default());

        // Most equity is already in the asset, so free quote caps the buy
        let report = engine.run_cycle(inputs(&rising(), 500.0, 10.0));

        let ask = 129.0 + 0.01;
        let order = &engine.gateway().orders[0];
        assert!((order.volume - 500.0 / ask).abs() < 1e-9);
        assert!(order.volume * ask <= 500.0 + 1e-9);

        let CycleEvent::Opened {
            position_id,
            price,
            stop_loss,
            ..
        } = &report.events[0]
        else {
            panic!("expected an entry, got {:?}", report.events);
        };
        assert_eq!(*price, ask);
        let position = engine.risk().position(*position_id).unwrap();
        assert_eq!(position.entry_price, ask);
        assert!(position.stop_loss < ask);
        assert_eq!(position.stop_loss, *stop_loss);
    }

    #[test]
    fn test_entry_uses_reported_fill_price() {
        struct FillingGateway;

        impl OrderGateway for FillingGateway {
            fn place_order(
                &mut self,
                _intent: &OrderIntent,
            ) -> Result<OrderConfirmation, ExchangeError> {
                Ok(OrderConfirmation::new("FILL").filled_at(129.5))
            }
        }

        let mut engine = TradingEngine::new(config(Direction::Bullish), 10000.0, FillingGateway);
        engine.run_cycle(inputs(&rising(), 10000.0, 0.0));

        let position = &engine.risk().positions()[0];
        assert_eq!(position.entry_price, 129.5);
    }

    #[test]
    fn test_neutral_cycle_only_tracks_equity() {
        let mut engine = TradingEngine::new(config(Direction::Neutral), 10000.0, MockGateway::default());

        let report = engine.run_cycle(inputs(&rising(), 9000.0, 10.0));

        assert_eq!(report.equity, Some(9000.0 + 10.0 * 129.0));
        assert!(report.events.is_empty());
        assert_eq!(engine.analytics().equity_curve().len(), 1);
    }
}
