use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::config::RiskConfig;

/// Profit-taking tier, serialized as "1" / "2" / "3"
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProfitTier {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
}

impl ProfitTier {
    /// Highest tier first
    pub const DESCENDING: [ProfitTier; 3] = [ProfitTier::Three, ProfitTier::Two, ProfitTier::One];

    /// `(target profit fraction, share of current volume to exit)`
    pub fn params(&self, config: &RiskConfig) -> (f64, f64) {
        match self {
            ProfitTier::One => (config.profit_target_1, config.profit_target_1_size),
            ProfitTier::Two => (config.profit_target_2, config.profit_target_2_size),
            ProfitTier::Three => (config.profit_target_3, config.profit_target_3_size),
        }
    }

    pub fn exit_reason(&self) -> ExitReason {
        match self {
            ProfitTier::One => ExitReason::Target1,
            ProfitTier::Two => ExitReason::Target2,
            ProfitTier::Three => ExitReason::Target3,
        }
    }
}

impl fmt::Display for ProfitTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProfitTier::One => "1",
            ProfitTier::Two => "2",
            ProfitTier::Three => "3",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    #[serde(rename = "target_1")]
    Target1,
    #[serde(rename = "target_2")]
    Target2,
    #[serde(rename = "target_3")]
    Target3,
    /// Bearish decision signal
    SignalSell,
    Manual,
}

impl ExitReason {
    /// Profit tier a target exit belongs to
    pub fn tier(&self) -> Option<ProfitTier> {
        match self {
            ExitReason::Target1 => Some(ProfitTier::One),
            ExitReason::Target2 => Some(ProfitTier::Two),
            ExitReason::Target3 => Some(ProfitTier::Three),
            _ => None,
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::Target1 => "target_1",
            ExitReason::Target2 => "target_2",
            ExitReason::Target3 => "target_3",
            ExitReason::SignalSell => "signal_sell",
            ExitReason::Manual => "manual",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Breakeven,
    Trailing,
}

/// What the lifecycle asks the caller to do this cycle
///
/// Stop moves are already applied to the position. Exits are requests:
/// volume and the tier hit-set only change once the order is confirmed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionAction {
    Hold,
    StopUpdated { reason: StopReason, stop_loss: f64 },
    PartialExit { tier: ProfitTier, volume: f64 },
    FullExit { volume: f64, reason: ExitReason },
}

/// Open long position with a multi-stage exit plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub id: Uuid,
    pub entry_price: f64,
    /// Shrinks as partial exits are confirmed
    pub volume: f64,
    pub initial_volume: f64,
    pub stop_loss: f64,
    pub highest_price: f64,
    pub profit_targets_hit: Vec<ProfitTier>,
    pub entry_time: DateTime<Utc>,
    pub breakeven_set: bool,
    pub trailing_active: bool,
}

impl Position {
    pub fn new(entry_price: f64, volume: f64, stop_loss: f64, entry_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            entry_price,
            volume,
            initial_volume: volume,
            stop_loss,
            highest_price: entry_price,
            profit_targets_hit: Vec::new(),
            entry_time,
            breakeven_set: false,
            trailing_active: false,
        }
    }

    pub fn profit_pct(&self, price: f64) -> f64 {
        (price - self.entry_price) / self.entry_price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.volume
    }

    pub fn has_hit(&self, tier: ProfitTier) -> bool {
        self.profit_targets_hit.contains(&tier)
    }

    /// Run one lifecycle step at `price`
    ///
    /// Priority: stop-loss, breakeven, highest unhit profit tier, trailing
    /// stop, hold. At most one action fires per call.
    pub fn evaluate(&mut self, price: f64, config: &RiskConfig) -> PositionAction {
        let profit_pct = self.profit_pct(price);

        if price > self.highest_price {
            self.highest_price = price;
        }

        if price <= self.stop_loss {
            return PositionAction::FullExit {
                volume: self.volume,
                reason: ExitReason::StopLoss,
            };
        }

        if !self.breakeven_set && profit_pct >= config.breakeven_trigger {
            self.raise_stop(self.entry_price);
            self.breakeven_set = true;
            return PositionAction::StopUpdated {
                reason: StopReason::Breakeven,
                stop_loss: self.stop_loss,
            };
        }

        for tier in ProfitTier::DESCENDING {
            let (target, size) = tier.params(config);
            if profit_pct >= target && !self.has_hit(tier) {
                let volume = self.volume * size;
                if volume >= self.volume {
                    return PositionAction::FullExit {
                        volume: self.volume,
                        reason: tier.exit_reason(),
                    };
                }
                return PositionAction::PartialExit { tier, volume };
            }
        }

        if self.trailing_active {
            let trailing_stop = self.highest_price * (1.0 - config.trailing_distance);
            if trailing_stop > self.stop_loss {
                self.stop_loss = trailing_stop;
                return PositionAction::StopUpdated {
                    reason: StopReason::Trailing,
                    stop_loss: trailing_stop,
                };
            }
        }

        PositionAction::Hold
    }

    /// Record a confirmed partial exit
    pub(crate) fn apply_partial_exit(&mut self, tier: ProfitTier, volume: f64) {
        self.volume = (self.volume - volume).max(0.0);
        if !self.has_hit(tier) {
            self.profit_targets_hit.push(tier);
        }
        if tier == ProfitTier::One {
            self.trailing_active = true;
        }
    }

    fn raise_stop(&mut self, stop: f64) {
        self.stop_loss = self.stop_loss.max(stop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position() -> Position {
        Position::new(50000.0, 0.1, 49800.0, Utc::now())
    }

    #[test]
    fn test_stop_loss_takes_priority() {
        let mut pos = position();
        let action = pos.evaluate(49800.0, &RiskConfig::default());

        assert_eq!(
            action,
            PositionAction::FullExit {
                volume: 0.1,
                reason: ExitReason::StopLoss
            }
        );
    }

    #[test]
    fn test_breakeven_fires_before_targets() {
        let mut pos = position();
        // +6% clears every target but breakeven still goes first
        let action = pos.evaluate(53000.0, &RiskConfig::default());

        assert_eq!(
            action,
            PositionAction::StopUpdated {
                reason: StopReason::Breakeven,
                stop_loss: 50000.0
            }
        );
        assert!(pos.breakeven_set);
        assert_eq!(pos.highest_price, 53000.0);
    }

    #[test]
    fn test_highest_tier_fires_first() {
        let config = RiskConfig::default();
        let mut pos = position();
        pos.breakeven_set = true;

        // Tier 3 exits the full remainder
        assert_eq!(
            pos.evaluate(52600.0, &config),
            PositionAction::FullExit {
                volume: 0.1,
                reason: ExitReason::Target3
            }
        );

        // Tier 2 only fires once tier 3 is out of reach
        let mut pos = position();
        pos.breakeven_set = true;
        assert_eq!(
            pos.evaluate(51800.0, &config),
            PositionAction::PartialExit {
                tier: ProfitTier::Two,
                volume: 0.05
            }
        );
    }

    #[test]
    fn test_exit_request_does_not_mutate_volume() {
        let mut pos = position();
        pos.breakeven_set = true;

        let action = pos.evaluate(51200.0, &RiskConfig::default());

        assert!(matches!(action, PositionAction::PartialExit { tier: ProfitTier::One, .. }));
        assert_eq!(pos.volume, 0.1);
        assert!(pos.profit_targets_hit.is_empty());
        assert!(!pos.trailing_active);
    }

    #[test]
    fn test_unrealized_pnl_tracks_remaining_volume() {
        let mut pos = position();
        assert!((pos.unrealized_pnl(51000.0) - 100.0).abs() < 1e-9);

        pos.volume = 0.05;
        assert!((pos.unrealized_pnl(49000.0) + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_trailing_stop_only_raises() {
        let config = RiskConfig::default();
        let mut pos = position();
        pos.breakeven_set = true;
        pos.stop_loss = 50000.0;
        pos.apply_partial_exit(ProfitTier::One, 0.05);

        // Tier 2 needs +3.5%, so 51500 only moves the trailing stop
        let action = pos.evaluate(51500.0, &config);
        assert_eq!(
            action,
            PositionAction::StopUpdated {
                reason: StopReason::Trailing,
                stop_loss: 51500.0 * (1.0 - 0.01)
            }
        );

        // A pullback leaves the stop where it was
        assert_eq!(pos.evaluate(51100.0, &config), PositionAction::Hold);
        assert_eq!(pos.stop_loss, 51500.0 * (1.0 - 0.01));
    }

    #[test]
    fn test_tier_serialization() {
        let json = serde_json::to_string(&vec![ProfitTier::One, ProfitTier::Three]).unwrap();
        assert_eq!(json, r#"["1","3"]"#);
        assert_eq!(serde_json::to_string(&ExitReason::Target2).unwrap(), r#""target_2""#);
        assert_eq!(ExitReason::SignalSell.to_string(), "signal_sell");
    }
}
