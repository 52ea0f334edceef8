use chrono::{Duration, TimeZone, Utc};
use quickcheck_macros::quickcheck;
use tradecore::config::RiskConfig;
use tradecore::indicators::{calculate_atr, calculate_rsi, calculate_sma, cluster_levels};
use tradecore::risk::{PositionAction, RiskManager};
use tradecore::Candle;

/// Map raw quickcheck values to prices in 50.0..150.0
fn prices(raw: &[u16]) -> Vec<f64> {
    raw.iter().map(|&x| 50.0 + (x % 1000) as f64 / 10.0).collect()
}

fn scale(k: u8) -> f64 {
    0.5 + (k % 20) as f64 / 2.0
}

fn candles(closes: &[f64], spread: f64) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            timestamp: start + Duration::minutes(5 * i as i64),
            open: close,
            high: close + spread,
            low: close - spread,
            close,
            vwap: close,
            volume: 1.0,
            trade_count: 1,
        })
        .collect()
}

fn close_enough(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

#[quickcheck]
fn sma_scales_with_prices(raw: Vec<u16>, k: u8) -> bool {
    let p = prices(&raw);
    let k = scale(k);
    let scaled: Vec<f64> = p.iter().map(|x| x * k).collect();

    match (calculate_sma(&p, 10), calculate_sma(&scaled, 10)) {
        (Some(a), Some(b)) => close_enough(a * k, b),
        (None, None) => p.len() < 10,
        _ => false,
    }
}

#[quickcheck]
fn rsi_is_bounded_and_scale_invariant(raw: Vec<u16>, k: u8) -> bool {
    let p = prices(&raw);
    let k = scale(k);
    let scaled: Vec<f64> = p.iter().map(|x| x * k).collect();

    match (calculate_rsi(&p, 14), calculate_rsi(&scaled, 14)) {
        (Some(a), Some(b)) => (0.0..=100.0).contains(&a) && (a - b).abs() < 1e-6,
        (None, None) => p.len() < 15,
        _ => false,
    }
}

#[quickcheck]
fn atr_scales_with_prices(raw: Vec<u16>, k: u8) -> bool {
    let p = prices(&raw);
    let k = scale(k);
    let scaled: Vec<f64> = p.iter().map(|x| x * k).collect();

    let base = calculate_atr(&candles(&p, 0.5), 14);
    let stretched = calculate_atr(&candles(&scaled, 0.5 * k), 14);

    match (base, stretched) {
        (Some(a), Some(b)) => a >= 0.0 && close_enough(a * k, b),
        (None, None) => p.len() < 15,
        _ => false,
    }
}

#[quickcheck]
fn clustering_is_idempotent(raw: Vec<u16>) -> bool {
    let levels = prices(&raw);
    let once = cluster_levels(&levels, 0.01);
    let twice = cluster_levels(&once, 0.01);

    once == twice && once.windows(2).all(|w| w[0] < w[1])
}

#[quickcheck]
fn position_volume_shrinks_and_stop_ratchets(raw: Vec<u16>) -> bool {
    let mut risk = RiskManager::new(RiskConfig::default(), 10000.0);
    let Ok(id) = risk.open_position(100.0, 1.0, 97.0) else {
        return false;
    };

    // Prices in 95.0..110.0
    let path: Vec<f64> = raw.iter().map(|&x| 95.0 + (x % 150) as f64 / 10.0).collect();
    let mut last_volume = 1.0;
    let mut last_stop = 97.0;

    for price in path {
        let Ok(action) = risk.evaluate_position(id, price) else {
            return false;
        };

        match action {
            PositionAction::PartialExit { tier, volume } => {
                if risk.apply_partial_exit(id, tier, volume).is_err() {
                    return false;
                }
            }
            PositionAction::FullExit { reason, .. } => {
                return risk.close_position(id, price, reason).is_ok()
                    && risk.positions().is_empty();
            }
            PositionAction::Hold | PositionAction::StopUpdated { .. } => {}
        }

        let Some(position) = risk.position(id) else {
            return false;
        };
        if position.volume > last_volume || position.stop_loss < last_stop {
            return false;
        }
        last_volume = position.volume;
        last_stop = position.stop_loss;
    }

    true
}

#[quickcheck]
fn circuit_breaker_latches(raw: Vec<u16>) -> bool {
    let mut risk = RiskManager::new(RiskConfig::default(), 10000.0);
    let mut tripped = false;
    let mut max_drawdown = 0.0;

    // Equity in 9000.0..11000.0
    for equity in raw.iter().map(|&x| 9000.0 + (x % 2000) as f64) {
        risk.update_equity(equity);

        let active = risk.is_circuit_breaker_active();
        if tripped && !active {
            return false;
        }
        tripped = active;

        let drawdown = risk.state().equity.max_drawdown;
        if drawdown < max_drawdown {
            return false;
        }
        max_drawdown = drawdown;
    }

    tripped == (max_drawdown >= 0.05)
}
