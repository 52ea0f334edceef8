use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::record::TradeRecord;

/// Share of trades with positive P&L
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }

    let wins = trades.iter().filter(|t| t.is_win()).count();
    wins as f64 / trades.len() as f64
}

/// Gross profit over gross loss
///
/// Infinite with wins and no losses, zero with no trades.
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    let gross_profit: f64 = trades.iter().map(|t| t.pnl).filter(|&p| p > 0.0).sum();
    let gross_loss: f64 = trades
        .iter()
        .map(|t| t.pnl)
        .filter(|&p| p < 0.0)
        .sum::<f64>()
        .abs();

    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Annualized Sharpe ratio over per-trade fractional returns
///
/// Uses the population standard deviation. None with fewer than two trades
/// or zero variance.
pub fn sharpe_ratio(
    trades: &[TradeRecord],
    risk_free_rate: f64,
    periods_per_year: f64,
) -> Option<f64> {
    if trades.len() < 2 {
        return None;
    }

    let returns: Vec<f64> = trades.iter().map(|t| t.pnl_pct).collect();
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns
        .iter()
        .map(|r| {
            let diff = r - mean;
            diff * diff
        })
        .sum::<f64>()
        / returns.len() as f64;
    let std_dev = variance.sqrt();

    if std_dev == 0.0 {
        return None;
    }

    Some((mean - risk_free_rate / periods_per_year) / std_dev * periods_per_year.sqrt())
}

/// Largest peak-to-trough decline of an equity series, as a fraction
pub fn max_drawdown(equity: &[f64]) -> f64 {
    if equity.len() < 2 {
        return 0.0;
    }

    let mut peak = equity[0];
    let mut max_dd = 0.0;

    for &value in equity {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let drawdown = (peak - value) / peak;
            if drawdown > max_dd {
                max_dd = drawdown;
            }
        }
    }

    max_dd
}

/// Mean holding time in seconds
pub fn average_duration_secs(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }

    trades.iter().map(|t| t.duration_secs).sum::<f64>() / trades.len() as f64
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub avg_pnl: f64,
}

/// Trades closed on `date` (UTC); None when there were none
pub fn daily_summary(trades: &[TradeRecord], date: NaiveDate) -> Option<DailySummary> {
    let daily: Vec<&TradeRecord> = trades
        .iter()
        .filter(|t| t.exit_time.date_naive() == date)
        .collect();

    if daily.is_empty() {
        return None;
    }

    let total_pnl: f64 = daily.iter().map(|t| t.pnl).sum();
    let winning = daily.iter().filter(|t| t.is_win()).count();

    Some(DailySummary {
        date,
        total_trades: daily.len(),
        winning_trades: winning,
        losing_trades: daily.len() - winning,
        win_rate: winning as f64 / daily.len() as f64,
        total_pnl,
        avg_pnl: total_pnl / daily.len() as f64,
    })
}

/// Aggregate performance over a trade log and equity series
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceSummary {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub sharpe_ratio: Option<f64>,
    pub max_drawdown: f64,
    pub total_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub avg_duration_secs: f64,
}

impl PerformanceSummary {
    pub fn calculate(
        trades: &[TradeRecord],
        equity: &[f64],
        risk_free_rate: f64,
        periods_per_year: f64,
    ) -> Self {
        let wins: Vec<f64> = trades.iter().filter(|t| t.is_win()).map(|t| t.pnl).collect();
        let losses: Vec<f64> = trades.iter().filter(|t| !t.is_win()).map(|t| t.pnl).collect();

        Self {
            total_trades: trades.len(),
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            sharpe_ratio: sharpe_ratio(trades, risk_free_rate, periods_per_year),
            max_drawdown: max_drawdown(equity),
            total_pnl: trades.iter().map(|t| t.pnl).sum(),
            avg_win: mean(&wins),
            avg_loss: mean(&losses),
            avg_duration_secs: average_duration_secs(trades),
        }
    }

    /// Print a formatted report to stdout
    pub fn print_report(&self) {
        if self.total_trades == 0 {
            println!("\n📊 No trades recorded yet.");
            return;
        }

        println!("\n══════════════════════════════════════════════════════");
        println!("                 PERFORMANCE SUMMARY");
        println!("══════════════════════════════════════════════════════\n");

        println!("📈 TRADE STATISTICS");
        println!("  Total Trades:          {}", self.total_trades);
        println!(
            "  Winning Trades:        {} ({:.2}%)",
            self.winning_trades,
            self.win_rate * 100.0
        );
        println!("  Losing Trades:         {}", self.losing_trades);

        println!("\n💰 WIN/LOSS ANALYSIS");
        println!("  Total P&L:             ${:.2}", self.total_pnl);
        println!("  Average Win:           ${:.2}", self.avg_win);
        println!("  Average Loss:          ${:.2}", self.avg_loss);
        println!("  Profit Factor:         {:.2}", self.profit_factor);

        println!("\n⚠️  RISK METRICS");
        println!("  Max Drawdown:          {:.2}%", self.max_drawdown * 100.0);
        match self.sharpe_ratio {
            Some(sharpe) => println!("  Sharpe Ratio:          {:.2}", sharpe),
            None => println!("  Sharpe Ratio:          N/A"),
        }

        println!("\n⏱️  HOLDING PERIODS");
        println!(
            "  Average:               {:.1} minutes",
            self.avg_duration_secs / 60.0
        );

        println!("\n══════════════════════════════════════════════════════\n");
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::ExitReason;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn trade(pnl: f64, day: u32, holding_minutes: i64) -> TradeRecord {
        let entry_time = Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap();
        TradeRecord {
            position_id: Uuid::new_v4(),
            entry_time,
            exit_time: entry_time + Duration::minutes(holding_minutes),
            entry_price: 100.0,
            exit_price: 100.0 + pnl,
            volume: 1.0,
            pnl,
            pnl_pct: pnl / 100.0,
            duration_secs: holding_minutes as f64 * 60.0,
            exit_reason: ExitReason::Manual,
            profit_targets_hit: Vec::new(),
        }
    }

    #[test]
    fn test_win_rate() {
        let trades = vec![trade(100.0, 1, 60), trade(-50.0, 1, 60)];
        assert_eq!(win_rate(&trades), 0.5);
        assert_eq!(win_rate(&[]), 0.0);
    }

    #[test]
    fn test_profit_factor() {
        assert_eq!(profit_factor(&[trade(200.0, 1, 60), trade(-100.0, 1, 60)]), 2.0);
        assert_eq!(profit_factor(&[trade(50.0, 1, 60)]), f64::INFINITY);
        assert_eq!(profit_factor(&[]), 0.0);
    }

    #[test]
    fn test_sharpe_ratio() {
        assert_eq!(sharpe_ratio(&[trade(1.0, 1, 60)], 0.02, 252.0), None);
        assert_eq!(
            sharpe_ratio(&[trade(1.0, 1, 60), trade(1.0, 2, 60)], 0.02, 252.0),
            None
        );

        // returns 0.02 and 0.0: mean 0.01, population std 0.01
        let trades = vec![trade(2.0, 1, 60), trade(0.0, 2, 60)];
        let sharpe = sharpe_ratio(&trades, 0.0, 252.0).unwrap();
        assert!((sharpe - 252f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_max_drawdown() {
        assert_eq!(max_drawdown(&[10000.0]), 0.0);
        let dd = max_drawdown(&[10000.0, 11000.0, 10500.0, 9900.0, 10800.0]);
        assert!((dd - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_daily_summary() {
        let trades = vec![
            trade(100.0, 1, 60),
            trade(-40.0, 1, 30),
            trade(10.0, 2, 60),
        ];
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let summary = daily_summary(&trades, date).unwrap();
        assert_eq!(summary.total_trades, 2);
        assert_eq!(summary.winning_trades, 1);
        assert_eq!(summary.total_pnl, 60.0);
        assert_eq!(summary.avg_pnl, 30.0);

        let empty = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(daily_summary(&trades, empty), None);
    }

    #[test]
    fn test_performance_summary() {
        let trades = vec![
            trade(100.0, 1, 60),
            trade(50.0, 1, 120),
            trade(-30.0, 1, 90),
        ];
        let summary = PerformanceSummary::calculate(&trades, &[], 0.02, 252.0);

        assert_eq!(summary.total_trades, 3);
        assert_eq!(summary.winning_trades, 2);
        assert_eq!(summary.losing_trades, 1);
        assert!((summary.total_pnl - 120.0).abs() < 1e-9);
        assert_eq!(summary.avg_win, 75.0);
        assert_eq!(summary.avg_loss, -30.0);
        assert_eq!(summary.avg_duration_secs, 5400.0);
        assert_eq!(summary.max_drawdown, 0.0);
        assert!(summary.sharpe_ratio.is_some());
    }
}
