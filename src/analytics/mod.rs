// Trade analytics: append-only trade log, equity series, performance metrics
pub mod metrics;
pub mod record;

pub use metrics::{
    average_duration_secs, daily_summary, max_drawdown, profit_factor, sharpe_ratio, win_rate,
    DailySummary, PerformanceSummary,
};
pub use record::{EquityPoint, TradeRecord};

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

use crate::config::AnalyticsConfig;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("trade log I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed log record on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Owns the closed-trade history and equity series for one instrument
pub struct TradeAnalytics {
    config: AnalyticsConfig,
    trades: Vec<TradeRecord>,
    equity_curve: Vec<EquityPoint>,
}

impl TradeAnalytics {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self {
            config,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    /// Rebuild analytics from a JSONL trade log and an optional equity log
    pub fn replay(
        config: AnalyticsConfig,
        trade_log: &Path,
        equity_log: Option<&Path>,
    ) -> Result<Self, AnalyticsError> {
        let trades = read_jsonl(trade_log)?;
        let equity_curve = match equity_log {
            Some(path) if path.exists() => read_jsonl(path)?,
            _ => Vec::new(),
        };

        tracing::info!(
            "Replayed {} trades and {} equity points from {}",
            trades.len(),
            equity_curve.len(),
            trade_log.display()
        );

        Ok(Self {
            config,
            trades,
            equity_curve,
        })
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// Store a closed trade and append it to the trade log
    ///
    /// A failed write is logged and otherwise ignored.
    pub fn record_trade(&mut self, trade: TradeRecord) {
        if self.config.enable_trade_logging {
            if let Err(e) = append_jsonl(&self.config.trade_log_path, &trade) {
                tracing::warn!("Failed to write trade log: {}", e);
            }
        }

        tracing::info!(
            "📝 Trade closed: {} @ ${:.2} -> ${:.2}, P&L ${:.2} ({:+.2}%)",
            trade.exit_reason,
            trade.entry_price,
            trade.exit_price,
            trade.pnl,
            trade.pnl_pct * 100.0
        );

        self.trades.push(trade);
    }

    pub fn record_equity(&mut self, equity: f64, timestamp: DateTime<Utc>) {
        let point = EquityPoint { timestamp, equity };

        if self.config.enable_trade_logging {
            if let Err(e) = append_jsonl(&self.config.equity_log_path, &point) {
                tracing::warn!("Failed to write equity log: {}", e);
            }
        }

        self.equity_curve.push(point);
    }

    pub fn win_rate(&self) -> f64 {
        win_rate(&self.trades)
    }

    pub fn profit_factor(&self) -> f64 {
        profit_factor(&self.trades)
    }

    pub fn sharpe_ratio(&self) -> Option<f64> {
        sharpe_ratio(
            &self.trades,
            self.config.risk_free_rate,
            self.config.periods_per_year,
        )
    }

    pub fn max_drawdown(&self) -> f64 {
        max_drawdown(&self.equity_values())
    }

    pub fn average_duration_secs(&self) -> f64 {
        average_duration_secs(&self.trades)
    }

    pub fn daily_summary(&self, date: NaiveDate) -> Option<DailySummary> {
        daily_summary(&self.trades, date)
    }

    pub fn summary(&self) -> PerformanceSummary {
        PerformanceSummary::calculate(
            &self.trades,
            &self.equity_values(),
            self.config.risk_free_rate,
            self.config.periods_per_year,
        )
    }

    /// Write the trade history as CSV
    pub fn export_csv(&self, path: &Path) -> Result<(), AnalyticsError> {
        let mut wtr = csv::Writer::from_path(path)?;

        wtr.write_record([
            "position_id",
            "entry_time",
            "exit_time",
            "entry_price",
            "exit_price",
            "volume",
            "pnl",
            "pnl_pct",
            "duration_secs",
            "exit_reason",
            "profit_targets_hit",
        ])?;

        for t in &self.trades {
            let tiers: Vec<String> = t.profit_targets_hit.iter().map(|p| p.to_string()).collect();
            wtr.write_record([
                &t.position_id.to_string(),
                &t.entry_time.to_rfc3339(),
                &t.exit_time.to_rfc3339(),
                &format!("{:.8}", t.entry_price),
                &format!("{:.8}", t.exit_price),
                &format!("{:.8}", t.volume),
                &format!("{:.2}", t.pnl),
                &format!("{:.6}", t.pnl_pct),
                &format!("{:.0}", t.duration_secs),
                &t.exit_reason.to_string(),
                &tiers.join(";"),
            ])?;
        }

        wtr.flush()?;
        tracing::info!(
            "Exported {} trades to {}",
            self.trades.len(),
            path.display()
        );
        Ok(())
    }

    fn equity_values(&self) -> Vec<f64> {
        self.equity_curve.iter().map(|p| p.equity).collect()
    }
}

fn append_jsonl<T: Serialize>(path: &Path, record: &T) -> Result<(), AnalyticsError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }

    let line = serde_json::to_string(record).map_err(|source| AnalyticsError::Json {
        line: 0,
        source,
    })?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, AnalyticsError> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| AnalyticsError::Json {
            line: i + 1,
            source,
        })?;
        records.push(record);
    }

    Ok(records)
}
