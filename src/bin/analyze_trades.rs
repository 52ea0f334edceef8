use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;

use tradecore::analytics::TradeAnalytics;
use tradecore::config::TradingConfig;

#[derive(Parser, Debug)]
#[command(name = "analyze_trades", about = "Replay a trade log and report performance")]
struct Args {
    /// TOML configuration file; supplies log paths and Sharpe parameters
    #[arg(short, long)]
    config: Option<String>,

    /// Trade log (JSON lines); defaults to the configured path
    #[arg(long)]
    trades: Option<PathBuf>,

    /// Equity log (JSON lines); defaults to the configured path
    #[arg(long)]
    equity: Option<PathBuf>,

    /// Write the trade history to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Also summarize trades closed on this UTC date (YYYY-MM-DD)
    #[arg(long)]
    date: Option<NaiveDate>,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter("tradecore=warn")
        .init();

    let args = Args::parse();
    let config = TradingConfig::load(args.config.as_deref())?;

    let trade_log = args
        .trades
        .unwrap_or_else(|| config.analytics.trade_log_path.clone());
    let equity_log = args
        .equity
        .unwrap_or_else(|| config.analytics.equity_log_path.clone());

    let analytics = TradeAnalytics::replay(config.analytics, &trade_log, Some(equity_log.as_path()))
        .with_context(|| format!("failed to replay {}", trade_log.display()))?;

    println!("\n═══════════════════════════════════════════════════════");
    println!("         TRADE ANALYSIS: {}", trade_log.display());
    println!("═══════════════════════════════════════════════════════");
    println!(
        "  {} trades, {} equity points",
        analytics.trades().len(),
        analytics.equity_curve().len()
    );

    analytics.summary().print_report();

    if let Some(date) = args.date {
        match analytics.daily_summary(date) {
            Some(day) => {
                println!("📅 {}", day.date);
                println!(
                    "  Trades:                {} ({} won, {} lost)",
                    day.total_trades, day.winning_trades, day.losing_trades
                );
                println!("  Win Rate:              {:.2}%", day.win_rate * 100.0);
                println!("  Total P&L:             ${:.2}", day.total_pnl);
                println!("  Average P&L:           ${:.2}\n", day.avg_pnl);
            }
            None => println!("📅 No trades closed on {}\n", date),
        }
    }

    if let Some(path) = args.csv {
        analytics
            .export_csv(&path)
            .with_context(|| format!("failed to export {}", path.display()))?;
        println!("✅ Exported trades to {}", path.display());
    }

    Ok(())
}
