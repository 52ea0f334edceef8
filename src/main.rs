use chrono::Utc;
use clap::Parser;
use tokio::time::Duration;

use tradecore::config::TradingConfig;
use tradecore::execution::{CycleEvent, TradingEngine};
use tradecore::paper::{MarketScenario, PaperExchange, SyntheticMarket};

const HISTORY: usize = 200;
const TREND_FACTOR: usize = 3;

#[derive(Parser, Debug)]
#[command(name = "tradecore", about = "Paper-trade the confluence strategy on a synthetic market")]
struct Args {
    /// TOML configuration file (defaults are used when absent)
    #[arg(short, long)]
    config: Option<String>,

    /// Seed for the synthetic market
    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, value_enum, default_value = "uptrend")]
    scenario: MarketScenario,

    /// Number of decision cycles to run
    #[arg(long, default_value_t = 500)]
    cycles: usize,

    /// Starting quote currency balance
    #[arg(long, default_value_t = 10_000.0)]
    initial_balance: f64,

    #[arg(long, default_value_t = 50_000.0)]
    start_price: f64,

    /// Minutes per primary candle
    #[arg(long, default_value_t = 5)]
    candle_minutes: i64,

    /// Wall-clock pause between cycles; overrides the configured interval
    #[arg(long)]
    interval_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let args = Args::parse();
    let config = TradingConfig::load(args.config.as_deref())?;

    tracing::info!(
        "🚀 tradecore paper trading {} ({:?}, seed {})",
        config.pair.symbol,
        args.scenario,
        args.seed
    );

    let start_time = Utc::now()
        - chrono::Duration::minutes(args.candle_minutes * (HISTORY * TREND_FACTOR) as i64);
    let mut market = SyntheticMarket::new(
        args.seed,
        args.scenario,
        args.start_price,
        args.candle_minutes,
        start_time,
    );
    market.generate(HISTORY * TREND_FACTOR);

    let exchange = PaperExchange::new(market, config.pair.clone(), args.initial_balance)
        .with_history(HISTORY)
        .with_trend_factor(TREND_FACTOR);

    let period = args
        .interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_secs(config.execution.cycle_interval_secs))
        .max(Duration::from_millis(1));

    let mut engine = TradingEngine::new(config, args.initial_balance, exchange);
    let mut ticker = tokio::time::interval(period);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tracing::info!("  💹 {} cycles, one every {:?}", args.cycles, period);
    tracing::info!("Press Ctrl+C to stop...");

    for cycle in 1..=args.cycles {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("⚠️  Received Ctrl+C, shutting down...");
                break;
            }
            _ = ticker.tick() => {}
        }

        engine.gateway_mut().advance();
        let now = engine
            .gateway()
            .market()
            .candles()
            .last()
            .map(|c| c.timestamp)
            .unwrap_or_else(Utc::now);
        let inputs = engine.gateway_mut().market_inputs();
        let report = engine.run_cycle_at(inputs, now);

        for event in &report.events {
            log_event(event);
        }

        if cycle % 50 == 0 {
            tracing::info!(
                "Cycle {}: price ${:.2}, equity ${:.2}, {} open positions",
                cycle,
                report.price.unwrap_or_default(),
                report.equity.unwrap_or_default(),
                engine.risk().positions().len()
            );
        }
    }

    engine.analytics().summary().print_report();

    let stats = engine.risk().statistics();
    println!("🛡️  RISK STATE");
    println!("  Closed Trades:         {}", stats.total_trades);
    println!("  Current Equity:        ${:.2}", stats.current_equity);
    println!("  ROI:                   {:.2}%", stats.roi * 100.0);
    println!("  Max Drawdown:          {:.2}%", stats.max_drawdown * 100.0);
    println!(
        "  Circuit Breaker:       {}",
        if engine.risk().is_circuit_breaker_active() {
            "TRIPPED"
        } else {
            "ok"
        }
    );
    println!("  Open Positions:        {}", engine.risk().positions().len());
    println!(
        "  Paper Fills:           {} (mark-to-market ${:.2})\n",
        engine.gateway().fills().len(),
        engine.gateway().equity()
    );

    tracing::info!("👋 tradecore stopped");
    Ok(())
}

fn log_event(event: &CycleEvent) {
    match event {
        CycleEvent::Opened {
            volume,
            price,
            stop_loss,
            ..
        } => tracing::info!(
            "📈 Opened {:.6} @ ${:.2} (stop ${:.2})",
            volume,
            price,
            stop_loss
        ),
        CycleEvent::PartialExit { tier, volume, .. } => {
            tracing::info!("💰 {:?} took {:.6}", tier, volume)
        }
        CycleEvent::Closed { reason, pnl, .. } => {
            tracing::info!("✅ Closed ({:?}) P&L ${:.2}", reason, pnl)
        }
        CycleEvent::StopMoved { stop_loss, .. } => {
            tracing::debug!("Stop moved to ${:.2}", stop_loss)
        }
        CycleEvent::OrderFailed { side, error, .. } => {
            tracing::warn!("❌ {:?} order failed: {}", side, error)
        }
        CycleEvent::EntrySkipped(reason) => tracing::debug!("Entry skipped: {}", reason),
    }
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tradecore=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
