use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use backtest::{BacktestConfig, BacktestRequest, BacktestService, Backtester};
use common::{Config, RiskEvent, TradingMode};
use engine::{Engine, OrderExecutor, Scheduler, Throttle, TradingSession};
use paper::{CsvCandleProvider, PaperSink, ReplayCandleProvider};
use risk::{KillSwitch, RiskConfig, RiskGate};
use strategy::{StrategyConfig, StrategyFileConfig, StrategyRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("invalid environment configuration")?;
    info!(mode = %cfg.trading_mode, "TradeBot starting");

    let strategy_file = StrategyFileConfig::load(&cfg.strategy_config_path)?;
    let entries: Vec<&StrategyConfig> = strategy_file.enabled().collect();
    if entries.is_empty() {
        warn!(path = %cfg.strategy_config_path, "No enabled strategies configured");
        return Ok(());
    }

    // ── Strategy registry / risk gate ─────────────────────────────────────────
    let registry = StrategyRegistry::builtin();
    let kill_switch = KillSwitch::in_memory();
    let gate = RiskGate::new(RiskConfig::from_config(&cfg), kill_switch);

    match cfg.trading_mode {
        TradingMode::Backtest => run_backtests(&cfg, &entries, registry, gate).await,
        TradingMode::Paper => run_paper(&cfg, &entries, registry, gate).await,
    }
}

async fn run_backtests(
    cfg: &Config,
    entries: &[&StrategyConfig],
    registry: StrategyRegistry,
    gate: RiskGate,
) -> anyhow::Result<()> {
    let service = BacktestService::new(
        Arc::new(CsvCandleProvider::new(&cfg.candle_dir)),
        registry,
        Backtester::new(BacktestConfig::from_config(cfg)?, gate),
    );
    let (start, end) = backtest_window(cfg)?;

    let mut failures = 0usize;
    for entry in entries {
        let request = BacktestRequest {
            symbol: entry.symbol.clone(),
            strategy: entry.strategy_id()?,
            params: Some(entry.parameters()?),
            start,
            end,
        };
        match service.run(&request).await {
            Ok(result) => {
                info!(
                    name = %entry.name,
                    win_rate_pct = ?result.win_rate_pct(),
                    "Backtest result"
                );
                println!("{}", result.to_json()?);
            }
            Err(e) => {
                failures += 1;
                error!(name = %entry.name, symbol = %entry.symbol, error = %e, "Backtest failed");
            }
        }
    }
    if failures > 0 {
        anyhow::bail!("{failures} of {} backtests failed", entries.len());
    }
    Ok(())
}

fn backtest_window(cfg: &Config) -> anyhow::Result<(NaiveDateTime, NaiveDateTime)> {
    let first = NaiveDate::from_ymd_opt(1970, 1, 1).context("invalid default start date")?;
    let last = NaiveDate::from_ymd_opt(9999, 12, 31).context("invalid default end date")?;
    let start = cfg
        .backtest_start
        .unwrap_or(first)
        .and_hms_opt(0, 0, 0)
        .context("invalid start of day")?;
    let end = cfg
        .backtest_end
        .unwrap_or(last)
        .and_hms_opt(23, 59, 59)
        .context("invalid end of day")?;
    Ok((start, end))
}

async fn run_paper(
    cfg: &Config,
    entries: &[&StrategyConfig],
    registry: StrategyRegistry,
    gate: RiskGate,
) -> anyhow::Result<()> {
    // ── Market data replay ────────────────────────────────────────────────────
    let csv = CsvCandleProvider::new(&cfg.candle_dir);
    let mut replay = ReplayCandleProvider::new(cfg.min_lookback);
    let mut loaded = std::collections::HashSet::new();
    for entry in entries {
        if loaded.insert(entry.symbol.clone()) {
            replay = replay.with_series(entry.symbol.clone(), csv.load_all(&entry.symbol)?);
        }
    }

    // ── Channels / executor ───────────────────────────────────────────────────
    let (risk_event_tx, mut risk_event_rx) = mpsc::channel::<RiskEvent>(64);
    let throttle = Arc::new(Throttle::new(Duration::from_millis(cfg.broker_min_delay_ms)));
    let paper_cash = cfg.starting_balance * entries.len() as f64;
    info!(slippage_bps = cfg.paper_slippage_bps, cash = paper_cash, "Paper trading mode, using PaperSink");
    let executor = OrderExecutor::new(
        Arc::new(PaperSink::new(paper_cash, cfg.paper_slippage_bps)),
        throttle.clone(),
        risk_event_tx.clone(),
        cfg.trading_mode,
    );

    // ── Scheduler ─────────────────────────────────────────────────────────────
    let mut scheduler = Scheduler::new(
        Arc::new(replay),
        executor,
        gate,
        throttle,
        risk_event_tx.clone(),
        cfg.live_lookback_days,
    );
    for entry in entries {
        let strategy = registry.get(entry.strategy_id()?)?;
        scheduler.add_session(TradingSession::new(
            entry.name.clone(),
            entry.symbol.clone(),
            strategy,
            entry.parameters()?,
            cfg.starting_balance,
        ));
    }

    // ── Risk event logger ─────────────────────────────────────────────────────
    tokio::spawn(async move {
        while let Some(event) = risk_event_rx.recv().await {
            match event {
                RiskEvent::OrderRejected { symbol, strategy, kind, reason } => {
                    warn!(%symbol, %strategy, %kind, %reason, "Order rejected");
                }
                RiskEvent::OrderFailed { symbol, error } => {
                    error!(%symbol, %error, "Order failed");
                }
                RiskEvent::Filled { fill, reason } => {
                    info!(
                        symbol = %fill.symbol,
                        side = %fill.side,
                        price = fill.fill_price,
                        qty = fill.quantity,
                        %reason,
                        "Fill"
                    );
                }
                RiskEvent::KillSwitchTripped { daily_pnl_pct } => {
                    error!(daily_pnl_pct, "Kill switch tripped, all trading halted until reactivated");
                }
                RiskEvent::KillSwitchReactivated => info!("Kill switch reactivated"),
            }
        }
    });

    // ── Engine ────────────────────────────────────────────────────────────────
    let (engine, handle) = Engine::new(
        Arc::new(scheduler),
        Duration::from_secs(cfg.eval_interval_secs),
        risk_event_tx,
    );
    let engine_task = tokio::spawn(engine.run());
    handle.start().await;

    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("Shutdown signal received. Exiting.");

    handle.stop().await;
    drop(handle);
    engine_task.await.context("engine task panicked")?;
    Ok(())
}
