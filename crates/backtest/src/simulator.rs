//! Single-threaded replay of one strategy over one candle series.
//!
//! Given the same candles, parameters and starting kill-switch state, two
//! runs produce identical results: nothing here reads a clock or a random
//! source.

use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use common::{
    Candle, Config, DecisionRecord, DecisionSink, Error, LogDecisionSink, OrderSide,
    PositionState, ReasonCode, Result, SignalKind,
};
use risk::{AccountSnapshot, DailyPnlTracker, KillSwitch, RiskGate};
use strategy::{evaluate_snapshot, SnapshotBuilder, Strategy, StrategyParameters};

use crate::ledger::{to_decimal, Ledger};
use crate::report::{percent, BacktestResult, TradeRecord};

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub starting_balance: Decimal,
    /// Bars skipped before the first evaluation.
    pub min_lookback: usize,
    /// Tag written on every decision record.
    pub run_id: String,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            starting_balance: Decimal::from(10_000_000u64),
            min_lookback: 20,
            run_id: "backtest".into(),
        }
    }
}

impl BacktestConfig {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            starting_balance: to_decimal(config.starting_balance)?,
            min_lookback: config.min_lookback,
            ..Self::default()
        })
    }
}

/// Drives a strategy and the risk gate across a candle series.
#[derive(Clone)]
pub struct Backtester {
    config: BacktestConfig,
    gate: RiskGate,
    decisions: Arc<dyn DecisionSink>,
}

impl Backtester {
    pub fn new(config: BacktestConfig, gate: RiskGate) -> Self {
        Self {
            config,
            gate,
            decisions: Arc::new(LogDecisionSink),
        }
    }

    pub fn with_decision_sink(mut self, sink: Arc<dyn DecisionSink>) -> Self {
        self.decisions = sink;
        self
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn run(
        &self,
        strategy: &dyn Strategy,
        params: &StrategyParameters,
        symbol: &str,
        candles: &[Candle],
    ) -> Result<BacktestResult> {
        if params.strategy_id() != strategy.id() {
            return Err(Error::Config(format!(
                "parameters for {} handed to {}",
                params.strategy_id(),
                strategy.id()
            )));
        }
        params.validate()?;

        let warmup = self.config.min_lookback;
        let required = warmup + 1;
        if candles.len() < required {
            return Err(Error::InsufficientData {
                symbol: symbol.to_string(),
                bars: candles.len(),
                required,
            });
        }

        info!(
            symbol,
            strategy = %strategy.id(),
            bars = candles.len(),
            starting_balance = %self.config.starting_balance,
            "Backtest started"
        );

        let settings = params.indicator_settings();
        let snapshots = SnapshotBuilder::new(symbol, candles, &settings);
        let mut ledger = Ledger::new(self.config.starting_balance);
        let mut state = PositionState::new(symbol, ledger.cash().to_f64().unwrap_or(0.0));
        let gate = self.run_gate();
        let mut pnl = DailyPnlTracker::new();
        let mut trades = Vec::new();
        let mut rejected = 0usize;
        let mut sequence = 0u64;

        for (i, candle) in candles.iter().enumerate().skip(warmup) {
            let close = to_decimal(candle.close)?;
            let day = candle.timestamp.date();
            state.roll_day(day);
            state.mark_price(candle.close);

            let Some(snapshot) = snapshots.snapshot_at(i) else {
                continue;
            };
            let signal = evaluate_snapshot(strategy, &snapshot, &mut state, params);

            pnl.mark(symbol, day, ledger.equity(close).to_f64().unwrap_or(0.0));
            let account = AccountSnapshot {
                daily_pnl_pct: pnl.daily_pnl_pct(),
            };
            let verdict = gate.validate(&signal, &state, &account);

            if signal.kind() != SignalKind::None {
                sequence += 1;
                self.decisions.record(DecisionRecord::new(
                    &self.config.run_id,
                    sequence,
                    &snapshot,
                    &signal,
                    verdict.clone().err(),
                ));
            }
            if verdict.is_err() {
                if signal.kind().is_actionable() {
                    rejected += 1;
                }
                continue;
            }

            match signal.kind() {
                SignalKind::Buy => {
                    let qty = ledger.affordable(close);
                    if qty == 0 {
                        warn!(symbol, close = candle.close, cash = %ledger.cash(), "Cash too low for one unit, BUY skipped");
                        continue;
                    }
                    ledger.buy(close, qty)?;
                    state.open(candle.close, qty, candle.timestamp);
                    debug!(symbol, qty, price = %close, reason = %signal.reason(), "Simulated BUY");
                    trades.push(TradeRecord {
                        timestamp: candle.timestamp,
                        side: OrderSide::Buy,
                        price: close,
                        quantity: qty,
                        reason: signal.reason(),
                        realized_pnl: None,
                        pnl_pct: None,
                        partial: false,
                    });
                }
                SignalKind::Sell => {
                    let qty = state.sell_quantity(signal.size_fraction());
                    trades.push(sell(&mut ledger, &mut state, candle, close, qty, signal.reason())?);
                }
                SignalKind::Hold | SignalKind::None => {}
            }
            state.available_cash = ledger.cash().to_f64().unwrap_or(0.0);
        }

        if ledger.quantity() > 0 {
            if let Some(last) = candles.last() {
                let close = to_decimal(last.close)?;
                let qty = ledger.quantity();
                trades.push(sell(&mut ledger, &mut state, last, close, qty, ReasonCode::ForceLiquidation)?);
            }
        }

        let final_balance = ledger.cash();
        let start = ledger.starting_balance();
        let sells = || trades.iter().filter(|t| t.side == OrderSide::Sell);
        let round_trips = sells().filter(|t| !t.partial).count();
        let partial_exits = sells().filter(|t| t.partial).count();
        let result = BacktestResult {
            symbol: symbol.to_string(),
            strategy: strategy.id(),
            bars: candles.len(),
            starting_balance: start,
            final_balance,
            realized_pnl: ledger.realized_pnl(),
            total_return_pct: percent(final_balance - start, start),
            trade_count: trades.len(),
            round_trips,
            partial_exits,
            rejected_signals: rejected,
            trades,
        };
        info!(
            symbol,
            strategy = %result.strategy,
            final_balance = %result.final_balance,
            return_pct = %result.total_return_pct,
            trades = result.trade_count,
            round_trips = result.round_trips,
            rejected = result.rejected_signals,
            "Backtest finished"
        );
        Ok(result)
    }

    /// Gate for one run: the configured limits with a kill switch of its own,
    /// tripped up front when the configured switch is. A trip inside the run
    /// never reaches the configured switch.
    fn run_gate(&self) -> RiskGate {
        let kill_switch = KillSwitch::in_memory();
        if !self.gate.kill_switch().is_active() {
            kill_switch.trip("kill switch inactive at run start");
        }
        RiskGate::new(self.gate.config().clone(), kill_switch)
    }
}

fn sell(
    ledger: &mut Ledger,
    state: &mut PositionState,
    candle: &Candle,
    close: Decimal,
    qty: u64,
    reason: ReasonCode,
) -> Result<TradeRecord> {
    let entry = ledger.entry_price();
    let realized = ledger.sell(close, qty)?;
    state.reduce(qty);
    debug!(symbol = %state.symbol, qty, price = %close, %reason, "Simulated SELL");
    Ok(TradeRecord {
        timestamp: candle.timestamp,
        side: OrderSide::Sell,
        price: close,
        quantity: qty,
        reason,
        realized_pnl: Some(realized),
        pnl_pct: Some(percent(close - entry, entry)),
        partial: state.has_position,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────
