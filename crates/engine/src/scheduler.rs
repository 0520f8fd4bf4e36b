//! Live evaluation of every tracked session.
//!
//! One batch fetches recent candles per session, evaluates the strategy on
//! the latest snapshot, runs the risk gate and executes approved orders.
//! Sessions run in parallel; the same session is serialized by its mutex,
//! so a manual trigger overlapping a scheduled tick never interleaves.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use common::{
    CandleProvider, DecisionRecord, DecisionSink, Error, Fill, LogDecisionSink, Order, OrderSide,
    PositionState, ReasonCode, RejectionReason, Result, RiskEvent, SignalKind,
};
use risk::{AccountSnapshot, DailyPnlTracker, RiskGate};
use strategy::{evaluate_snapshot, SnapshotBuilder, Strategy, StrategyParameters};

use crate::{OrderExecutor, Throttle};

/// One strategy instance trading one symbol.
pub struct TradingSession {
    pub name: String,
    pub strategy: Arc<dyn Strategy>,
    pub params: StrategyParameters,
    pub state: PositionState,
}

impl TradingSession {
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        strategy: Arc<dyn Strategy>,
        params: StrategyParameters,
        starting_cash: f64,
    ) -> Self {
        Self {
            name: name.into(),
            strategy,
            params,
            state: PositionState::new(symbol, starting_cash),
        }
    }
}

/// What happened to one session in a batch.
#[derive(Debug, Clone)]
pub enum SymbolOutcome {
    /// HOLD, NONE, or an approved BUY too small to size.
    NoAction { kind: SignalKind, reason: ReasonCode },
    Rejected(RejectionReason),
    Filled(Fill),
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<(String, SymbolOutcome)>,
    /// Sessions whose evaluation failed, with the error message.
    pub failures: Vec<(String, String)>,
}

impl BatchReport {
    pub fn fills(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, SymbolOutcome::Filled(_)))
            .count()
    }
}

pub struct Scheduler {
    sessions: Vec<(String, Arc<Mutex<TradingSession>>)>,
    provider: Arc<dyn CandleProvider>,
    executor: OrderExecutor,
    gate: RiskGate,
    throttle: Arc<Throttle>,
    risk_event_tx: mpsc::Sender<RiskEvent>,
    pnl: std::sync::Mutex<DailyPnlTracker>,
    decisions: Arc<dyn DecisionSink>,
    lookback: chrono::Duration,
    run_id: String,
    sequence: AtomicU64,
}

impl Scheduler {
    pub fn new(
        provider: Arc<dyn CandleProvider>,
        executor: OrderExecutor,
        gate: RiskGate,
        throttle: Arc<Throttle>,
        risk_event_tx: mpsc::Sender<RiskEvent>,
        lookback_days: i64,
    ) -> Self {
        Self {
            sessions: Vec::new(),
            provider,
            executor,
            gate,
            throttle,
            risk_event_tx,
            pnl: std::sync::Mutex::new(DailyPnlTracker::new()),
            decisions: Arc::new(LogDecisionSink),
            lookback: chrono::Duration::days(lookback_days),
            run_id: "live".into(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn with_decision_sink(mut self, sink: Arc<dyn DecisionSink>) -> Self {
        self.decisions = sink;
        self
    }

    pub fn add_session(&mut self, session: TradingSession) {
        info!(
            session = %session.name,
            symbol = %session.state.symbol,
            strategy = %session.strategy.id(),
            "Session registered"
        );
        self.sessions
            .push((session.name.clone(), Arc::new(Mutex::new(session))));
    }

    pub fn gate(&self) -> &RiskGate {
        &self.gate
    }

    pub fn session_names(&self) -> Vec<String> {
        self.sessions.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Current position state of a session.
    pub async fn position(&self, name: &str) -> Option<PositionState> {
        let (_, session) = self.sessions.iter().find(|(n, _)| n == name)?;
        Some(session.lock().await.state.clone())
    }

    /// Evaluate every session once. A failing session is recorded in the
    /// report; the others still run.
    pub async fn evaluate_all(self: &Arc<Self>, now: NaiveDateTime) -> BatchReport {
        let mut tasks = JoinSet::new();
        for (name, session) in &self.sessions {
            let scheduler = Arc::clone(self);
            let session = Arc::clone(session);
            let name = name.clone();
            tasks.spawn(async move {
                let outcome = scheduler.evaluate_session(&session, now).await;
                (name, outcome)
            });
        }

        let mut report = BatchReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(outcome))) => report.outcomes.push((name, outcome)),
                Ok((name, Err(e))) => {
                    warn!(session = %name, error = %e, "Session evaluation failed");
                    report.failures.push((name, e.to_string()));
                }
                Err(e) => {
                    warn!(error = %e, "Session task aborted");
                    report.failures.push(("<task>".into(), e.to_string()));
                }
            }
        }
        report.outcomes.sort_by(|a, b| a.0.cmp(&b.0));
        report.failures.sort();
        info!(
            sessions = self.sessions.len(),
            fills = report.fills(),
            failures = report.failures.len(),
            "Evaluation batch finished"
        );
        report
    }

    async fn evaluate_session(
        &self,
        session: &Mutex<TradingSession>,
        now: NaiveDateTime,
    ) -> Result<SymbolOutcome> {
        let mut guard = session.lock().await;
        let TradingSession {
            name,
            strategy,
            params,
            state,
        } = &mut *guard;
        let symbol = state.symbol.clone();

        self.throttle.wait().await;
        let candles = self
            .provider
            .fetch_candles(&symbol, now - self.lookback, now)
            .await?;
        let settings = params.indicator_settings();
        let snapshot = SnapshotBuilder::new(symbol.as_str(), &candles, &settings)
            .latest()
            .ok_or_else(|| Error::InsufficientData {
                symbol: symbol.clone(),
                bars: 0,
                required: 1,
            })?;

        let day = snapshot.timestamp.date();
        state.roll_day(day);
        state.mark_price(snapshot.close);
        let signal = evaluate_snapshot(&**strategy, &snapshot, state, params);

        let equity = state.available_cash + state.quantity as f64 * snapshot.close;
        let account = {
            let mut pnl = self
                .pnl
                .lock()
                .map_err(|_| Error::Other("daily P/L tracker poisoned".into()))?;
            pnl.mark(name, day, equity);
            AccountSnapshot {
                daily_pnl_pct: pnl.daily_pnl_pct(),
            }
        };
        let was_active = self.gate.kill_switch().is_active();
        let verdict = self.gate.validate(&signal, state, &account);

        if signal.kind() != SignalKind::None {
            let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            self.decisions.record(DecisionRecord::new(
                &self.run_id,
                sequence,
                &snapshot,
                &signal,
                verdict.clone().err(),
            ));
        }

        if let Err(rejection) = verdict {
            if was_active && matches!(rejection, RejectionReason::DailyLossLimit { .. }) {
                let _ = self
                    .risk_event_tx
                    .send(RiskEvent::KillSwitchTripped {
                        daily_pnl_pct: account.daily_pnl_pct,
                    })
                    .await;
            }
            if signal.kind().is_actionable() {
                let _ = self
                    .risk_event_tx
                    .send(RiskEvent::OrderRejected {
                        symbol: symbol.clone(),
                        strategy: signal.strategy().to_string(),
                        kind: signal.kind(),
                        reason: rejection.clone(),
                    })
                    .await;
            }
            return Ok(SymbolOutcome::Rejected(rejection));
        }

        let (side, quantity) = match signal.kind() {
            SignalKind::Buy => {
                let budget = state.available_cash * signal.size_fraction();
                (OrderSide::Buy, (budget / snapshot.close).floor().max(0.0) as u64)
            }
            SignalKind::Sell => (OrderSide::Sell, state.sell_quantity(signal.size_fraction())),
            kind => {
                debug!(session = %name, %kind, reason = %signal.reason(), "No action");
                return Ok(SymbolOutcome::NoAction {
                    kind,
                    reason: signal.reason(),
                });
            }
        };
        if quantity == 0 {
            warn!(session = %name, %side, cash = state.available_cash, "Order sized to zero units, skipped");
            return Ok(SymbolOutcome::NoAction {
                kind: signal.kind(),
                reason: signal.reason(),
            });
        }

        let order = Order::market(symbol.as_str(), side, quantity, snapshot.close);
        let fill = self.executor.execute(&order, signal.reason()).await?;
        let notional = fill.fill_price * fill.quantity as f64;
        match fill.side {
            OrderSide::Buy => {
                state.open(fill.fill_price, fill.quantity, snapshot.timestamp);
                state.available_cash -= notional;
            }
            OrderSide::Sell => {
                state.reduce(fill.quantity);
                state.available_cash += notional;
            }
        }
        Ok(SymbolOutcome::Filled(fill))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
