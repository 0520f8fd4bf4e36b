use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use common::{EngineCommand, EngineState, RiskEvent};

use crate::Scheduler;

/// Cloneable handle used by the binary to drive the engine.
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
    state: Arc<RwLock<EngineState>>,
}

impl EngineHandle {
    pub async fn send(&self, cmd: EngineCommand) {
        let _ = self.command_tx.send(cmd).await;
    }

    pub async fn start(&self) {
        self.send(EngineCommand::Start).await;
    }

    pub async fn stop(&self) {
        self.send(EngineCommand::Stop).await;
    }

    pub async fn pause(&self) {
        self.send(EngineCommand::Pause).await;
    }

    pub async fn resume(&self) {
        self.send(EngineCommand::Resume).await;
    }

    pub async fn reactivate_kill_switch(&self) {
        self.send(EngineCommand::ReactivateKillSwitch).await;
    }

    pub async fn evaluate_now(&self) {
        self.send(EngineCommand::EvaluateNow).await;
    }

    pub async fn state(&self) -> EngineState {
        *self.state.read().await
    }
}

/// The live engine: runs the scheduler on a fixed interval and processes
/// lifecycle commands. The run loop ends once every handle is dropped.
pub struct Engine {
    scheduler: Arc<Scheduler>,
    interval: Duration,
    state: Arc<RwLock<EngineState>>,
    command_rx: mpsc::Receiver<EngineCommand>,
    risk_event_tx: mpsc::Sender<RiskEvent>,
}

impl Engine {
    pub fn new(
        scheduler: Arc<Scheduler>,
        interval: Duration,
        risk_event_tx: mpsc::Sender<RiskEvent>,
    ) -> (Self, EngineHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let state = Arc::new(RwLock::new(EngineState::Stopped));

        let handle = EngineHandle {
            command_tx,
            state: state.clone(),
        };

        let engine = Engine {
            scheduler,
            interval,
            state,
            command_rx,
            risk_event_tx,
        };

        (engine, handle)
    }

    /// Run the engine. Call from `tokio::spawn`.
    pub async fn run(mut self) {
        info!(
            interval_secs = self.interval.as_secs_f64(),
            sessions = ?self.scheduler.session_names(),
            "Engine initialized in Stopped state. Waiting for Start command."
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd).await,
                    None => {
                        info!("All engine handles dropped, shutting down");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    if *self.state.read().await == EngineState::Running {
                        self.spawn_batch();
                    }
                }
            }
        }
        *self.state.write().await = EngineState::Stopped;
    }

    async fn handle(&self, cmd: EngineCommand) {
        let current = *self.state.read().await;
        match cmd {
            EngineCommand::Start => {
                if current == EngineState::Running {
                    info!("Engine already running");
                    return;
                }
                info!("Engine started, evaluating on schedule");
                *self.state.write().await = EngineState::Running;
            }
            EngineCommand::Stop => {
                info!("Engine stopped");
                *self.state.write().await = EngineState::Stopped;
            }
            EngineCommand::Pause => {
                if current == EngineState::Running {
                    info!("Engine paused, scheduled evaluations suppressed");
                    *self.state.write().await = EngineState::Paused;
                }
            }
            EngineCommand::Resume => {
                if current == EngineState::Paused {
                    info!("Engine resumed");
                    *self.state.write().await = EngineState::Running;
                }
            }
            EngineCommand::ReactivateKillSwitch => {
                let kill_switch = self.scheduler.gate().kill_switch();
                if kill_switch.is_active() {
                    warn!("ReactivateKillSwitch received but kill switch is already active");
                    return;
                }
                kill_switch.reactivate();
                let _ = self.risk_event_tx.send(RiskEvent::KillSwitchReactivated).await;
            }
            EngineCommand::EvaluateNow => {
                info!(state = %current, "Manual evaluation requested");
                self.spawn_batch();
            }
        }
    }

    fn spawn_batch(&self) {
        let scheduler = Arc::clone(&self.scheduler);
        tokio::spawn(async move {
            let now = chrono::Local::now().naive_local();
            let report = scheduler.evaluate_all(now).await;
            for (session, err) in &report.failures {
                error!(%session, error = %err, "Evaluation failed");
            }
        });
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
