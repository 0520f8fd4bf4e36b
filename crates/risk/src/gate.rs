use serde::{Deserialize, Serialize};
use tracing::warn;

use common::{Config, PositionState, RejectionReason, Signal, SignalKind};

use crate::KillSwitch;

/// User-configurable risk parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Daily loss, in percent of opening equity, that trips the kill switch.
    pub daily_loss_limit_pct: f64,
    /// Maximum entries per symbol per trading day. `None` = unlimited.
    pub max_daily_entries: Option<u32>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            daily_loss_limit_pct: 5.0,
            max_daily_entries: None,
        }
    }
}

impl RiskConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            daily_loss_limit_pct: config.daily_loss_limit_pct,
            max_daily_entries: config.max_daily_entries,
        }
    }
}

/// Account-wide figures the gate needs besides the position itself.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccountSnapshot {
    /// Realized plus unrealized P/L of the current day, in percent.
    pub daily_pnl_pct: f64,
}

/// The gatekeeper between a strategy's decision and any fill.
///
/// Every signal passes through [`RiskGate::validate`]; nothing reaches the
/// ledger or the order sink on rejection.
#[derive(Debug, Clone)]
pub struct RiskGate {
    config: RiskConfig,
    kill_switch: KillSwitch,
}

impl RiskGate {
    pub fn new(config: RiskConfig, kill_switch: KillSwitch) -> Self {
        Self {
            config,
            kill_switch,
        }
    }

    pub fn kill_switch(&self) -> &KillSwitch {
        &self.kill_switch
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Accept or reject `signal`. Checks run in order: kill switch, daily loss
    /// limit (which trips the switch), then position consistency.
    pub fn validate(
        &self,
        signal: &Signal,
        position: &PositionState,
        account: &AccountSnapshot,
    ) -> Result<(), RejectionReason> {
        if !self.kill_switch.is_active() {
            return self.reject(signal, RejectionReason::KillSwitchInactive);
        }

        let daily = account.daily_pnl_pct;
        if daily <= -self.config.daily_loss_limit_pct {
            self.kill_switch
                .trip(&format!("daily P/L {daily:.2}% breached -{:.2}%", self.config.daily_loss_limit_pct));
            return self.reject(signal, RejectionReason::DailyLossLimit { daily_pnl_pct: daily });
        }

        match signal.kind() {
            SignalKind::Buy if position.has_position => {
                self.reject(signal, RejectionReason::AlreadyInPosition)
            }
            SignalKind::Buy => match self.config.max_daily_entries {
                Some(limit) if position.daily_entry_count >= limit => {
                    self.reject(signal, RejectionReason::DailyEntryLimit { limit })
                }
                _ => Ok(()),
            },
            SignalKind::Sell if !position.has_position => {
                self.reject(signal, RejectionReason::NoPosition)
            }
            SignalKind::Sell | SignalKind::Hold | SignalKind::None => Ok(()),
        }
    }

    fn reject(&self, signal: &Signal, reason: RejectionReason) -> Result<(), RejectionReason> {
        if signal.kind().is_actionable() {
            warn!(
                symbol = %signal.symbol(),
                strategy = %signal.strategy(),
                kind = %signal.kind(),
                reason = %reason,
                "Signal rejected by risk gate"
            );
        }
        Err(reason)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
