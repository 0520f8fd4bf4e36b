use common::{MarketSnapshot, PositionState, ReasonCode, Signal, StrategyId};

use crate::params::{StrategyParameters, SupportResistanceParams};
use crate::strategies::{idle, wrong_parameters};
use crate::Strategy;

/// Box breakout: a tight range over the preceding bars, broken to the upside
/// on volume. Exits on fixed stop-loss or take-profit from entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct SupportResistance;

impl Strategy for SupportResistance {
    fn id(&self) -> StrategyId {
        StrategyId::SupportResistance
    }

    fn name(&self) -> &str {
        "Support/Resistance Box"
    }

    fn description(&self) -> &str {
        "Buys a volume-confirmed close above a narrow trading range and exits at \
         a fixed target or stop."
    }

    fn evaluate(
        &self,
        snapshot: &MarketSnapshot,
        state: &mut PositionState,
        params: &StrategyParameters,
    ) -> Signal {
        let StrategyParameters::SupportResistance(p) = params else {
            return wrong_parameters(self.name(), snapshot, state);
        };
        if state.has_position {
            self.exit(snapshot, state, p)
        } else {
            self.entry(snapshot, state, p)
        }
    }
}

impl SupportResistance {
    fn exit(&self, snap: &MarketSnapshot, state: &PositionState, p: &SupportResistanceParams) -> Signal {
        let name = self.name();
        let pnl = state.unrealized_pnl_pct(snap.close).unwrap_or(0.0);
        if pnl <= -p.stop_loss_pct {
            return Signal::sell(&snap.symbol, name, ReasonCode::StopLoss, format!("P/L {pnl:.2}%"));
        }
        if pnl >= p.take_profit_pct {
            return Signal::sell(&snap.symbol, name, ReasonCode::TakeProfit, format!("P/L {pnl:.2}%"));
        }
        Signal::hold(&snap.symbol, name, ReasonCode::InPosition, format!("P/L {pnl:.2}%"))
    }

    fn entry(&self, snap: &MarketSnapshot, state: &PositionState, p: &SupportResistanceParams) -> Signal {
        let name = self.name();
        let (Some(box_high), Some(box_low), Some(volume_ratio)) =
            (snap.range_high, snap.range_low, snap.volume_ratio)
        else {
            return idle(name, snap, state, ReasonCode::DataMissing, "range or volume ratio unavailable");
        };
        if box_low <= 0.0 {
            return idle(name, snap, state, ReasonCode::DataMissing, "range low is not positive");
        }

        let width = (box_high - box_low) / box_low * 100.0;
        if width > p.max_box_width_pct {
            return idle(
                name,
                snap,
                state,
                ReasonCode::BoxTooWide,
                format!("box width {width:.2}% > {:.2}%", p.max_box_width_pct),
            );
        }

        let trigger = box_high * (1.0 + p.breakout_buffer_pct / 100.0);
        if snap.close <= trigger {
            return idle(name, snap, state, ReasonCode::NoSetup, format!("inside box {box_low:.2}-{box_high:.2}"));
        }
        if volume_ratio < p.volume_multiplier {
            return idle(name, snap, state, ReasonCode::VolumeTooLow, format!("volume ratio {volume_ratio:.2}"));
        }

        Signal::buy(
            &snap.symbol,
            name,
            ReasonCode::BoxBreakout,
            format!("close {:.2} broke box high {box_high:.2} (width {width:.2}%)", snap.close),
        )
    }
}
