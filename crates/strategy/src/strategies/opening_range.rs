use chrono::Duration;

use common::{MarketSnapshot, OpeningRangeMemory, PositionState, ReasonCode, Signal, StrategyId};

use crate::params::{OpeningRangeParams, StrategyParameters};
use crate::strategies::{idle, wrong_parameters};
use crate::Strategy;

const ID: StrategyId = StrategyId::OpeningRange;

/// Intraday breakout of the session's opening range.
///
/// Exit precedence: close back under the range low, then the holding-time
/// limit measured from the recorded entry time.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpeningRange;

impl Strategy for OpeningRange {
    fn id(&self) -> StrategyId {
        ID
    }

    fn name(&self) -> &str {
        "Opening Range Breakout"
    }

    fn description(&self) -> &str {
        "Buys a volume-confirmed break of the opening range high early in the \
         session; exits below the range low or after a fixed holding time."
    }

    fn evaluate(
        &self,
        snapshot: &MarketSnapshot,
        state: &mut PositionState,
        params: &StrategyParameters,
    ) -> Signal {
        let StrategyParameters::OpeningRange(p) = params else {
            return wrong_parameters(self.name(), snapshot, state);
        };
        if state.has_position {
            self.exit(snapshot, state, p)
        } else {
            self.entry(snapshot, state, p)
        }
    }
}

impl OpeningRange {
    fn exit(&self, snap: &MarketSnapshot, state: &PositionState, p: &OpeningRangeParams) -> Signal {
        let name = self.name();
        if let Some(range_low) = snap.opening_range_low {
            if snap.close < range_low {
                return Signal::sell(
                    &snap.symbol,
                    name,
                    ReasonCode::OrbFail,
                    format!("close {:.2} under range low {range_low:.2}", snap.close),
                );
            }
        }

        let entered = state
            .memory::<OpeningRangeMemory>(ID)
            .and_then(|m| m.entry_time)
            .or(state.entry_time);
        if let Some(entered) = entered {
            let held = (snap.timestamp - entered).num_minutes();
            if held >= p.max_hold_minutes {
                return Signal::sell(&snap.symbol, name, ReasonCode::TimeExit, format!("held {held} min"));
            }
        }
        Signal::hold(&snap.symbol, name, ReasonCode::InPosition, "inside holding window")
    }

    fn entry(&self, snap: &MarketSnapshot, state: &mut PositionState, p: &OpeningRangeParams) -> Signal {
        let name = self.name();
        let (Some(range_high), Some(volume_ratio)) = (snap.opening_range_high, snap.volume_ratio) else {
            return idle(name, snap, state, ReasonCode::DataMissing, "opening range or volume ratio unavailable");
        };

        let time = snap.timestamp.time();
        let window_end = p.session_open + Duration::minutes(i64::from(p.entry_window_minutes));
        if time < p.session_open || time > window_end {
            return idle(name, snap, state, ReasonCode::OutsideEntryWindow, format!("{time} outside entry window"));
        }
        if snap.close <= range_high {
            return idle(name, snap, state, ReasonCode::NoSetup, format!("close {:.2} <= range high {range_high:.2}", snap.close));
        }
        if volume_ratio < p.min_volume_ratio {
            return idle(name, snap, state, ReasonCode::VolumeTooLow, format!("volume ratio {volume_ratio:.2}"));
        }

        state.memory_mut::<OpeningRangeMemory>(ID).entry_time = Some(snap.timestamp);
        Signal::buy(
            &snap.symbol,
            name,
            ReasonCode::OrbBreak,
            format!("close {:.2} broke {}-minute range high {range_high:.2}", snap.close, p.opening_range_minutes),
        )
        .with_confidence(0.9)
    }
}
