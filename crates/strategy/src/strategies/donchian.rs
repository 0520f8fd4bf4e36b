use common::{DonchianMemory, MarketSnapshot, PositionState, ReasonCode, Signal, StrategyId};

use crate::params::{DonchianParams, StrategyParameters};
use crate::strategies::{atr_exit, idle, wrong_parameters};
use crate::Strategy;

const ID: StrategyId = StrategyId::DonchianTrail;

/// Donchian channel breakout with an ATR initial stop and a chandelier trail.
#[derive(Debug, Default, Clone, Copy)]
pub struct DonchianTrail;

impl Strategy for DonchianTrail {
    fn id(&self) -> StrategyId {
        ID
    }

    fn name(&self) -> &str {
        "Donchian ATR Trail"
    }

    fn description(&self) -> &str {
        "Buys a close above the N-bar Donchian high on volume; exits on an \
         ATR-sized initial stop or a chandelier trailing stop."
    }

    fn evaluate(
        &self,
        snapshot: &MarketSnapshot,
        state: &mut PositionState,
        params: &StrategyParameters,
    ) -> Signal {
        let StrategyParameters::DonchianTrail(p) = params else {
            return wrong_parameters(self.name(), snapshot, state);
        };
        if state.has_position {
            let entry_atr = state.memory::<DonchianMemory>(ID).and_then(|m| m.entry_atr);
            return atr_exit(self.name(), snapshot, state, entry_atr, Some(p.atr_stop_mult), p.atr_trail_mult);
        }
        self.entry(snapshot, state, p)
    }
}

impl DonchianTrail {
    fn entry(&self, snap: &MarketSnapshot, state: &mut PositionState, p: &DonchianParams) -> Signal {
        let name = self.name();
        let (Some(channel_high), Some(volume_ratio), Some(atr)) =
            (snap.donchian_high, snap.volume_ratio, snap.atr)
        else {
            return idle(name, snap, state, ReasonCode::DataMissing, "Donchian high, volume ratio or ATR unavailable");
        };

        let trigger = channel_high * (1.0 + p.breakout_buffer_pct / 100.0);
        if snap.close <= trigger {
            return idle(name, snap, state, ReasonCode::NoSetup, format!("close {:.2} <= {trigger:.2}", snap.close));
        }
        if volume_ratio < p.volume_multiplier {
            return idle(name, snap, state, ReasonCode::VolumeTooLow, format!("volume ratio {volume_ratio:.2}"));
        }

        state.memory_mut::<DonchianMemory>(ID).entry_atr = Some(atr);
        Signal::buy(
            &snap.symbol,
            name,
            ReasonCode::DonchianBreak,
            format!(
                "close {:.2} > {}-bar high {channel_high:.2} on {volume_ratio:.1}x volume",
                snap.close, p.donchian_period
            ),
        )
        .with_confidence(0.8)
    }
}
