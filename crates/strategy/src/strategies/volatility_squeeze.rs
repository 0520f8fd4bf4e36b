use common::{MarketSnapshot, PositionState, ReasonCode, Signal, SqueezeMemory, StrategyId};

use crate::params::{SqueezeParams, StrategyParameters};
use crate::strategies::{atr_exit, idle, wrong_parameters};
use crate::Strategy;

const ID: StrategyId = StrategyId::VolatilitySqueeze;

/// Breakout after volatility contraction.
///
/// A low ATR percentile arms a sticky squeeze flag; the flag survives until a
/// volume-confirmed Donchian breakout consumes it.
#[derive(Debug, Default, Clone, Copy)]
pub struct VolatilitySqueeze;

impl Strategy for VolatilitySqueeze {
    fn id(&self) -> StrategyId {
        ID
    }

    fn name(&self) -> &str {
        "Volatility Squeeze"
    }

    fn description(&self) -> &str {
        "Waits for ATR to sink into the bottom of its recent distribution, then \
         buys the first volume-backed channel breakout; ATR trailing exit."
    }

    fn evaluate(
        &self,
        snapshot: &MarketSnapshot,
        state: &mut PositionState,
        params: &StrategyParameters,
    ) -> Signal {
        let StrategyParameters::VolatilitySqueeze(p) = params else {
            return wrong_parameters(self.name(), snapshot, state);
        };
        if state.has_position {
            return atr_exit(self.name(), snapshot, state, None, None, p.atr_trail_mult);
        }
        self.entry(snapshot, state, p)
    }
}

impl VolatilitySqueeze {
    fn entry(&self, snap: &MarketSnapshot, state: &mut PositionState, p: &SqueezeParams) -> Signal {
        let name = self.name();
        let (Some(percentile), Some(channel_high), Some(volume_ratio)) =
            (snap.atr_percentile, snap.donchian_high, snap.volume_ratio)
        else {
            return idle(name, snap, state, ReasonCode::DataMissing, "ATR percentile, Donchian high or volume ratio unavailable");
        };

        let memory = state.memory_mut::<SqueezeMemory>(ID);
        if percentile <= p.atr_percentile_threshold {
            memory.squeeze_active = true;
        }
        if !memory.squeeze_active {
            return Signal::none(&snap.symbol, name, ReasonCode::NoSetup, format!("ATR percentile {percentile:.0}"));
        }

        let trigger = channel_high * (1.0 + p.breakout_buffer_pct / 100.0);
        if snap.close > trigger && volume_ratio >= p.volume_multiplier {
            memory.squeeze_active = false;
            memory.entry_atr = snap.atr;
            return Signal::buy(
                &snap.symbol,
                name,
                ReasonCode::SqueezeBreak,
                format!(
                    "squeeze release: close {:.2} > {trigger:.2} on {volume_ratio:.1}x volume",
                    snap.close
                ),
            )
            .with_confidence(0.9);
        }
        Signal::none(
            &snap.symbol,
            name,
            ReasonCode::SqueezeActive,
            format!("ATR percentile {percentile:.0}, waiting for breakout"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testkit::{bare, flat, holding};
    use common::SignalKind;

    fn params() -> StrategyParameters {
        StrategyParameters::VolatilitySqueeze(SqueezeParams::default())
    }

    fn squeeze(close: f64, percentile: f64, volume_ratio: f64) -> MarketSnapshot {
        let mut s = bare(close);
        s.atr_percentile = Some(percentile);
        s.donchian_high = Some(100.0);
        s.volume_ratio = Some(volume_ratio);
        s.atr = Some(1.2);
        s
    }

    #[test]
    fn squeeze_flag_is_sticky_until_breakout() {
        let p = params();
        let mut state = flat();

        let armed = VolatilitySqueeze.evaluate(&squeeze(99.0, 10.0, 1.0), &mut state, &p);
        assert_eq!(armed.reason(), ReasonCode::SqueezeActive);

        // Percentile has expanded again but the flag holds.
        let fired = VolatilitySqueeze.evaluate(&squeeze(101.0, 60.0, 2.5), &mut state, &p);
        assert_eq!(fired.kind(), SignalKind::Buy);
        assert_eq!(fired.reason(), ReasonCode::SqueezeBreak);

        let memory = state.memory::<SqueezeMemory>(ID).unwrap();
        assert!(!memory.squeeze_active);
        assert_eq!(memory.entry_atr, Some(1.2));
    }

    #[test]
    fn no_squeeze_no_entry() {
        let signal = VolatilitySqueeze.evaluate(&squeeze(105.0, 60.0, 3.0), &mut flat(), &params());
        assert_eq!(signal.kind(), SignalKind::None);
        assert_eq!(signal.reason(), ReasonCode::NoSetup);
    }

    #[test]
    fn trail_is_the_only_exit() {
        let mut state = holding(100.0);
        // chandelier 100 - 2.5 * 1.2 = 97
        let signal = VolatilitySqueeze.evaluate(&squeeze(97.5, 50.0, 1.0), &mut state, &params());
        assert_eq!(signal.kind(), SignalKind::Hold);
        let signal = VolatilitySqueeze.evaluate(&squeeze(96.5, 50.0, 1.0), &mut state, &params());
        assert_eq!(signal.reason(), ReasonCode::AtrTrailStop);
    }
}
