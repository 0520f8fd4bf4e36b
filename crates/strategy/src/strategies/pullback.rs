use common::{MarketSnapshot, PositionState, PullbackMemory, ReasonCode, Signal, StrategyId};

use crate::params::{PullbackParams, StrategyParameters};
use crate::strategies::{atr_exit, idle, wrong_parameters};
use crate::Strategy;

const ID: StrategyId = StrategyId::Pullback;

/// Buys the rebound of an RSI dip while price holds above its long MA.
#[derive(Debug, Default, Clone, Copy)]
pub struct Pullback;

impl Strategy for Pullback {
    fn id(&self) -> StrategyId {
        ID
    }

    fn name(&self) -> &str {
        "Pullback in Trend"
    }

    fn description(&self) -> &str {
        "In an uptrend above the long moving average, waits for RSI to dip under \
         the pullback level and buys the first bar it recovers; ATR trailing exit."
    }

    fn evaluate(
        &self,
        snapshot: &MarketSnapshot,
        state: &mut PositionState,
        params: &StrategyParameters,
    ) -> Signal {
        let StrategyParameters::Pullback(p) = params else {
            return wrong_parameters(self.name(), snapshot, state);
        };
        if state.has_position {
            let entry_atr = state.memory::<PullbackMemory>(ID).and_then(|m| m.entry_atr);
            return atr_exit(self.name(), snapshot, state, entry_atr, Some(p.atr_stop_mult), p.atr_trail_mult);
        }
        self.entry(snapshot, state, p)
    }
}

impl Pullback {
    fn entry(&self, snap: &MarketSnapshot, state: &mut PositionState, p: &PullbackParams) -> Signal {
        let name = self.name();
        // ATR sizes the initial stop, so an entry without it is not taken
        let (Some(trend_ma), Some(rsi), Some(atr)) = (snap.ma_long, snap.rsi, snap.atr) else {
            return idle(name, snap, state, ReasonCode::DataMissing, "trend MA, RSI or ATR unavailable");
        };
        if snap.close <= trend_ma {
            return idle(
                name,
                snap,
                state,
                ReasonCode::BelowTrend,
                format!("close {:.2} <= MA{} {trend_ma:.2}", snap.close, p.trend_ma_period),
            );
        }

        let memory = state.memory_mut::<PullbackMemory>(ID);
        if rsi <= p.rsi_pullback_threshold {
            memory.was_oversold = true;
            return Signal::none(&snap.symbol, name, ReasonCode::RsiOversold, format!("RSI {rsi:.1}, waiting for rebound"));
        }
        if memory.was_oversold {
            memory.was_oversold = false;
            memory.entry_atr = Some(atr);
            return Signal::buy(
                &snap.symbol,
                name,
                ReasonCode::PullbackRebound,
                format!("RSI {rsi:.1} back above {:.1} in uptrend", p.rsi_pullback_threshold),
            )
            .with_confidence(0.7);
        }
        Signal::none(&snap.symbol, name, ReasonCode::NoSetup, format!("RSI {rsi:.1}"))
    }
}
