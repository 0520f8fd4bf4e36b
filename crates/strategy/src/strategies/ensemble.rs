use common::{MarketSnapshot, PositionState, ReasonCode, Signal, SignalKind, StrategyId};

use crate::params::{EnsembleParams, StrategyParameters};
use crate::strategies::{idle, wrong_parameters, DonchianTrail, Pullback, VolatilitySqueeze};
use crate::Strategy;

/// Weighted vote over the Donchian, pullback and squeeze strategies.
///
/// Each constituent runs with its own default parameters against the shared
/// state and scores +1 for BUY, -1 for SELL and 0 otherwise. The ensemble has
/// no exit of its own beyond the sell threshold.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ensemble;

fn score(signal: &Signal) -> f64 {
    match signal.kind() {
        SignalKind::Buy => 1.0,
        SignalKind::Sell => -1.0,
        SignalKind::Hold | SignalKind::None => 0.0,
    }
}

impl Strategy for Ensemble {
    fn id(&self) -> StrategyId {
        StrategyId::Ensemble
    }

    fn name(&self) -> &str {
        "Ensemble Vote"
    }

    fn description(&self) -> &str {
        "Combines the Donchian, pullback and squeeze strategies into one \
         weighted score and trades when it crosses the buy or sell threshold."
    }

    fn evaluate(
        &self,
        snapshot: &MarketSnapshot,
        state: &mut PositionState,
        params: &StrategyParameters,
    ) -> Signal {
        let StrategyParameters::Ensemble(p) = params else {
            return wrong_parameters(self.name(), snapshot, state);
        };
        self.vote(snapshot, state, p)
    }
}

impl Ensemble {
    fn vote(&self, snap: &MarketSnapshot, state: &mut PositionState, p: &EnsembleParams) -> Signal {
        let name = self.name();
        let constituents = [&DonchianTrail as &dyn Strategy, &Pullback, &VolatilitySqueeze];
        let weights = [p.donchian_weight, p.pullback_weight, p.squeeze_weight];

        let mut total = 0.0;
        let mut all_missing = true;
        let mut parts = Vec::with_capacity(constituents.len());
        for (strategy, weight) in constituents.into_iter().zip(weights) {
            let signal = strategy.evaluate(snap, state, &strategy.default_parameters());
            all_missing &= signal.reason() == ReasonCode::DataMissing;
            let s = score(&signal);
            total += s * weight;
            parts.push(format!("{}:{s:+.0}", strategy.id()));
        }
        let detail = format!("{} -> {total:.2}", parts.join(" "));
        if all_missing {
            return idle(name, snap, state, ReasonCode::DataMissing, detail);
        }

        if !state.has_position && total >= p.buy_threshold {
            return Signal::buy(&snap.symbol, name, ReasonCode::EnsembleBuy, detail).with_confidence(total);
        }
        if state.has_position && total <= p.sell_threshold {
            return Signal::sell(&snap.symbol, name, ReasonCode::EnsembleSell, detail);
        }
        idle(name, snap, state, ReasonCode::NoSetup, detail)
    }
}
