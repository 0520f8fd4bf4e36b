pub mod config;
pub mod indicators;
pub mod params;
pub mod registry;
pub mod snapshot;
pub mod strategies;

pub use config::{StrategyConfig, StrategyFileConfig};
pub use params::StrategyParameters;
pub use registry::{StrategyMetadata, StrategyRegistry};
pub use snapshot::SnapshotBuilder;

use common::{MarketSnapshot, PositionState, ReasonCode, Signal, StrategyId};

/// All strategy implementations must satisfy this trait.
///
/// `evaluate` is a pure function of its inputs, except that a strategy may
/// update its own memory slot in `state` (see [`PositionState::memory_mut`]).
/// When `state.has_position` is true the entry branch never runs.
pub trait Strategy: Send + Sync {
    fn id(&self) -> StrategyId;

    /// Human-readable name, carried on every signal.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn default_parameters(&self) -> StrategyParameters {
        StrategyParameters::defaults_for(self.id())
    }

    /// Decide BUY/SELL/HOLD/NONE for one snapshot. A required indicator that
    /// is absent yields a no-op with `DATA_MISSING`, never a panic.
    fn evaluate(
        &self,
        snapshot: &MarketSnapshot,
        state: &mut PositionState,
        params: &StrategyParameters,
    ) -> Signal;
}

/// Entry point used by the simulator and the live loop: snapshots with a
/// non-positive price never reach the strategy.
pub fn evaluate_snapshot(
    strategy: &dyn Strategy,
    snapshot: &MarketSnapshot,
    state: &mut PositionState,
    params: &StrategyParameters,
) -> Signal {
    if !snapshot.is_valid() {
        return strategies::idle(
            strategy.name(),
            snapshot,
            state,
            ReasonCode::InvalidSnapshot,
            format!("non-positive price {}", snapshot.close),
        );
    }
    strategy.evaluate(snapshot, state, params)
}
