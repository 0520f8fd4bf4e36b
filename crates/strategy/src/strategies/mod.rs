mod donchian;
mod ensemble;
mod opening_range;
mod pullback;
mod rsi_reversion;
mod support_resistance;
mod trend_breakout;
mod volatility_squeeze;

pub use donchian::DonchianTrail;
pub use ensemble::Ensemble;
pub use opening_range::OpeningRange;
pub use pullback::Pullback;
pub use rsi_reversion::RsiReversion;
pub use support_resistance::SupportResistance;
pub use trend_breakout::TrendBreakout;
pub use volatility_squeeze::VolatilitySqueeze;

use common::{MarketSnapshot, PositionState, ReasonCode, Signal};

/// No-op signal: HOLD while in a position, NONE while flat.
pub(crate) fn idle(
    strategy: &str,
    snapshot: &MarketSnapshot,
    state: &PositionState,
    reason: ReasonCode,
    detail: impl Into<String>,
) -> Signal {
    if state.has_position {
        Signal::hold(&snapshot.symbol, strategy, reason, detail)
    } else {
        Signal::none(&snapshot.symbol, strategy, reason, detail)
    }
}

/// Returned when a strategy is handed another strategy's parameter bundle.
pub(crate) fn wrong_parameters(
    strategy: &str,
    snapshot: &MarketSnapshot,
    state: &PositionState,
) -> Signal {
    idle(
        strategy,
        snapshot,
        state,
        ReasonCode::InvalidParameters,
        "parameter bundle belongs to another strategy",
    )
}

/// Shared ATR exit used by the Donchian and pullback strategies: an initial
/// stop sized from the entry ATR, then a chandelier trail below the
/// high-water-mark.
pub(crate) fn atr_exit(
    strategy: &str,
    snapshot: &MarketSnapshot,
    state: &PositionState,
    entry_atr: Option<f64>,
    stop_mult: Option<f64>,
    trail_mult: f64,
) -> Signal {
    let Some(atr) = snapshot.atr else {
        return idle(strategy, snapshot, state, ReasonCode::DataMissing, "ATR unavailable");
    };
    let close = snapshot.close;

    if let (Some(entry_atr), Some(mult)) = (entry_atr, stop_mult) {
        let stop = state.entry_price - entry_atr * mult;
        if close < stop {
            return Signal::sell(
                &snapshot.symbol,
                strategy,
                ReasonCode::AtrInitialStop,
                format!("close {close:.2} below initial stop {stop:.2}"),
            );
        }
    }

    let peak = state.high_water_mark.unwrap_or(close);
    let trail = peak - atr * trail_mult;
    if close < trail {
        return Signal::sell(
            &snapshot.symbol,
            strategy,
            ReasonCode::AtrTrailStop,
            format!("close {close:.2} below chandelier {trail:.2} (peak {peak:.2})"),
        );
    }

    Signal::hold(
        &snapshot.symbol,
        strategy,
        ReasonCode::InPosition,
        format!("trail at {trail:.2}"),
    )
}
