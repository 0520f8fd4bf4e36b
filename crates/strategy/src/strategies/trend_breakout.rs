use common::{MarketSnapshot, PositionState, ReasonCode, Signal, StrategyId};

use crate::params::{StrategyParameters, TrendBreakoutParams};
use crate::strategies::{idle, wrong_parameters};
use crate::Strategy;

const ID: StrategyId = StrategyId::TrendBreakout;

/// Breakout above the N-bar high on heavy volume, inside an uptrend.
///
/// Exit precedence: end-of-day flatten, stop-loss, (partial) take-profit
/// until a partial exit has filled, close back under the short MA.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrendBreakout;

impl Strategy for TrendBreakout {
    fn id(&self) -> StrategyId {
        ID
    }

    fn name(&self) -> &str {
        "Trend Breakout"
    }

    fn description(&self) -> &str {
        "Buys a close above the recent high with volume confirmation while price \
         holds above its short moving average; scales out at the first target."
    }

    fn evaluate(
        &self,
        snapshot: &MarketSnapshot,
        state: &mut PositionState,
        params: &StrategyParameters,
    ) -> Signal {
        let StrategyParameters::TrendBreakout(p) = params else {
            return wrong_parameters(self.name(), snapshot, state);
        };
        if state.has_position {
            self.exit(snapshot, state, p)
        } else {
            self.entry(snapshot, state, p)
        }
    }
}

impl TrendBreakout {
    fn exit(&self, snap: &MarketSnapshot, state: &mut PositionState, p: &TrendBreakoutParams) -> Signal {
        let name = self.name();
        let close = snap.close;

        if let Some(cutoff) = p.flatten_at {
            if snap.timestamp.time() >= cutoff {
                return Signal::sell(&snap.symbol, name, ReasonCode::EodFlatten, format!("flatten at {cutoff}"));
            }
        }

        let pnl = state.unrealized_pnl_pct(close).unwrap_or(0.0);
        if pnl <= -p.stop_loss_pct {
            return Signal::sell(&snap.symbol, name, ReasonCode::StopLoss, format!("P/L {pnl:.2}%"));
        }

        // partial_exits only moves on a confirmed fill, so a rejected or
        // failed partial sell is retried on the next bar
        if state.partial_exits == 0 && pnl >= p.take_profit_pct {
            if p.take_profit_fraction < 1.0 {
                return Signal::sell(
                    &snap.symbol,
                    name,
                    ReasonCode::TakeProfitPartial,
                    format!("P/L {pnl:.2}%, selling {:.0}%", p.take_profit_fraction * 100.0),
                )
                .with_size_fraction(p.take_profit_fraction);
            }
            return Signal::sell(&snap.symbol, name, ReasonCode::TakeProfit, format!("P/L {pnl:.2}%"));
        }

        match snap.ma_short {
            Some(ma) if close < ma => Signal::sell(
                &snap.symbol,
                name,
                ReasonCode::TrendBroken,
                format!("close {close:.2} below MA{} {ma:.2}", p.ma_short_period),
            ),
            Some(_) => Signal::hold(&snap.symbol, name, ReasonCode::InPosition, format!("P/L {pnl:.2}%")),
            None => idle(name, snap, state, ReasonCode::DataMissing, "short MA unavailable"),
        }
    }

    fn entry(&self, snap: &MarketSnapshot, state: &mut PositionState, p: &TrendBreakoutParams) -> Signal {
        let name = self.name();

        let (Some(ma_short), Some(breakout), Some(volume_ratio)) =
            (snap.ma_short, snap.breakout_price, snap.volume_ratio)
        else {
            return idle(name, snap, state, ReasonCode::DataMissing, "MA, breakout level or volume ratio unavailable");
        };
        let ma_long = match (p.use_long_ma_filter, snap.ma_long) {
            (true, None) => {
                return idle(name, snap, state, ReasonCode::DataMissing, "long MA unavailable");
            }
            (true, Some(ma)) => Some(ma),
            (false, _) => None,
        };

        let time = snap.timestamp.time();
        let after_cutoff = p.flatten_at.is_some_and(|cutoff| time >= cutoff);
        let before_start = p.entry_start.is_some_and(|start| time < start);
        let after_end = p.entry_end.is_some_and(|end| time > end);
        if after_cutoff || before_start || after_end {
            return idle(name, snap, state, ReasonCode::OutsideEntryWindow, format!("{time} outside entry window"));
        }

        if let (Some(max), Some(spread)) = (p.max_spread_pct, snap.spread_pct) {
            if spread > max {
                return idle(name, snap, state, ReasonCode::SpreadTooWide, format!("spread {spread:.2}% > {max:.2}%"));
            }
        }

        let close = snap.close;
        if close <= ma_short {
            return idle(name, snap, state, ReasonCode::BelowTrend, format!("close {close:.2} <= MA {ma_short:.2}"));
        }
        if let Some(ma_long) = ma_long {
            if ma_short <= ma_long {
                return idle(name, snap, state, ReasonCode::BelowTrend, format!("MA {ma_short:.2} <= long MA {ma_long:.2}"));
            }
        }
        if p.require_rising_ma && snap.ma_short_rising != Some(true) {
            return idle(name, snap, state, ReasonCode::BelowTrend, "short MA not rising");
        }

        let threshold = breakout * (1.0 + p.breakout_buffer_pct / 100.0);
        if close <= threshold {
            return idle(name, snap, state, ReasonCode::NoSetup, format!("close {close:.2} <= trigger {threshold:.2}"));
        }
        if volume_ratio < p.volume_multiplier {
            return idle(
                name,
                snap,
                state,
                ReasonCode::VolumeTooLow,
                format!("volume ratio {volume_ratio:.2} < {:.2}", p.volume_multiplier),
            );
        }

        Signal::buy(
            &snap.symbol,
            name,
            ReasonCode::BreakoutVol,
            format!("close {close:.2} > {threshold:.2} on {volume_ratio:.1}x volume"),
        )
    }
}
