use common::{MarketSnapshot, PositionState, ReasonCode, RsiReversionMemory, Signal, StrategyId};

use crate::params::{RsiReversionParams, StrategyParameters};
use crate::strategies::{idle, wrong_parameters};
use crate::Strategy;

const ID: StrategyId = StrategyId::RsiReversion;

/// Short-term mean reversion on RSI.
///
/// Entry is edge-triggered: RSI must first close at or below the entry
/// threshold, and the BUY fires on the first bar back above it.
///
/// Exit precedence: RSI overbought, stop-loss, take-profit, trailing stop
/// (armed once the minimum profit is reached), max holding time.
#[derive(Debug, Default, Clone, Copy)]
pub struct RsiReversion;

impl Strategy for RsiReversion {
    fn id(&self) -> StrategyId {
        ID
    }

    fn name(&self) -> &str {
        "RSI Mean Reversion"
    }

    fn description(&self) -> &str {
        "Buys the first recovery of RSI out of oversold territory and exits on \
         overbought RSI, fixed targets or a trailing stop from the peak."
    }

    fn evaluate(
        &self,
        snapshot: &MarketSnapshot,
        state: &mut PositionState,
        params: &StrategyParameters,
    ) -> Signal {
        let StrategyParameters::RsiReversion(p) = params else {
            return wrong_parameters(self.name(), snapshot, state);
        };
        if state.has_position {
            self.exit(snapshot, state, p)
        } else {
            self.entry(snapshot, state, p)
        }
    }
}

impl RsiReversion {
    fn exit(&self, snap: &MarketSnapshot, state: &PositionState, p: &RsiReversionParams) -> Signal {
        let name = self.name();
        let close = snap.close;
        let pnl = state.unrealized_pnl_pct(close).unwrap_or(0.0);

        if let Some(rsi) = snap.rsi {
            if rsi >= p.exit_threshold {
                return Signal::sell(&snap.symbol, name, ReasonCode::RsiOverbought, format!("RSI {rsi:.1}"));
            }
        }
        if pnl <= -p.stop_loss_pct {
            return Signal::sell(&snap.symbol, name, ReasonCode::StopLoss, format!("P/L {pnl:.2}%"));
        }
        if pnl >= p.take_profit_pct {
            return Signal::sell(&snap.symbol, name, ReasonCode::TakeProfit, format!("P/L {pnl:.2}%"));
        }
        if p.trailing_enabled && pnl > p.trailing_min_profit_pct {
            if let Some(drop) = state.drawdown_from_peak_pct(close) {
                if drop >= p.trailing_stop_pct {
                    return Signal::sell(
                        &snap.symbol,
                        name,
                        ReasonCode::TrailingStop,
                        format!("{drop:.2}% off peak, P/L {pnl:.2}%"),
                    );
                }
            }
        }
        if let (Some(limit), Some(entered)) = (p.max_hold_minutes, state.entry_time) {
            let held = (snap.timestamp - entered).num_minutes();
            if held >= limit {
                return Signal::sell(&snap.symbol, name, ReasonCode::TimeExit, format!("held {held} min"));
            }
        }

        Signal::hold(&snap.symbol, name, ReasonCode::InPosition, format!("P/L {pnl:.2}%"))
    }

    fn entry(&self, snap: &MarketSnapshot, state: &mut PositionState, p: &RsiReversionParams) -> Signal {
        let name = self.name();
        let Some(rsi) = snap.rsi else {
            return idle(name, snap, state, ReasonCode::DataMissing, "RSI unavailable");
        };

        let memory = state.memory_mut::<RsiReversionMemory>(ID);
        if rsi <= p.entry_threshold {
            memory.was_oversold = true;
            return Signal::none(&snap.symbol, name, ReasonCode::RsiOversold, format!("RSI {rsi:.1}, waiting for recovery"));
        }
        if memory.was_oversold {
            memory.was_oversold = false;
            return Signal::buy(
                &snap.symbol,
                name,
                ReasonCode::RsiCrossUp,
                format!("RSI {rsi:.1} crossed above {:.1}", p.entry_threshold),
            );
        }
        Signal::none(&snap.symbol, name, ReasonCode::NoSetup, format!("RSI {rsi:.1}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testkit::{at, bare, flat, holding};
    use common::SignalKind;

    fn with_rsi(close: f64, rsi: f64) -> MarketSnapshot {
        let mut s = bare(close);
        s.rsi = Some(rsi);
        s
    }

    #[test]
    fn recovery_from_oversold_fires_exactly_once() {
        let p = StrategyParameters::RsiReversion(RsiReversionParams {
            entry_threshold: 30.0,
            ..RsiReversionParams::default()
        });
        let mut state = flat();
        let kinds: Vec<SignalKind> = [35.0, 25.0, 25.0, 35.0]
            .into_iter()
            .map(|rsi| RsiReversion.evaluate(&with_rsi(100.0, rsi), &mut state, &p).kind())
            .collect();
        assert_eq!(
            kinds,
            vec![SignalKind::None, SignalKind::None, SignalKind::None, SignalKind::Buy]
        );
        // Staying above the threshold does not re-fire.
        let next = RsiReversion.evaluate(&with_rsi(100.0, 36.0), &mut state, &p);
        assert_eq!(next.kind(), SignalKind::None);
    }

    #[test]
    fn trailing_stop_uses_high_water_mark() {
        let p = StrategyParameters::RsiReversion(RsiReversionParams {
            trailing_stop_pct: 2.0,
            take_profit_pct: 50.0,
            ..RsiReversionParams::default()
        });
        let mut state = holding(100.0);
        state.mark_price(110.0);

        let sold = RsiReversion.evaluate(&with_rsi(107.5, 50.0), &mut state, &p);
        assert_eq!(sold.kind(), SignalKind::Sell);
        assert_eq!(sold.reason(), ReasonCode::TrailingStop);

        let kept = RsiReversion.evaluate(&with_rsi(108.5, 50.0), &mut state, &p);
        assert_eq!(kept.kind(), SignalKind::Hold);
    }

    #[test]
    fn trailing_stop_waits_for_minimum_profit() {
        let p = StrategyParameters::RsiReversion(RsiReversionParams {
            trailing_stop_pct: 1.0,
            trailing_min_profit_pct: 0.5,
            stop_loss_pct: 5.0,
            ..RsiReversionParams::default()
        });
        let mut state = holding(100.0);
        state.mark_price(101.5);
        // 1.28% off the peak but only 0.2% in profit
        let signal = RsiReversion.evaluate(&with_rsi(100.2, 50.0), &mut state, &p);
        assert_eq!(signal.kind(), SignalKind::Hold);
    }

    #[test]
    fn overbought_rsi_exits_first() {
        let p = StrategyParameters::RsiReversion(RsiReversionParams::default());
        let signal = RsiReversion.evaluate(&with_rsi(90.0, 70.0), &mut holding(100.0), &p);
        assert_eq!(signal.reason(), ReasonCode::RsiOverbought);
    }

    #[test]
    fn max_hold_closes_position() {
        let p = StrategyParameters::RsiReversion(RsiReversionParams {
            max_hold_minutes: Some(20),
            ..RsiReversionParams::default()
        });
        let mut snap = with_rsi(100.1, 50.0);
        snap.timestamp = at(9, 55);
        let signal = RsiReversion.evaluate(&snap, &mut holding(100.0), &p);
        assert_eq!(signal.reason(), ReasonCode::TimeExit);
    }
}
