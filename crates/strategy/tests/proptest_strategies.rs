use chrono::NaiveDate;
use proptest::option;
use proptest::prelude::*;

use common::{Candle, MarketSnapshot, PositionState, ReasonCode, SignalKind, StrategyId};
use strategy::{evaluate_snapshot, Strategy as _, StrategyRegistry};

fn level() -> impl Strategy<Value = Option<f64>> {
    option::of(1.0f64..2_000.0)
}

prop_compose! {
    fn arb_snapshot()(
        close in 1.0f64..2_000.0,
        minute in 0u32..390,
        prices in (level(), level(), level(), level(), level(), level(), level(), level()),
        ratios in (option::of(0.0f64..10.0), option::of(0.0f64..100.0), option::of(0.0f64..100.0),
                   option::of(0.01f64..50.0), option::of(any::<bool>()), option::of(0.0f64..2.0)),
    ) -> MarketSnapshot {
        let timestamp = NaiveDate::from_ymd_opt(2024, 4, 15)
            .and_then(|d| d.and_hms_opt(9 + minute / 60, minute % 60, 0))
            .unwrap();
        let mut s = MarketSnapshot::from_candle(
            "005930",
            &Candle { timestamp, open: close, high: close, low: close, close, volume: 1_000.0 },
        );
        (s.ma_short, s.ma_long, s.breakout_price, s.donchian_high,
         s.range_high, s.range_low, s.opening_range_high, s.opening_range_low) = prices;
        (s.volume_ratio, s.rsi, s.atr_percentile, s.atr, s.ma_short_rising, s.spread_pct) = ratios;
        s
    }
}

proptest! {
    /// A strategy holding a position may only SELL or HOLD; a flat one may
    /// only BUY or stay idle.
    #[test]
    fn signal_kind_respects_position(
        snap in arb_snapshot(),
        entry in 1.0f64..2_000.0,
        peak_bump in 0.0f64..500.0,
        idx in 0usize..StrategyId::ALL.len(),
    ) {
        let registry = StrategyRegistry::builtin();
        let strategy = registry.get(StrategyId::ALL[idx]).unwrap();
        let params = strategy.default_parameters();

        let mut flat = PositionState::new("005930", 10_000_000.0);
        let signal = evaluate_snapshot(strategy.as_ref(), &snap, &mut flat, &params);
        prop_assert!(matches!(signal.kind(), SignalKind::Buy | SignalKind::None), "{signal:?}");

        let mut holding = PositionState::new("005930", 10_000_000.0);
        holding.open(entry, 10, snap.timestamp);
        holding.mark_price(entry + peak_bump);
        let signal = evaluate_snapshot(strategy.as_ref(), &snap, &mut holding, &params);
        prop_assert!(matches!(signal.kind(), SignalKind::Sell | SignalKind::Hold), "{signal:?}");
        prop_assert!((0.0..=1.0).contains(&signal.confidence()));
        prop_assert!((0.0..=1.0).contains(&signal.size_fraction()));
    }

    /// Non-positive prices never reach a strategy.
    #[test]
    fn invalid_price_is_rejected_up_front(close in -1_000.0f64..=0.0, idx in 0usize..StrategyId::ALL.len()) {
        let registry = StrategyRegistry::builtin();
        let strategy = registry.get(StrategyId::ALL[idx]).unwrap();
        let mut snap = arb_bare(1.0);
        snap.close = close;
        let mut state = PositionState::new("005930", 10_000_000.0);
        let signal = evaluate_snapshot(strategy.as_ref(), &snap, &mut state, &strategy.default_parameters());
        prop_assert_eq!(signal.kind(), SignalKind::None);
        prop_assert_eq!(signal.reason(), ReasonCode::InvalidSnapshot);
    }
}

fn arb_bare(close: f64) -> MarketSnapshot {
    let timestamp = NaiveDate::from_ymd_opt(2024, 4, 15)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap();
    MarketSnapshot::from_candle(
        "005930",
        &Candle { timestamp, open: close, high: close, low: close, close, volume: 1_000.0 },
    )
}

#[test]
fn empty_snapshot_reports_missing_data() {
    let registry = StrategyRegistry::builtin();
    for id in StrategyId::ALL {
        let strategy = registry.get(id).unwrap();
        let mut state = PositionState::new("005930", 10_000_000.0);
        let signal = evaluate_snapshot(strategy.as_ref(), &arb_bare(100.0), &mut state, &strategy.default_parameters());
        assert_eq!(signal.kind(), SignalKind::None, "{id}");
        assert_eq!(signal.reason(), ReasonCode::DataMissing, "{id}");
    }
}
