use chrono::NaiveDate;
use proptest::prelude::*;

use common::{PositionState, ReasonCode, RejectionReason, Signal, SignalKind};
use risk::{AccountSnapshot, DailyPnlTracker, KillSwitch, RiskConfig, RiskGate};

fn signal(kind: u8) -> Signal {
    match kind % 4 {
        0 => Signal::buy("005930", "prop", ReasonCode::BreakoutVol, ""),
        1 => Signal::sell("005930", "prop", ReasonCode::StopLoss, ""),
        2 => Signal::hold("005930", "prop", ReasonCode::InPosition, ""),
        _ => Signal::none("005930", "prop", ReasonCode::NoSetup, ""),
    }
}

proptest! {
    /// Gate decisions on arbitrary P/L values never panic, and any value at
    /// or below the limit leaves the switch tripped.
    #[test]
    fn loss_limit_is_sticky(
        daily_pnl_pct in -100.0f64..100.0,
        limit in 0.1f64..20.0,
        kind in any::<u8>(),
        in_position in any::<bool>(),
    ) {
        let gate = RiskGate::new(
            RiskConfig { daily_loss_limit_pct: limit, max_daily_entries: None },
            KillSwitch::in_memory(),
        );
        let mut position = PositionState::new("005930", 1_000_000.0);
        if in_position {
            let at = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(9, 0, 0).unwrap();
            position.open(100.0, 1, at);
        }
        let result = gate.validate(&signal(kind), &position, &AccountSnapshot { daily_pnl_pct });

        if daily_pnl_pct <= -limit {
            prop_assert!(
                matches!(result, Err(RejectionReason::DailyLossLimit { .. })),
                "expected DailyLossLimit, got {:?}",
                result
            );
            prop_assert!(!gate.kill_switch().is_active());
        } else {
            prop_assert!(gate.kill_switch().is_active());
        }
    }

    /// HOLD and NONE are never rejected while the switch is active and the
    /// limit holds.
    #[test]
    fn no_op_signals_pass(kind in 2u8..4, daily_pnl_pct in -4.9f64..100.0) {
        let gate = RiskGate::new(RiskConfig::default(), KillSwitch::in_memory());
        let position = PositionState::new("005930", 1_000_000.0);
        let s = signal(kind);
        prop_assert!(!s.kind().is_actionable());
        prop_assert_eq!(gate.validate(&s, &position, &AccountSnapshot { daily_pnl_pct }), Ok(()));
    }

    /// Daily P/L stays finite for positive equity marks.
    #[test]
    fn tracker_is_finite(marks in proptest::collection::vec((0u32..3, 1u32..4, 1.0f64..1e9), 1..50)) {
        let mut tracker = DailyPnlTracker::new();
        for (key, day, equity) in marks {
            let day = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
            tracker.mark(&format!("k{key}"), day, equity);
        }
        prop_assert!(tracker.daily_pnl_pct().is_finite());
    }
}

#[test]
fn buy_after_reactivation_is_evaluated_normally() {
    let gate = RiskGate::new(RiskConfig::default(), KillSwitch::in_memory());
    let flat = PositionState::new("005930", 1_000_000.0);
    let buy = signal(0);
    assert_eq!(buy.kind(), SignalKind::Buy);

    gate.kill_switch().trip("manual");
    assert_eq!(
        gate.validate(&buy, &flat, &AccountSnapshot::default()),
        Err(RejectionReason::KillSwitchInactive)
    );
    gate.kill_switch().reactivate();
    assert_eq!(gate.validate(&buy, &flat, &AccountSnapshot::default()), Ok(()));
}
