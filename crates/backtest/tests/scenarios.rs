use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use rust_decimal_macros::dec;

use backtest::{BacktestConfig, BacktestRequest, BacktestService, Backtester};
use common::{
    Candle, CandleProvider, Error, MemoryDecisionSink, OrderSide, ReasonCode, Result, StrategyId,
};
use risk::{KillSwitch, RiskConfig, RiskGate};
use strategy::params::TrendBreakoutParams;
use strategy::{Strategy as _, StrategyParameters, StrategyRegistry};

fn origin() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(15, 30, 0)
        .unwrap()
}

fn candle(i: usize, close: f64, volume: f64) -> Candle {
    Candle {
        timestamp: origin() + Duration::days(i as i64),
        open: close,
        high: close,
        low: close,
        close,
        volume,
    }
}

fn backtester() -> Backtester {
    Backtester::new(
        BacktestConfig::default(),
        RiskGate::new(RiskConfig::default(), KillSwitch::in_memory()),
    )
}

#[test]
fn donchian_breaks_out_once_after_flat_base() {
    let mut candles: Vec<Candle> = (0..25).map(|i| candle(i, 100.0, 1_000.0)).collect();
    candles.push(candle(25, 110.0, 5_000.0));
    candles.extend((26..30).map(|i| candle(i, 112.0, 1_000.0)));

    let sink = Arc::new(MemoryDecisionSink::new());
    let registry = StrategyRegistry::builtin();
    let donchian = registry.get(StrategyId::DonchianTrail).unwrap();
    let result = backtester()
        .with_decision_sink(sink.clone())
        .run(donchian.as_ref(), &donchian.default_parameters(), "005930", &candles)
        .unwrap();

    let breaks = sink
        .records()
        .iter()
        .filter(|r| r.reason == ReasonCode::DonchianBreak)
        .count();
    assert_eq!(breaks, 1);

    assert_eq!(result.trades.len(), 2);
    assert_eq!(result.trades[0].side, OrderSide::Buy);
    assert_eq!(result.trades[0].quantity, 90_909);
    assert_eq!(result.trades[1].reason, ReasonCode::ForceLiquidation);
    assert_eq!(result.realized_pnl, dec!(181818));
    assert_eq!(result.final_balance, dec!(10181818));
}

#[test]
fn trend_breakout_scales_out_then_stops_out() {
    let mut candles: Vec<Candle> = (0..25).map(|i| candle(i, 100.0, 1_000.0)).collect();
    candles.push(candle(25, 110.0, 5_000.0));
    candles.push(candle(26, 114.0, 1_000.0));
    candles.push(candle(27, 114.0, 1_000.0));
    candles.push(candle(28, 107.0, 1_000.0));

    let params = StrategyParameters::TrendBreakout(TrendBreakoutParams {
        use_long_ma_filter: false,
        ..TrendBreakoutParams::default()
    });
    let registry = StrategyRegistry::builtin();
    let trend = registry.get(StrategyId::TrendBreakout).unwrap();
    let result = backtester().run(trend.as_ref(), &params, "005930", &candles).unwrap();

    let reasons: Vec<ReasonCode> = result.trades.iter().map(|t| t.reason).collect();
    assert_eq!(
        reasons,
        [ReasonCode::BreakoutVol, ReasonCode::TakeProfitPartial, ReasonCode::StopLoss]
    );
    assert_eq!(result.trades[0].quantity, 90_909);
    assert_eq!(result.trades[1].quantity, 45_454);
    assert!(result.trades[1].partial);
    assert_eq!(result.trades[2].quantity, 45_455);
    assert!(!result.trades[2].partial);
    assert_eq!(result.round_trips, 1);
    assert_eq!(result.partial_exits, 1);
    // 45,454 * 4 - 45,455 * 3
    assert_eq!(result.realized_pnl, dec!(45451));
    assert_eq!(result.final_balance, dec!(10045451));
}

#[test]
fn kill_switch_trip_does_not_leak_into_the_next_run() {
    let mut candles: Vec<Candle> = (0..25).map(|i| candle(i, 100.0, 1_000.0)).collect();
    candles.push(candle(25, 110.0, 5_000.0));
    candles.extend((26..32).map(|i| candle(i, 50.0, 1_000.0)));

    let kill_switch = KillSwitch::in_memory();
    let bt = Backtester::new(
        BacktestConfig::default(),
        RiskGate::new(RiskConfig::default(), kill_switch.clone()),
    );
    let registry = StrategyRegistry::builtin();
    let donchian = registry.get(StrategyId::DonchianTrail).unwrap();
    let params = donchian.default_parameters();

    let first = bt.run(donchian.as_ref(), &params, "005930", &candles).unwrap();
    let second = bt.run(donchian.as_ref(), &params, "005930", &candles).unwrap();

    // the crash trips the daily loss limit, so later exits are refused
    assert!(first.rejected_signals > 0);
    assert_eq!(first.trades.len(), 2);
    assert_eq!(first, second);
    assert!(kill_switch.is_active());
}

fn wave(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let x = i as f64;
            let close = 10_000.0 + 800.0 * (x / 6.0).sin() + 15.0 * x;
            let volume = 1_000.0 + 900.0 * (x / 3.0).cos().abs();
            Candle {
                timestamp: origin() + Duration::days(i as i64),
                open: close - 20.0,
                high: close + 60.0,
                low: close - 60.0,
                close,
                volume,
            }
        })
        .collect()
}

#[test]
fn identical_inputs_give_identical_results() {
    let candles = wave(200);
    let registry = StrategyRegistry::builtin();
    for id in StrategyId::ALL {
        let strategy = registry.get(id).unwrap();
        let params = strategy.default_parameters();

        let first_sink = Arc::new(MemoryDecisionSink::new());
        let first = backtester()
            .with_decision_sink(first_sink.clone())
            .run(strategy.as_ref(), &params, "005930", &candles)
            .unwrap();
        let second_sink = Arc::new(MemoryDecisionSink::new());
        let second = backtester()
            .with_decision_sink(second_sink.clone())
            .run(strategy.as_ref(), &params, "005930", &candles)
            .unwrap();

        assert_eq!(first, second, "{id}");
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
        assert_eq!(first_sink.records(), second_sink.records());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Every run ends flat with cash equal to start plus realized P/L.
    #[test]
    fn runs_end_flat_and_balanced(
        steps in proptest::collection::vec(-0.04f64..0.04, 40..120),
        volumes in proptest::collection::vec(100.0f64..5_000.0, 120),
        idx in 0usize..StrategyId::ALL.len(),
    ) {
        let mut close = 10_000.0;
        let candles: Vec<Candle> = steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                close *= 1.0 + step;
                let mut c = candle(i, close, volumes[i]);
                c.high = close * 1.01;
                c.low = close * 0.99;
                c
            })
            .collect();

        let registry = StrategyRegistry::builtin();
        let strategy = registry.get(StrategyId::ALL[idx]).unwrap();
        let result = backtester()
            .run(strategy.as_ref(), &strategy.default_parameters(), "005930", &candles)
            .unwrap();

        prop_assert_eq!(result.final_balance, result.starting_balance + result.realized_pnl);
        let bought: u64 = result.trades.iter().filter(|t| t.side == OrderSide::Buy).map(|t| t.quantity).sum();
        let sold: u64 = result.trades.iter().filter(|t| t.side == OrderSide::Sell).map(|t| t.quantity).sum();
        prop_assert_eq!(bought, sold);
        prop_assert!(result.final_balance >= dec!(0));
    }
}

struct FixedProvider(Vec<Candle>);

#[async_trait]
impl CandleProvider for FixedProvider {
    async fn fetch_candles(
        &self,
        _symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Candle>> {
        Ok(self
            .0
            .iter()
            .filter(|c| c.timestamp >= start && c.timestamp <= end)
            .copied()
            .collect())
    }
}

fn service(candles: Vec<Candle>) -> BacktestService {
    BacktestService::new(Arc::new(FixedProvider(candles)), StrategyRegistry::builtin(), backtester())
}

#[tokio::test]
async fn service_runs_requested_window() {
    let svc = service(wave(120));
    let request = BacktestRequest {
        symbol: "005930".into(),
        strategy: StrategyId::RsiReversion,
        params: None,
        start: origin(),
        end: origin() + Duration::days(59),
    };
    let result = svc.run(&request).await.unwrap();
    assert_eq!(result.bars, 60);
    assert_eq!(result.strategy, StrategyId::RsiReversion);
}

#[tokio::test]
async fn service_reports_empty_history() {
    let svc = service(Vec::new());
    let request = BacktestRequest {
        symbol: "005930".into(),
        strategy: StrategyId::Pullback,
        params: None,
        start: origin(),
        end: origin() + Duration::days(30),
    };
    let err = svc.run(&request).await.unwrap_err();
    assert!(matches!(err, Error::InsufficientData { bars: 0, .. }));
}
