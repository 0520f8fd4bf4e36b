//! Machine-readable reason codes attached to every signal and trade record.
//!
//! Codes are stable strings (`SCREAMING_SNAKE_CASE`) so decision logs can be
//! aggregated without parsing the free-form detail text.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    // No-ops
    DataMissing,
    InvalidSnapshot,
    InvalidParameters,
    NoSetup,
    InPosition,
    OutsideEntryWindow,
    SpreadTooWide,
    BelowTrend,
    VolumeTooLow,
    BoxTooWide,
    RsiOversold,
    SqueezeActive,

    // Entries
    BreakoutVol,
    RsiCrossUp,
    BoxBreakout,
    DonchianBreak,
    PullbackRebound,
    OrbBreak,
    SqueezeBreak,
    EnsembleBuy,

    // Exits
    StopLoss,
    TakeProfit,
    TakeProfitPartial,
    TrendBroken,
    EodFlatten,
    RsiOverbought,
    TrailingStop,
    TimeExit,
    AtrInitialStop,
    AtrTrailStop,
    OrbFail,
    EnsembleSell,
    ForceLiquidation,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::DataMissing => "DATA_MISSING",
            ReasonCode::InvalidSnapshot => "INVALID_SNAPSHOT",
            ReasonCode::InvalidParameters => "INVALID_PARAMETERS",
            ReasonCode::NoSetup => "NO_SETUP",
            ReasonCode::InPosition => "IN_POSITION",
            ReasonCode::OutsideEntryWindow => "OUTSIDE_ENTRY_WINDOW",
            ReasonCode::SpreadTooWide => "SPREAD_TOO_WIDE",
            ReasonCode::BelowTrend => "BELOW_TREND",
            ReasonCode::VolumeTooLow => "VOLUME_TOO_LOW",
            ReasonCode::BoxTooWide => "BOX_TOO_WIDE",
            ReasonCode::RsiOversold => "RSI_OVERSOLD",
            ReasonCode::SqueezeActive => "SQUEEZE_ACTIVE",
            ReasonCode::BreakoutVol => "BREAKOUT_VOL",
            ReasonCode::RsiCrossUp => "RSI_CROSS_UP",
            ReasonCode::BoxBreakout => "BOX_BREAKOUT",
            ReasonCode::DonchianBreak => "DONCHIAN_BREAK",
            ReasonCode::PullbackRebound => "PULLBACK_REBOUND",
            ReasonCode::OrbBreak => "ORB_BREAK",
            ReasonCode::SqueezeBreak => "SQUEEZE_BREAK",
            ReasonCode::EnsembleBuy => "ENSEMBLE_BUY",
            ReasonCode::StopLoss => "STOP_LOSS",
            ReasonCode::TakeProfit => "TAKE_PROFIT",
            ReasonCode::TakeProfitPartial => "TAKE_PROFIT_PARTIAL",
            ReasonCode::TrendBroken => "TREND_BROKEN",
            ReasonCode::EodFlatten => "EOD_FLATTEN",
            ReasonCode::RsiOverbought => "RSI_OVERBOUGHT",
            ReasonCode::TrailingStop => "TRAILING_STOP",
            ReasonCode::TimeExit => "TIME_EXIT",
            ReasonCode::AtrInitialStop => "ATR_INITIAL_STOP",
            ReasonCode::AtrTrailStop => "ATR_TRAIL_STOP",
            ReasonCode::OrbFail => "ORB_FAIL",
            ReasonCode::EnsembleSell => "ENSEMBLE_SELL",
            ReasonCode::ForceLiquidation => "FORCE_LIQUIDATION",
        }
    }

    /// True for codes that close or reduce a position.
    pub fn is_exit(&self) -> bool {
        matches!(
            self,
            ReasonCode::StopLoss
                | ReasonCode::TakeProfit
                | ReasonCode::TakeProfitPartial
                | ReasonCode::TrendBroken
                | ReasonCode::EodFlatten
                | ReasonCode::RsiOverbought
                | ReasonCode::TrailingStop
                | ReasonCode::TimeExit
                | ReasonCode::AtrInitialStop
                | ReasonCode::AtrTrailStop
                | ReasonCode::OrbFail
                | ReasonCode::EnsembleSell
                | ReasonCode::ForceLiquidation
        )
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde_name() {
        for code in [
            ReasonCode::DataMissing,
            ReasonCode::DonchianBreak,
            ReasonCode::TakeProfitPartial,
            ReasonCode::ForceLiquidation,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{code}\""));
        }
    }

    #[test]
    fn exit_codes_are_classified() {
        assert!(ReasonCode::TrailingStop.is_exit());
        assert!(ReasonCode::ForceLiquidation.is_exit());
        assert!(!ReasonCode::DonchianBreak.is_exit());
        assert!(!ReasonCode::DataMissing.is_exit());
    }
}
