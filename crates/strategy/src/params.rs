//! Typed parameter bundles, one per strategy, with documented defaults.
//!
//! Percent values are plain percents (`2.5` = 2.5 %). Stop-loss percents are
//! positive distances below entry.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use common::{Error, Result, StrategyId};

use crate::indicators::{IndicatorSettings, OpeningRangeSettings};

/// Parameter bundle for one strategy instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "params", rename_all = "snake_case")]
pub enum StrategyParameters {
    TrendBreakout(TrendBreakoutParams),
    RsiReversion(RsiReversionParams),
    SupportResistance(SupportResistanceParams),
    DonchianTrail(DonchianParams),
    Pullback(PullbackParams),
    OpeningRange(OpeningRangeParams),
    VolatilitySqueeze(SqueezeParams),
    Ensemble(EnsembleParams),
}

impl StrategyParameters {
    pub fn defaults_for(id: StrategyId) -> Self {
        match id {
            StrategyId::TrendBreakout => Self::TrendBreakout(Default::default()),
            StrategyId::RsiReversion => Self::RsiReversion(Default::default()),
            StrategyId::SupportResistance => Self::SupportResistance(Default::default()),
            StrategyId::DonchianTrail => Self::DonchianTrail(Default::default()),
            StrategyId::Pullback => Self::Pullback(Default::default()),
            StrategyId::OpeningRange => Self::OpeningRange(Default::default()),
            StrategyId::VolatilitySqueeze => Self::VolatilitySqueeze(Default::default()),
            StrategyId::Ensemble => Self::Ensemble(Default::default()),
        }
    }

    /// Strategy this bundle belongs to.
    pub fn strategy_id(&self) -> StrategyId {
        match self {
            Self::TrendBreakout(_) => StrategyId::TrendBreakout,
            Self::RsiReversion(_) => StrategyId::RsiReversion,
            Self::SupportResistance(_) => StrategyId::SupportResistance,
            Self::DonchianTrail(_) => StrategyId::DonchianTrail,
            Self::Pullback(_) => StrategyId::Pullback,
            Self::OpeningRange(_) => StrategyId::OpeningRange,
            Self::VolatilitySqueeze(_) => StrategyId::VolatilitySqueeze,
            Self::Ensemble(_) => StrategyId::Ensemble,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::TrendBreakout(p) => p.validate(),
            Self::RsiReversion(p) => p.validate(),
            Self::SupportResistance(p) => p.validate(),
            Self::DonchianTrail(p) => p.validate(),
            Self::Pullback(p) => p.validate(),
            Self::OpeningRange(p) => p.validate(),
            Self::VolatilitySqueeze(p) => p.validate(),
            Self::Ensemble(p) => p.validate(),
        }
    }

    pub fn indicator_settings(&self) -> IndicatorSettings {
        match self {
            Self::TrendBreakout(p) => p.indicator_settings(),
            Self::RsiReversion(p) => p.indicator_settings(),
            Self::SupportResistance(p) => p.indicator_settings(),
            Self::DonchianTrail(p) => p.indicator_settings(),
            Self::Pullback(p) => p.indicator_settings(),
            Self::OpeningRange(p) => p.indicator_settings(),
            Self::VolatilitySqueeze(p) => p.indicator_settings(),
            Self::Ensemble(p) => p.indicator_settings(),
        }
    }

    /// Parameters as a bare JSON object, without the variant tag.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self)
            .ok()
            .and_then(|mut v| v.get_mut("params").map(serde_json::Value::take))
            .unwrap_or(serde_json::Value::Null)
    }
}

// ─── Validation helpers ───────────────────────────────────────────────────────

fn positive_period(name: &str, v: usize, min: usize) -> Result<()> {
    if v < min {
        return Err(Error::Config(format!("{name} must be >= {min}, got {v}")));
    }
    Ok(())
}

fn positive(name: &str, v: f64) -> Result<()> {
    if !(v.is_finite() && v > 0.0) {
        return Err(Error::Config(format!("{name} must be positive, got {v}")));
    }
    Ok(())
}

fn non_negative(name: &str, v: f64) -> Result<()> {
    if !(v.is_finite() && v >= 0.0) {
        return Err(Error::Config(format!("{name} must not be negative, got {v}")));
    }
    Ok(())
}

fn fraction(name: &str, v: f64) -> Result<()> {
    if !(v > 0.0 && v <= 1.0) {
        return Err(Error::Config(format!("{name} must be in (0, 1], got {v}")));
    }
    Ok(())
}

fn percent_level(name: &str, v: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&v) {
        return Err(Error::Config(format!("{name} must be within 0..=100, got {v}")));
    }
    Ok(())
}

// ─── Trend / breakout ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrendBreakoutParams {
    /// N-bar high the close has to clear.
    pub lookback_high_bars: usize,
    pub breakout_buffer_pct: f64,
    pub avg_volume_window: usize,
    pub volume_multiplier: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    /// Share of the position sold at take-profit; `1.0` closes it.
    pub take_profit_fraction: f64,
    pub ma_short_period: usize,
    pub ma_long_period: usize,
    pub use_long_ma_filter: bool,
    pub require_rising_ma: bool,
    /// Entries are skipped while the quoted spread is wider than this.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_spread_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_start: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_end: Option<NaiveTime>,
    /// Positions are closed at or after this time of day.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatten_at: Option<NaiveTime>,
}

impl Default for TrendBreakoutParams {
    fn default() -> Self {
        Self {
            lookback_high_bars: 20,
            breakout_buffer_pct: 0.2,
            avg_volume_window: 20,
            volume_multiplier: 1.5,
            stop_loss_pct: 2.5,
            take_profit_pct: 3.0,
            take_profit_fraction: 0.5,
            ma_short_period: 20,
            ma_long_period: 60,
            use_long_ma_filter: true,
            require_rising_ma: false,
            max_spread_pct: Some(0.5),
            entry_start: None,
            entry_end: None,
            flatten_at: None,
        }
    }
}

impl TrendBreakoutParams {
    pub fn validate(&self) -> Result<()> {
        positive_period("lookback_high_bars", self.lookback_high_bars, 1)?;
        positive_period("avg_volume_window", self.avg_volume_window, 1)?;
        positive_period("ma_short_period", self.ma_short_period, 1)?;
        positive_period("ma_long_period", self.ma_long_period, 1)?;
        non_negative("breakout_buffer_pct", self.breakout_buffer_pct)?;
        positive("volume_multiplier", self.volume_multiplier)?;
        positive("stop_loss_pct", self.stop_loss_pct)?;
        positive("take_profit_pct", self.take_profit_pct)?;
        fraction("take_profit_fraction", self.take_profit_fraction)?;
        if self.use_long_ma_filter && self.ma_long_period <= self.ma_short_period {
            return Err(Error::Config(
                "ma_long_period must be longer than ma_short_period".into(),
            ));
        }
        if let Some(spread) = self.max_spread_pct {
            positive("max_spread_pct", spread)?;
        }
        match (self.entry_start, self.entry_end) {
            (Some(start), Some(end)) if start >= end => {
                return Err(Error::Config("entry_start must be before entry_end".into()))
            }
            _ => {}
        }
        Ok(())
    }

    pub fn indicator_settings(&self) -> IndicatorSettings {
        IndicatorSettings {
            ma_short: self.ma_short_period,
            ma_long: self.ma_long_period,
            volume_window: self.avg_volume_window,
            breakout_lookback: self.lookback_high_bars,
            ..IndicatorSettings::default()
        }
    }
}

// ─── RSI mean-reversion ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RsiReversionParams {
    pub rsi_period: usize,
    pub entry_threshold: f64,
    pub exit_threshold: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub trailing_enabled: bool,
    pub trailing_stop_pct: f64,
    /// Trailing stop only arms once unrealized profit exceeds this.
    pub trailing_min_profit_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_hold_minutes: Option<i64>,
}

impl Default for RsiReversionParams {
    fn default() -> Self {
        Self {
            rsi_period: 7,
            entry_threshold: 28.0,
            exit_threshold: 62.0,
            stop_loss_pct: 1.8,
            take_profit_pct: 2.2,
            trailing_enabled: true,
            trailing_stop_pct: 1.0,
            trailing_min_profit_pct: 0.5,
            max_hold_minutes: None,
        }
    }
}

impl RsiReversionParams {
    pub fn validate(&self) -> Result<()> {
        positive_period("rsi_period", self.rsi_period, 2)?;
        percent_level("entry_threshold", self.entry_threshold)?;
        percent_level("exit_threshold", self.exit_threshold)?;
        if self.entry_threshold >= self.exit_threshold {
            return Err(Error::Config(
                "entry_threshold must be below exit_threshold".into(),
            ));
        }
        positive("stop_loss_pct", self.stop_loss_pct)?;
        positive("take_profit_pct", self.take_profit_pct)?;
        if self.trailing_enabled {
            positive("trailing_stop_pct", self.trailing_stop_pct)?;
            non_negative("trailing_min_profit_pct", self.trailing_min_profit_pct)?;
        }
        if let Some(minutes) = self.max_hold_minutes {
            if minutes <= 0 {
                return Err(Error::Config("max_hold_minutes must be positive".into()));
            }
        }
        Ok(())
    }

    pub fn indicator_settings(&self) -> IndicatorSettings {
        IndicatorSettings {
            rsi_period: self.rsi_period,
            ..IndicatorSettings::default()
        }
    }
}

// ─── Support / resistance box ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SupportResistanceParams {
    pub range_lookback_bars: usize,
    /// Boxes wider than this, relative to their low, are ignored.
    pub max_box_width_pct: f64,
    pub breakout_buffer_pct: f64,
    pub volume_window: usize,
    pub volume_multiplier: f64,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
}

impl Default for SupportResistanceParams {
    fn default() -> Self {
        Self {
            range_lookback_bars: 40,
            max_box_width_pct: 10.0,
            breakout_buffer_pct: 0.2,
            volume_window: 20,
            volume_multiplier: 2.0,
            take_profit_pct: 4.0,
            stop_loss_pct: 2.5,
        }
    }
}

impl SupportResistanceParams {
    pub fn validate(&self) -> Result<()> {
        positive_period("range_lookback_bars", self.range_lookback_bars, 2)?;
        positive_period("volume_window", self.volume_window, 1)?;
        positive("max_box_width_pct", self.max_box_width_pct)?;
        non_negative("breakout_buffer_pct", self.breakout_buffer_pct)?;
        positive("volume_multiplier", self.volume_multiplier)?;
        positive("take_profit_pct", self.take_profit_pct)?;
        positive("stop_loss_pct", self.stop_loss_pct)
    }

    pub fn indicator_settings(&self) -> IndicatorSettings {
        IndicatorSettings {
            range_lookback: self.range_lookback_bars,
            volume_window: self.volume_window,
            ..IndicatorSettings::default()
        }
    }
}

// ─── Donchian / ATR trailing ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DonchianParams {
    pub donchian_period: usize,
    pub breakout_buffer_pct: f64,
    pub volume_window: usize,
    pub volume_multiplier: f64,
    pub atr_period: usize,
    /// Initial stop distance below entry, in entry ATRs.
    pub atr_stop_mult: f64,
    /// Chandelier distance below the high-water-mark, in current ATRs.
    pub atr_trail_mult: f64,
}

impl Default for DonchianParams {
    fn default() -> Self {
        Self {
            donchian_period: 20,
            breakout_buffer_pct: 0.0,
            volume_window: 20,
            volume_multiplier: 1.8,
            atr_period: 14,
            atr_stop_mult: 2.0,
            atr_trail_mult: 2.5,
        }
    }
}

impl DonchianParams {
    pub fn validate(&self) -> Result<()> {
        positive_period("donchian_period", self.donchian_period, 2)?;
        positive_period("volume_window", self.volume_window, 1)?;
        positive_period("atr_period", self.atr_period, 1)?;
        non_negative("breakout_buffer_pct", self.breakout_buffer_pct)?;
        positive("volume_multiplier", self.volume_multiplier)?;
        positive("atr_stop_mult", self.atr_stop_mult)?;
        positive("atr_trail_mult", self.atr_trail_mult)
    }

    pub fn indicator_settings(&self) -> IndicatorSettings {
        IndicatorSettings {
            donchian_period: self.donchian_period,
            volume_window: self.volume_window,
            atr_period: self.atr_period,
            ..IndicatorSettings::default()
        }
    }
}

// ─── Pullback in trend ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PullbackParams {
    pub trend_ma_period: usize,
    pub rsi_period: usize,
    pub rsi_pullback_threshold: f64,
    pub atr_period: usize,
    pub atr_stop_mult: f64,
    pub atr_trail_mult: f64,
}

impl Default for PullbackParams {
    fn default() -> Self {
        Self {
            trend_ma_period: 60,
            rsi_period: 14,
            rsi_pullback_threshold: 40.0,
            atr_period: 14,
            atr_stop_mult: 2.0,
            atr_trail_mult: 2.5,
        }
    }
}

impl PullbackParams {
    pub fn validate(&self) -> Result<()> {
        positive_period("trend_ma_period", self.trend_ma_period, 2)?;
        positive_period("rsi_period", self.rsi_period, 2)?;
        positive_period("atr_period", self.atr_period, 1)?;
        percent_level("rsi_pullback_threshold", self.rsi_pullback_threshold)?;
        positive("atr_stop_mult", self.atr_stop_mult)?;
        positive("atr_trail_mult", self.atr_trail_mult)
    }

    pub fn indicator_settings(&self) -> IndicatorSettings {
        IndicatorSettings {
            ma_long: self.trend_ma_period,
            rsi_period: self.rsi_period,
            atr_period: self.atr_period,
            ..IndicatorSettings::default()
        }
    }
}

// ─── Opening range breakout ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpeningRangeParams {
    pub session_open: NaiveTime,
    pub opening_range_minutes: u32,
    /// Entries are allowed until this many minutes after the open.
    pub entry_window_minutes: u32,
    pub volume_window: usize,
    pub min_volume_ratio: f64,
    pub max_hold_minutes: i64,
}

impl Default for OpeningRangeParams {
    fn default() -> Self {
        Self {
            session_open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            opening_range_minutes: 10,
            entry_window_minutes: 60,
            volume_window: 20,
            min_volume_ratio: 2.0,
            max_hold_minutes: 30,
        }
    }
}

impl OpeningRangeParams {
    pub fn validate(&self) -> Result<()> {
        if self.opening_range_minutes == 0 {
            return Err(Error::Config("opening_range_minutes must be positive".into()));
        }
        if self.entry_window_minutes <= self.opening_range_minutes {
            return Err(Error::Config(
                "entry_window_minutes must exceed opening_range_minutes".into(),
            ));
        }
        positive_period("volume_window", self.volume_window, 1)?;
        positive("min_volume_ratio", self.min_volume_ratio)?;
        if self.max_hold_minutes <= 0 {
            return Err(Error::Config("max_hold_minutes must be positive".into()));
        }
        Ok(())
    }

    pub fn range_settings(&self) -> OpeningRangeSettings {
        OpeningRangeSettings {
            session_open: self.session_open,
            minutes: self.opening_range_minutes,
        }
    }

    pub fn indicator_settings(&self) -> IndicatorSettings {
        IndicatorSettings {
            volume_window: self.volume_window,
            opening_range: Some(self.range_settings()),
            ..IndicatorSettings::default()
        }
    }
}

// ─── Volatility squeeze ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SqueezeParams {
    pub percentile_window: usize,
    /// ATR percentile rank at or below which a squeeze is flagged.
    pub atr_percentile_threshold: f64,
    pub donchian_period: usize,
    pub breakout_buffer_pct: f64,
    pub volume_window: usize,
    pub volume_multiplier: f64,
    pub atr_period: usize,
    pub atr_trail_mult: f64,
}

impl Default for SqueezeParams {
    fn default() -> Self {
        Self {
            percentile_window: 100,
            atr_percentile_threshold: 20.0,
            donchian_period: 20,
            breakout_buffer_pct: 0.2,
            volume_window: 20,
            volume_multiplier: 2.0,
            atr_period: 14,
            atr_trail_mult: 2.5,
        }
    }
}

impl SqueezeParams {
    pub fn validate(&self) -> Result<()> {
        positive_period("percentile_window", self.percentile_window, 2)?;
        positive_period("donchian_period", self.donchian_period, 2)?;
        positive_period("volume_window", self.volume_window, 1)?;
        positive_period("atr_period", self.atr_period, 1)?;
        percent_level("atr_percentile_threshold", self.atr_percentile_threshold)?;
        non_negative("breakout_buffer_pct", self.breakout_buffer_pct)?;
        positive("volume_multiplier", self.volume_multiplier)?;
        positive("atr_trail_mult", self.atr_trail_mult)
    }

    pub fn indicator_settings(&self) -> IndicatorSettings {
        IndicatorSettings {
            atr_percentile_window: self.percentile_window,
            donchian_period: self.donchian_period,
            volume_window: self.volume_window,
            atr_period: self.atr_period,
            ..IndicatorSettings::default()
        }
    }
}

// ─── Ensemble ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnsembleParams {
    pub donchian_weight: f64,
    pub pullback_weight: f64,
    pub squeeze_weight: f64,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
}

impl Default for EnsembleParams {
    fn default() -> Self {
        Self {
            donchian_weight: 0.4,
            pullback_weight: 0.3,
            squeeze_weight: 0.3,
            buy_threshold: 0.6,
            sell_threshold: -0.2,
        }
    }
}

impl EnsembleParams {
    pub fn validate(&self) -> Result<()> {
        non_negative("donchian_weight", self.donchian_weight)?;
        non_negative("pullback_weight", self.pullback_weight)?;
        non_negative("squeeze_weight", self.squeeze_weight)?;
        if self.donchian_weight + self.pullback_weight + self.squeeze_weight <= 0.0 {
            return Err(Error::Config("ensemble weights must not all be zero".into()));
        }
        if self.sell_threshold >= self.buy_threshold {
            return Err(Error::Config(
                "sell_threshold must be below buy_threshold".into(),
            ));
        }
        Ok(())
    }

    /// Constituents run with their own defaults, so the ensemble needs the
    /// union of their indicator periods.
    pub fn indicator_settings(&self) -> IndicatorSettings {
        let donchian = DonchianParams::default();
        let pullback = PullbackParams::default();
        let squeeze = SqueezeParams::default();
        IndicatorSettings {
            ma_long: pullback.trend_ma_period,
            rsi_period: pullback.rsi_period,
            donchian_period: donchian.donchian_period,
            volume_window: donchian.volume_window,
            atr_period: donchian.atr_period,
            atr_percentile_window: squeeze.percentile_window,
            ..IndicatorSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_defaults_validate() {
        for id in StrategyId::ALL {
            let params = StrategyParameters::defaults_for(id);
            assert_eq!(params.strategy_id(), id);
            params.validate().unwrap_or_else(|e| panic!("{id}: {e}"));
        }
    }

    #[test]
    fn non_positive_period_is_rejected_not_clamped() {
        let params = StrategyParameters::DonchianTrail(DonchianParams {
            donchian_period: 0,
            ..DonchianParams::default()
        });
        assert!(matches!(params.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn inverted_rsi_thresholds_are_rejected() {
        let params = RsiReversionParams {
            entry_threshold: 70.0,
            exit_threshold: 30.0,
            ..RsiReversionParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn json_view_omits_variant_tag() {
        let json = StrategyParameters::defaults_for(StrategyId::Pullback).to_json();
        assert_eq!(json["rsi_pullback_threshold"], 40.0);
        assert!(json.get("strategy").is_none());
    }

    #[test]
    fn indicator_settings_follow_parameters() {
        let params = StrategyParameters::RsiReversion(RsiReversionParams::default());
        assert_eq!(params.indicator_settings().rsi_period, 7);
        let orb = StrategyParameters::defaults_for(StrategyId::OpeningRange);
        assert!(orb.indicator_settings().opening_range.is_some());
    }
}
