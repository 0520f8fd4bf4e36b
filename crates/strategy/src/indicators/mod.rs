//! Standard indicator utilities. Every series is aligned with its input and
//! causal: entry `i` depends only on bars `..=i`.

pub mod atr;
pub mod channel;
pub mod opening_range;
pub mod rsi;
pub mod sma;
pub mod volume;

pub use atr::{percentile_rank_series, AtrIndicator};
pub use channel::{highest_high_before, lowest_low_before};
pub use opening_range::{opening_range_series, OpeningRangeSettings};
pub use rsi::RsiIndicator;
pub use sma::sma_series;
pub use volume::{average_volume_before, volume_ratio};

/// Periods the snapshot builder derives indicators with. Each strategy's
/// parameters produce the settings it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSettings {
    pub ma_short: usize,
    pub ma_long: usize,
    pub volume_window: usize,
    pub breakout_lookback: usize,
    pub donchian_period: usize,
    pub range_lookback: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
    pub atr_percentile_window: usize,
    pub opening_range: Option<OpeningRangeSettings>,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            ma_short: 20,
            ma_long: 60,
            volume_window: 20,
            breakout_lookback: 20,
            donchian_period: 20,
            range_lookback: 40,
            rsi_period: 14,
            atr_period: 14,
            atr_percentile_window: 100,
            opening_range: None,
        }
    }
}
