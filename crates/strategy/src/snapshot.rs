use common::{Candle, MarketSnapshot};

use crate::indicators::{
    average_volume_before, highest_high_before, lowest_low_before, opening_range_series,
    percentile_rank_series, sma_series, volume_ratio, AtrIndicator, IndicatorSettings,
    RsiIndicator,
};

/// Derives every indicator series once over a candle slice and hands out one
/// [`MarketSnapshot`] per bar.
///
/// All series are causal, so `snapshot_at(i)` is identical to building a
/// snapshot from `candles[..=i]` alone.
pub struct SnapshotBuilder<'a> {
    symbol: String,
    candles: &'a [Candle],
    ma_short: Vec<Option<f64>>,
    ma_long: Vec<Option<f64>>,
    avg_volume: Vec<Option<f64>>,
    breakout: Vec<Option<f64>>,
    donchian_high: Vec<Option<f64>>,
    donchian_low: Vec<Option<f64>>,
    range_high: Vec<Option<f64>>,
    range_low: Vec<Option<f64>>,
    atr: Vec<Option<f64>>,
    atr_percentile: Vec<Option<f64>>,
    rsi: Vec<Option<f64>>,
    or_high: Vec<Option<f64>>,
    or_low: Vec<Option<f64>>,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(symbol: impl Into<String>, candles: &'a [Candle], settings: &IndicatorSettings) -> Self {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let atr = AtrIndicator::new(settings.atr_period.max(1)).series(candles);
        let atr_percentile = percentile_rank_series(&atr, settings.atr_percentile_window);
        let (or_high, or_low) = match &settings.opening_range {
            Some(or) => opening_range_series(candles, or),
            None => (vec![None; candles.len()], vec![None; candles.len()]),
        };

        Self {
            symbol: symbol.into(),
            candles,
            ma_short: sma_series(&closes, settings.ma_short),
            ma_long: sma_series(&closes, settings.ma_long),
            avg_volume: average_volume_before(candles, settings.volume_window),
            breakout: highest_high_before(candles, settings.breakout_lookback),
            donchian_high: highest_high_before(candles, settings.donchian_period),
            donchian_low: lowest_low_before(candles, settings.donchian_period),
            range_high: highest_high_before(candles, settings.range_lookback),
            range_low: lowest_low_before(candles, settings.range_lookback),
            atr,
            atr_percentile,
            rsi: RsiIndicator::new(settings.rsi_period.max(2)).series(&closes),
            or_high,
            or_low,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candle(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    /// Bars strictly before `index`, oldest first. Past the end this is the
    /// whole series.
    pub fn history(&self, index: usize) -> &'a [Candle] {
        &self.candles[..index.min(self.candles.len())]
    }

    pub fn snapshot_at(&self, index: usize) -> Option<MarketSnapshot> {
        let candle = self.candles.get(index)?;
        let mut snap = MarketSnapshot::from_candle(self.symbol.clone(), candle);

        snap.ma_short = self.ma_short[index];
        snap.ma_long = self.ma_long[index];
        snap.ma_short_rising = match (index.checked_sub(1).and_then(|p| self.ma_short[p]), snap.ma_short) {
            (Some(prev), Some(cur)) => Some(cur > prev),
            _ => None,
        };
        snap.avg_volume = self.avg_volume[index];
        snap.volume_ratio = volume_ratio(candle.volume, snap.avg_volume);
        snap.breakout_price = self.breakout[index];
        snap.donchian_high = self.donchian_high[index];
        snap.donchian_low = self.donchian_low[index];
        snap.range_high = self.range_high[index];
        snap.range_low = self.range_low[index];
        snap.atr = self.atr[index];
        snap.atr_percentile = self.atr_percentile[index];
        snap.rsi = self.rsi[index];
        snap.opening_range_high = self.or_high[index];
        snap.opening_range_low = self.or_low[index];
        Some(snap)
    }

    /// Snapshot of the most recent bar.
    pub fn latest(&self) -> Option<MarketSnapshot> {
        self.len().checked_sub(1).and_then(|i| self.snapshot_at(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rising(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                Candle {
                    timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                        .unwrap()
                        .and_hms_opt(0, 0, 0)
                        .unwrap()
                        + chrono::Duration::days(i as i64),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000.0,
                }
            })
            .collect()
    }

    #[test]
    fn fields_are_absent_during_warm_up() {
        let candles = rising(25);
        let builder = SnapshotBuilder::new("TEST", &candles, &IndicatorSettings::default());
        let early = builder.snapshot_at(5).unwrap();
        assert_eq!(early.ma_short, None);
        assert_eq!(early.donchian_high, None);
        assert_eq!(early.rsi, None);

        let late = builder.latest().unwrap();
        assert!(late.ma_short.is_some());
        assert_eq!(late.ma_long, None, "60-bar MA needs 60 bars");
        assert_eq!(late.ma_short_rising, Some(true));
        assert_eq!(late.volume_ratio, Some(1.0));
        assert_eq!(late.donchian_high, Some(124.0));
    }

    #[test]
    fn snapshot_matches_prefix_computation() {
        let candles = rising(40);
        let settings = IndicatorSettings::default();
        let full = SnapshotBuilder::new("TEST", &candles, &settings);
        for i in [20, 30, 39] {
            let prefix = SnapshotBuilder::new("TEST", &candles[..=i], &settings);
            assert_eq!(full.snapshot_at(i), prefix.latest());
        }
    }

    #[test]
    fn history_holds_only_preceding_bars() {
        let candles = rising(10);
        let builder = SnapshotBuilder::new("TEST", &candles, &IndicatorSettings::default());
        let snap = builder.snapshot_at(4).unwrap();
        let history = builder.history(4);
        assert_eq!(history.len(), 4);
        assert!(history.iter().all(|c| c.timestamp < snap.timestamp));
        assert_eq!(history.last().map(|c| c.close), Some(103.0));
        assert!(builder.history(0).is_empty());
        assert_eq!(builder.history(99).len(), 10);
    }

    #[test]
    fn out_of_range_index_is_none() {
        let candles = rising(3);
        let builder = SnapshotBuilder::new("TEST", &candles, &IndicatorSettings::default());
        assert!(builder.snapshot_at(3).is_none());
        assert!(SnapshotBuilder::new("TEST", &[], &IndicatorSettings::default())
            .latest()
            .is_none());
    }
}
