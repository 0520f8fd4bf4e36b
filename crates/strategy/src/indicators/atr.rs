use common::Candle;

/// Average True Range with Wilder smoothing, seeded by the simple mean of the
/// first `period` true ranges. The first bar's true range is its high-low.
#[derive(Debug, Clone)]
pub struct AtrIndicator {
    pub period: usize,
}

impl AtrIndicator {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self { period }
    }

    pub fn series(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        let mut out = vec![None; candles.len()];
        if candles.len() < self.period {
            return out;
        }

        let tr: Vec<f64> = candles
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let prev_close = if i == 0 { c.close } else { candles[i - 1].close };
                (c.high - c.low)
                    .max((c.high - prev_close).abs())
                    .max((c.low - prev_close).abs())
            })
            .collect();

        let n = self.period as f64;
        let mut atr = tr[..self.period].iter().sum::<f64>() / n;
        out[self.period - 1] = Some(atr);
        for i in self.period..candles.len() {
            atr = (atr * (n - 1.0) + tr[i]) / n;
            out[i] = Some(atr);
        }
        out
    }
}

/// Percentile rank (0-100) of each ATR value among the available ATR values
/// of the trailing `window` bars, including itself: the share of values
/// strictly below the current one. `None` until `window` bars exist.
pub fn percentile_rank_series(atr: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; atr.len()];
    if window == 0 {
        return out;
    }
    for i in (window - 1)..atr.len() {
        let Some(current) = atr[i] else { continue };
        let values: Vec<f64> = atr[i + 1 - window..=i].iter().flatten().copied().collect();
        let below = values.iter().filter(|&&a| a < current).count();
        out[i] = Some(below as f64 / values.len() as f64 * 100.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(day: u32, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn constant_range_gives_constant_atr() {
        let candles: Vec<Candle> = (1..=10).map(|d| bar(d, 102.0, 98.0, 100.0)).collect();
        let atr = AtrIndicator::new(3).series(&candles);
        assert_eq!(atr[1], None);
        for v in &atr[2..] {
            assert!((v.unwrap() - 4.0).abs() < 1e-9);
        }
    }

    #[test]
    fn gap_counts_in_true_range() {
        let candles = vec![bar(1, 101.0, 99.0, 100.0), bar(2, 111.0, 109.0, 110.0)];
        let atr = AtrIndicator::new(2).series(&candles);
        // TR = [2, |111-100| = 11]
        assert!((atr[1].unwrap() - 6.5).abs() < 1e-9);
    }

    #[test]
    fn lowest_atr_in_window_ranks_zero() {
        let atr = vec![None, Some(5.0), Some(4.0), Some(3.0), Some(1.0)];
        let ranks = percentile_rank_series(&atr, 4);
        assert_eq!(ranks[2], None);
        assert_eq!(ranks[4], Some(0.0));
        // Window [5, 4, 3] around index 3: two values above, none below.
        assert_eq!(ranks[3], Some(0.0));
        let rising = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        assert_eq!(percentile_rank_series(&rising, 4)[3], Some(75.0));
    }
}
