use common::Candle;

/// Highest high of the `period` bars before each bar (the bar itself is
/// excluded, so a close above it is a breakout).
pub fn highest_high_before(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    trailing_extreme(candles, period, |c| c.high, f64::max)
}

/// Lowest low of the `period` bars before each bar.
pub fn lowest_low_before(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    trailing_extreme(candles, period, |c| c.low, f64::min)
}

fn trailing_extreme(
    candles: &[Candle],
    period: usize,
    field: impl Fn(&Candle) -> f64,
    pick: impl Fn(f64, f64) -> f64,
) -> Vec<Option<f64>> {
    let mut out = vec![None; candles.len()];
    if period == 0 {
        return out;
    }
    for i in period..candles.len() {
        out[i] = candles[i - period..i].iter().map(&field).reduce(&pick);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bars(highs: &[f64]) -> Vec<Candle> {
        highs
            .iter()
            .enumerate()
            .map(|(i, &h)| Candle {
                timestamp: NaiveDate::from_ymd_opt(2024, 2, 1 + i as u32)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open: h - 1.0,
                high: h,
                low: h - 2.0,
                close: h - 1.0,
                volume: 1.0,
            })
            .collect()
    }

    #[test]
    fn channel_excludes_current_bar() {
        let candles = bars(&[10.0, 12.0, 11.0, 20.0]);
        let high = highest_high_before(&candles, 3);
        assert_eq!(high[2], None);
        assert_eq!(high[3], Some(12.0));

        let low = lowest_low_before(&candles, 2);
        assert_eq!(low[3], Some(9.0));
    }
}
