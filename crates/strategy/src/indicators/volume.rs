use common::Candle;

/// Average volume of the `period` bars before each bar.
pub fn average_volume_before(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; candles.len()];
    if period == 0 {
        return out;
    }
    for i in period..candles.len() {
        let sum: f64 = candles[i - period..i].iter().map(|c| c.volume).sum();
        out[i] = Some(sum / period as f64);
    }
    out
}

/// Current volume over the preceding average; `None` when the average is zero.
pub fn volume_ratio(volume: f64, average: Option<f64>) -> Option<f64> {
    average.filter(|avg| *avg > 0.0).map(|avg| volume / avg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn ratio_uses_previous_bars_only() {
        let candles: Vec<Candle> = [100.0, 100.0, 100.0, 300.0]
            .iter()
            .enumerate()
            .map(|(i, &v)| Candle {
                timestamp: NaiveDate::from_ymd_opt(2024, 2, 1 + i as u32)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: v,
            })
            .collect();
        let avg = average_volume_before(&candles, 3);
        assert_eq!(avg[2], None);
        assert_eq!(avg[3], Some(100.0));
        assert_eq!(volume_ratio(300.0, avg[3]), Some(3.0));
        assert_eq!(volume_ratio(300.0, Some(0.0)), None);
    }
}
