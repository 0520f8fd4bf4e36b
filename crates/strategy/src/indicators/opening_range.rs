use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use common::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpeningRangeSettings {
    pub session_open: NaiveTime,
    pub minutes: u32,
}

impl OpeningRangeSettings {
    pub fn range_end(&self) -> NaiveTime {
        self.session_open + Duration::minutes(i64::from(self.minutes))
    }
}

/// High/low of each session's opening range, published on every bar of the
/// same day once the range has completed.
pub fn opening_range_series(
    candles: &[Candle],
    settings: &OpeningRangeSettings,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let mut highs = vec![None; candles.len()];
    let mut lows = vec![None; candles.len()];
    let range_end = settings.range_end();

    let mut day: Option<NaiveDate> = None;
    let mut range: Option<(f64, f64)> = None;

    for (i, c) in candles.iter().enumerate() {
        let date = c.timestamp.date();
        if day != Some(date) {
            day = Some(date);
            range = None;
        }
        let time = c.timestamp.time();
        if time >= settings.session_open && time < range_end {
            range = Some(match range {
                Some((h, l)) => (h.max(c.high), l.min(c.low)),
                None => (c.high, c.low),
            });
        } else if time >= range_end {
            if let Some((h, l)) = range {
                highs[i] = Some(h);
                lows[i] = Some(l);
            }
        }
    }
    (highs, lows)
}
