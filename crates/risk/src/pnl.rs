use std::collections::BTreeMap;

use chrono::NaiveDate;

/// Account-level daily P/L from equity marks.
///
/// Each key (one per symbol/strategy session) reports its current equity,
/// cash plus marked holdings. The first mark a key sends on a given day
/// becomes its opening equity; a new day resets every opening value.
#[derive(Debug, Clone, Default)]
pub struct DailyPnlTracker {
    day: Option<NaiveDate>,
    opening: BTreeMap<String, f64>,
    current: BTreeMap<String, f64>,
}

impl DailyPnlTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, key: &str, day: NaiveDate, equity: f64) {
        if !equity.is_finite() {
            return;
        }
        if self.day != Some(day) {
            self.day = Some(day);
            // yesterday's close becomes today's opening
            self.opening = std::mem::take(&mut self.current);
        }
        self.opening.entry(key.to_string()).or_insert(equity);
        self.current.insert(key.to_string(), equity);
    }

    /// Realized plus unrealized P/L of the current day in percent of the
    /// opening equity. Zero before the first mark.
    pub fn daily_pnl_pct(&self) -> f64 {
        let opening: f64 = self
            .current
            .keys()
            .filter_map(|k| self.opening.get(k))
            .sum();
        let current: f64 = self.current.values().sum();
        if opening <= 0.0 {
            return 0.0;
        }
        (current - opening) / opening * 100.0
    }

    pub fn day(&self) -> Option<NaiveDate> {
        self.day
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn aggregates_keys_within_day() {
        let mut t = DailyPnlTracker::new();
        t.mark("a", day(4), 1_000.0);
        t.mark("b", day(4), 1_000.0);
        t.mark("a", day(4), 900.0);
        assert!((t.daily_pnl_pct() + 5.0).abs() < 1e-9);
    }

    #[test]
    fn new_day_opens_at_previous_close() {
        let mut t = DailyPnlTracker::new();
        t.mark("a", day(4), 1_000.0);
        t.mark("a", day(4), 800.0);
        t.mark("a", day(5), 800.0);
        assert_eq!(t.daily_pnl_pct(), 0.0);
        t.mark("a", day(5), 840.0);
        assert!((t.daily_pnl_pct() - 5.0).abs() < 1e-9);
        assert_eq!(t.day(), Some(day(5)));
    }

    #[test]
    fn empty_tracker_reports_zero() {
        assert_eq!(DailyPnlTracker::new().daily_pnl_pct(), 0.0);
    }
}
