//! Candle providers backed by local CSV files.
//!
//! Each symbol lives in `<dir>/<SYMBOL>.csv` with the header
//! `datetime,open,high,low,close,volume`. Daily files may carry a bare
//! date; such bars are stamped at the 15:30 close.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use tracing::{debug, info};

use common::{Candle, CandleProvider, Error, Result};

#[derive(Debug, Deserialize)]
struct CsvRow {
    datetime: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts);
        }
    }
    let close = NaiveTime::from_hms_opt(15, 30, 0)
        .ok_or_else(|| Error::Data("invalid session close time".into()))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(close))
        .map_err(|e| Error::Data(format!("invalid datetime '{raw}': {e}")))
}

/// Parses CSV candle content and returns the bars sorted by time.
pub fn load_csv(content: &str) -> Result<Vec<Candle>> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let mut candles = Vec::new();
    for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
        // header is line 1
        let row = row.map_err(|e| Error::Data(format!("CSV row {}: {e}", line + 2)))?;
        candles.push(Candle {
            timestamp: parse_timestamp(&row.datetime)?,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    candles.sort_by_key(|c| c.timestamp);
    Ok(candles)
}

/// Reads `<dir>/<SYMBOL>.csv` on every call and returns the requested window.
#[derive(Debug, Clone)]
pub struct CsvCandleProvider {
    dir: PathBuf,
}

impl CsvCandleProvider {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    pub fn load_all(&self, symbol: &str) -> Result<Vec<Candle>> {
        let path = self.path_for(symbol);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Data(format!("cannot read candles from {}: {e}", path.display()))
        })?;
        let candles = load_csv(&content)?;
        debug!(symbol, path = %path.display(), bars = candles.len(), "Candle file loaded");
        Ok(candles)
    }
}

#[async_trait]
impl CandleProvider for CsvCandleProvider {
    async fn fetch_candles(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Candle>> {
        Ok(self
            .load_all(symbol)?
            .into_iter()
            .filter(|c| c.timestamp >= start && c.timestamp <= end)
            .collect())
    }
}

/// Replays recorded series as if they were arriving live.
///
/// Every call reveals one more bar of the symbol's series and returns
/// everything revealed so far, ignoring the requested window. Paper mode uses
/// it to step through CSV files one evaluation tick at a time. Unknown
/// symbols yield an empty series.
#[derive(Debug, Default)]
pub struct ReplayCandleProvider {
    series: HashMap<String, Vec<Candle>>,
    cursors: Mutex<HashMap<String, usize>>,
    /// Bars visible before the first call.
    warmup: usize,
}

impl ReplayCandleProvider {
    pub fn new(warmup: usize) -> Self {
        Self {
            warmup,
            ..Self::default()
        }
    }

    pub fn with_series(mut self, symbol: impl Into<String>, candles: Vec<Candle>) -> Self {
        let symbol = symbol.into();
        info!(symbol = %symbol, bars = candles.len(), warmup = self.warmup, "Replay series loaded");
        self.series.insert(symbol, candles);
        self
    }

    /// Bars of `symbol` not yet revealed.
    pub fn remaining(&self, symbol: &str) -> usize {
        let total = self.series.get(symbol).map_or(0, Vec::len);
        let revealed = self
            .cursors
            .lock()
            .ok()
            .and_then(|c| c.get(symbol).copied())
            .unwrap_or_else(|| self.warmup.min(total));
        total - revealed
    }
}

#[async_trait]
impl CandleProvider for ReplayCandleProvider {
    async fn fetch_candles(
        &self,
        symbol: &str,
        _start: NaiveDateTime,
        _end: NaiveDateTime,
    ) -> Result<Vec<Candle>> {
        let Some(candles) = self.series.get(symbol) else {
            return Ok(Vec::new());
        };
        let mut cursors = self
            .cursors
            .lock()
            .map_err(|_| Error::Other("replay cursor poisoned".into()))?;
        let cursor = cursors
            .entry(symbol.to_string())
            .or_insert_with(|| self.warmup.min(candles.len()));
        if *cursor < candles.len() {
            *cursor += 1;
        }
        debug!(symbol, revealed = *cursor, "Replay step");
        Ok(candles[..*cursor].to_vec())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "datetime,open,high,low,close,volume\n\
        2024-01-03,101,102,100,101.5,1200\n\
        2024-01-02 15:30:00,100,101,99,100.5,1000\n\
        2024-01-04T15:30:00,102,103,101,102.5,900\n";

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(15, 30, 0)
            .unwrap()
    }

    #[test]
    fn parses_mixed_timestamps_and_sorts() {
        let candles = load_csv(CSV).unwrap();
        assert_eq!(candles.len(), 3);
        assert_eq!(candles[0].timestamp, at(2));
        assert_eq!(candles[1].timestamp, at(3));
        assert_eq!(candles[1].close, 101.5);
        assert_eq!(candles[2].volume, 900.0);
    }

    #[test]
    fn bad_rows_are_data_errors() {
        let err = load_csv("datetime,open,high,low,close,volume\n2024-01-02,x,1,1,1,1\n").unwrap_err();
        assert!(matches!(err, Error::Data(ref m) if m.contains("row 2")));

        let err = load_csv("datetime,open,high,low,close,volume\nyesterday,1,1,1,1,1\n").unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[tokio::test]
    async fn csv_provider_filters_window() {
        let dir = std::env::temp_dir().join(format!("candles-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("005930.csv"), CSV).unwrap();

        let provider = CsvCandleProvider::new(&dir);
        let window = provider.fetch_candles("005930", at(3), at(4)).await.unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].timestamp, at(3));

        let missing = provider.fetch_candles("000660", at(2), at(4)).await;
        assert!(matches!(missing, Err(Error::Data(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn replay_reveals_one_bar_per_call() {
        let provider = ReplayCandleProvider::new(1).with_series("005930", load_csv(CSV).unwrap());
        assert_eq!(provider.remaining("005930"), 2);

        let first = provider.fetch_candles("005930", at(1), at(1)).await.unwrap();
        assert_eq!(first.len(), 2);
        let second = provider.fetch_candles("005930", at(1), at(1)).await.unwrap();
        assert_eq!(second.len(), 3);
        let exhausted = provider.fetch_candles("005930", at(1), at(1)).await.unwrap();
        assert_eq!(exhausted.len(), 3);
        assert_eq!(provider.remaining("005930"), 0);

        let unknown = provider.fetch_candles("000660", at(1), at(1)).await.unwrap();
        assert!(unknown.is_empty());
    }
}
