use std::str::FromStr;

use chrono::NaiveDate;

use crate::{Error, Result, TradingMode};

/// All configuration loaded from environment variables at startup.
/// Invalid values are reported as [`Error::Config`], never clamped.
#[derive(Debug, Clone)]
pub struct Config {
    // Mode
    pub trading_mode: TradingMode,

    // Market data
    /// Directory holding one `<SYMBOL>.csv` candle file per symbol.
    pub candle_dir: String,
    pub strategy_config_path: String,

    // Simulation
    pub starting_balance: f64,
    pub min_lookback: usize,
    pub backtest_start: Option<NaiveDate>,
    pub backtest_end: Option<NaiveDate>,

    // Live loop
    pub eval_interval_secs: u64,
    pub broker_min_delay_ms: u64,
    pub live_lookback_days: i64,
    pub paper_slippage_bps: f64,

    // Risk
    pub daily_loss_limit_pct: f64,
    pub max_daily_entries: Option<u32>,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let trading_mode = match optional_env("TRADING_MODE")
            .unwrap_or_else(|| "backtest".to_string())
            .to_lowercase()
            .as_str()
        {
            "paper" => TradingMode::Paper,
            "backtest" => TradingMode::Backtest,
            other => {
                return Err(Error::Config(format!(
                    "TRADING_MODE must be 'paper' or 'backtest', got: '{other}'"
                )))
            }
        };

        let cfg = Config {
            trading_mode,
            candle_dir: optional_env("CANDLE_DIR").unwrap_or_else(|| "data/candles".to_string()),
            strategy_config_path: optional_env("STRATEGY_CONFIG_PATH")
                .unwrap_or_else(|| "config/strategies.toml".to_string()),
            starting_balance: parse_env("STARTING_BALANCE")?.unwrap_or(10_000_000.0),
            min_lookback: parse_env("MIN_LOOKBACK")?.unwrap_or(20),
            backtest_start: parse_env("BACKTEST_START")?,
            backtest_end: parse_env("BACKTEST_END")?,
            eval_interval_secs: parse_env("EVAL_INTERVAL_SECS")?.unwrap_or(60),
            broker_min_delay_ms: parse_env("BROKER_MIN_DELAY_MS")?.unwrap_or(100),
            live_lookback_days: parse_env("LIVE_LOOKBACK_DAYS")?.unwrap_or(5),
            paper_slippage_bps: parse_env("PAPER_SLIPPAGE_BPS")?.unwrap_or(10.0),
            daily_loss_limit_pct: parse_env("DAILY_LOSS_LIMIT_PCT")?.unwrap_or(5.0),
            max_daily_entries: parse_env("MAX_DAILY_ENTRIES")?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if !(self.starting_balance > 0.0) {
            return Err(Error::Config("STARTING_BALANCE must be positive".into()));
        }
        if !(self.daily_loss_limit_pct > 0.0) {
            return Err(Error::Config("DAILY_LOSS_LIMIT_PCT must be positive".into()));
        }
        if self.eval_interval_secs == 0 {
            return Err(Error::Config("EVAL_INTERVAL_SECS must be at least 1".into()));
        }
        if self.paper_slippage_bps < 0.0 {
            return Err(Error::Config("PAPER_SLIPPAGE_BPS must not be negative".into()));
        }
        if let (Some(start), Some(end)) = (self.backtest_start, self.backtest_end) {
            if start > end {
                return Err(Error::Config(format!(
                    "BACKTEST_START ({start}) is after BACKTEST_END ({end})"
                )));
            }
        }
        Ok(())
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("{key}='{raw}' is invalid: {e}"))),
        None => Ok(None),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
