use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{Error, Result, StrategyId};

use crate::params::StrategyParameters;

/// Top-level strategy config file (TOML).
///
/// Example `config/strategies.toml`:
/// ```toml
/// [[strategy]]
/// type = "donchian_trail"
/// name = "Samsung Donchian"
/// symbol = "005930"
///
/// [strategy.params]
/// donchian_period = 30
/// atr_trail_mult = 3.0
/// ```
///
/// Keys left out of `[strategy.params]` keep their defaults; unknown keys are
/// an error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    #[serde(rename = "strategy", default)]
    pub strategies: Vec<StrategyConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    /// Strategy identifier, e.g. "rsi_reversion".
    #[serde(rename = "type")]
    pub strategy_type: String,
    /// Human-readable name shown in logs.
    pub name: String,
    /// Instrument code, e.g. "005930".
    pub symbol: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Overrides applied on top of the strategy's default parameters.
    #[serde(default)]
    pub params: toml::Table,
}

fn default_enabled() -> bool {
    true
}

impl StrategyFileConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read strategy config at '{path}': {e}")))?;
        let cfg = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{path}: {e}")))?;
        debug!(path, count = cfg.strategies.len(), "Loaded strategy config");
        Ok(cfg)
    }

    /// Parse and validate every entry, including its parameter overrides.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        for entry in &cfg.strategies {
            entry.parameters()?;
        }
        Ok(cfg)
    }

    pub fn enabled(&self) -> impl Iterator<Item = &StrategyConfig> {
        self.strategies.iter().filter(|s| s.enabled)
    }
}

impl StrategyConfig {
    pub fn strategy_id(&self) -> Result<StrategyId> {
        self.strategy_type.parse()
    }

    /// Typed, validated parameters: defaults overlaid with `params`.
    pub fn parameters(&self) -> Result<StrategyParameters> {
        let id = self.strategy_id()?;
        let mut tagged = toml::Table::new();
        tagged.insert("strategy".into(), toml::Value::String(id.as_str().into()));
        tagged.insert("params".into(), toml::Value::Table(self.params.clone()));

        let params: StrategyParameters = toml::Value::Table(tagged)
            .try_into()
            .map_err(|e| Error::Config(format!("strategy '{}': {e}", self.name)))?;
        params
            .validate()
            .map_err(|e| Error::Config(format!("strategy '{}': {e}", self.name)))?;
        Ok(params)
    }
}
