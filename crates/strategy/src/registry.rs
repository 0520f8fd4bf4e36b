use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use common::{Error, Result, StrategyId};

use crate::strategies::{
    DonchianTrail, Ensemble, OpeningRange, Pullback, RsiReversion, SupportResistance,
    TrendBreakout, VolatilitySqueeze,
};
use crate::Strategy;

/// Descriptive entry for listing strategies to a caller.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyMetadata {
    pub id: StrategyId,
    pub name: String,
    pub description: String,
    pub default_parameters: serde_json::Value,
}

/// Lookup table from strategy id to its stateless implementation.
///
/// Strategies keep no per-run state, so one instance is shared by every
/// simulation and live session. The table is fixed once built.
#[derive(Clone)]
pub struct StrategyRegistry {
    strategies: BTreeMap<StrategyId, Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Registry holding every built-in strategy.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(TrendBreakout));
        registry.register(Arc::new(RsiReversion));
        registry.register(Arc::new(SupportResistance));
        registry.register(Arc::new(DonchianTrail));
        registry.register(Arc::new(Pullback));
        registry.register(Arc::new(OpeningRange));
        registry.register(Arc::new(VolatilitySqueeze));
        registry.register(Arc::new(Ensemble));
        registry
    }

    fn register(&mut self, strategy: Arc<dyn Strategy>) {
        debug!(id = %strategy.id(), name = strategy.name(), "Registered strategy");
        self.strategies.insert(strategy.id(), strategy);
    }

    pub fn get(&self, id: StrategyId) -> Result<Arc<dyn Strategy>> {
        self.strategies
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::UnknownStrategy(id.to_string()))
    }

    /// Look a strategy up by its textual id.
    pub fn resolve(&self, id: &str) -> Result<Arc<dyn Strategy>> {
        self.get(id.parse()?)
    }

    pub fn ids(&self) -> impl Iterator<Item = StrategyId> + '_ {
        self.strategies.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn metadata(&self) -> Vec<StrategyMetadata> {
        self.strategies
            .values()
            .map(|s| StrategyMetadata {
                id: s.id(),
                name: s.name().to_string(),
                description: s.description().to_string(),
                default_parameters: s.default_parameters().to_json(),
            })
            .collect()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_every_id() {
        let registry = StrategyRegistry::builtin();
        assert_eq!(registry.len(), StrategyId::ALL.len());
        for id in StrategyId::ALL {
            assert_eq!(registry.get(id).unwrap().id(), id);
        }
    }

    #[test]
    fn resolve_by_name() {
        let registry = StrategyRegistry::builtin();
        assert_eq!(registry.resolve("pullback").unwrap().id(), StrategyId::Pullback);
        assert!(matches!(registry.resolve("macd"), Err(Error::UnknownStrategy(_))));
        assert!(matches!(
            StrategyRegistry::empty().get(StrategyId::Ensemble),
            Err(Error::UnknownStrategy(_))
        ));
    }

    #[test]
    fn metadata_lists_defaults() {
        let metadata = StrategyRegistry::builtin().metadata();
        let rsi = metadata
            .iter()
            .find(|m| m.id == StrategyId::RsiReversion)
            .unwrap();
        assert_eq!(rsi.name, "RSI Mean Reversion");
        assert_eq!(rsi.default_parameters["rsi_period"], 7);
        assert!(metadata.iter().all(|m| !m.description.is_empty()));
    }
}
