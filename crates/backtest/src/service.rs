use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::info;

use common::{CandleProvider, Error, Result, StrategyId};
use strategy::{Strategy, StrategyParameters, StrategyRegistry};

use crate::report::BacktestResult;
use crate::simulator::Backtester;

/// What to simulate. `params = None` runs the strategy's defaults.
#[derive(Debug, Clone)]
pub struct BacktestRequest {
    pub symbol: String,
    pub strategy: StrategyId,
    pub params: Option<StrategyParameters>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Fetches history from a [`CandleProvider`] and hands it to the simulator.
pub struct BacktestService {
    provider: Arc<dyn CandleProvider>,
    registry: StrategyRegistry,
    backtester: Backtester,
}

impl BacktestService {
    pub fn new(
        provider: Arc<dyn CandleProvider>,
        registry: StrategyRegistry,
        backtester: Backtester,
    ) -> Self {
        Self {
            provider,
            registry,
            backtester,
        }
    }

    pub async fn run(&self, request: &BacktestRequest) -> Result<BacktestResult> {
        let strategy = self.registry.get(request.strategy)?;
        let params = request
            .params
            .clone()
            .unwrap_or_else(|| strategy.default_parameters());

        let candles = self
            .provider
            .fetch_candles(&request.symbol, request.start, request.end)
            .await?;
        if candles.is_empty() {
            return Err(Error::InsufficientData {
                symbol: request.symbol.clone(),
                bars: 0,
                required: self.backtester.config().min_lookback + 1,
            });
        }
        info!(
            symbol = %request.symbol,
            strategy = %request.strategy,
            bars = candles.len(),
            "Candles loaded for backtest"
        );

        self.backtester
            .run(strategy.as_ref(), &params, &request.symbol, &candles)
    }
}
