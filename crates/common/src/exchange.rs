use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::{Candle, Fill, Order, Result};

/// Source of historical and recent OHLCV bars.
///
/// Implementations return bars in ascending time order. An empty result is
/// not an error here; callers that need data turn it into
/// [`crate::Error::InsufficientData`].
#[async_trait]
pub trait CandleProvider: Send + Sync {
    async fn fetch_candles(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Candle>>;
}

/// Executes approved orders.
///
/// The core never talks to a broker directly: only the engine's
/// `OrderExecutor` holds a `dyn OrderSink`, and every order reaching it has
/// already passed the risk gate.
#[async_trait]
pub trait OrderSink: Send + Sync {
    /// Submit an order and return the fill confirmation.
    async fn execute(&self, order: &Order) -> Result<Fill>;
}
