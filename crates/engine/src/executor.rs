use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use common::{Error, Fill, Order, OrderSink, ReasonCode, Result, RiskEvent, TradingMode};

use crate::Throttle;

/// Submits approved orders to the [`OrderSink`] and reports the outcome on
/// the risk event channel.
///
/// This is the ONLY component that calls `OrderSink::execute`.
pub struct OrderExecutor {
    sink: Arc<dyn OrderSink>,
    throttle: Arc<Throttle>,
    risk_event_tx: mpsc::Sender<RiskEvent>,
    mode: TradingMode,
}

impl OrderExecutor {
    pub fn new(
        sink: Arc<dyn OrderSink>,
        throttle: Arc<Throttle>,
        risk_event_tx: mpsc::Sender<RiskEvent>,
        mode: TradingMode,
    ) -> Self {
        Self {
            sink,
            throttle,
            risk_event_tx,
            mode,
        }
    }

    /// Execute one order. A failure is logged, announced as
    /// [`RiskEvent::OrderFailed`] and returned; the caller must not touch its
    /// position state in that case.
    pub async fn execute(&self, order: &Order, reason: ReasonCode) -> Result<Fill> {
        info!(
            symbol = %order.symbol,
            side = %order.side,
            qty = order.quantity,
            mode = %self.mode,
            %reason,
            "Executing order"
        );
        self.throttle.wait().await;

        match self.sink.execute(order).await {
            Ok(fill) => {
                info!(
                    symbol = %fill.symbol,
                    price = fill.fill_price,
                    qty = fill.quantity,
                    "Order filled"
                );
                let _ = self
                    .risk_event_tx
                    .send(RiskEvent::Filled {
                        fill: fill.clone(),
                        reason,
                    })
                    .await;
                Ok(fill)
            }
            Err(e) => {
                error!(symbol = %order.symbol, error = %e, "Order submission failed");
                let _ = self
                    .risk_event_tx
                    .send(RiskEvent::OrderFailed {
                        symbol: order.symbol.clone(),
                        error: e.to_string(),
                    })
                    .await;
                Err(match e {
                    Error::OrderExecution { .. } => e,
                    other => Error::OrderExecution {
                        symbol: order.symbol.clone(),
                        reason: other.to_string(),
                    },
                })
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use common::OrderSide;
    use std::time::Duration;

    struct EchoSink;

    #[async_trait]
    impl OrderSink for EchoSink {
        async fn execute(&self, order: &Order) -> Result<Fill> {
            Ok(Fill {
                order_id: order.id.clone(),
                symbol: order.symbol.clone(),
                side: order.side,
                fill_price: order.reference_price,
                quantity: order.quantity,
                timestamp: Utc::now(),
            })
        }
    }

    struct DownSink;

    #[async_trait]
    impl OrderSink for DownSink {
        async fn execute(&self, _order: &Order) -> Result<Fill> {
            Err(Error::Other("broker unreachable".into()))
        }
    }

    fn executor(sink: Arc<dyn OrderSink>) -> (OrderExecutor, mpsc::Receiver<RiskEvent>) {
        let (tx, rx) = mpsc::channel(8);
        let throttle = Arc::new(Throttle::new(Duration::ZERO));
        (OrderExecutor::new(sink, throttle, tx, TradingMode::Paper), rx)
    }

    #[tokio::test]
    async fn fill_is_returned_and_announced() {
        let (executor, mut events) = executor(Arc::new(EchoSink));
        let order = Order::market("005930", OrderSide::Buy, 5, 70_000.0);
        let fill = executor.execute(&order, ReasonCode::BreakoutVol).await.unwrap();
        assert_eq!(fill.quantity, 5);
        assert!(matches!(
            events.recv().await,
            Some(RiskEvent::Filled { reason: ReasonCode::BreakoutVol, .. })
        ));
    }

    #[tokio::test]
    async fn failure_is_reraised_as_order_execution() {
        let (executor, mut events) = executor(Arc::new(DownSink));
        let order = Order::market("005930", OrderSide::Sell, 5, 70_000.0);
        let err = executor.execute(&order, ReasonCode::TrailingStop).await.unwrap_err();
        assert!(matches!(err, Error::OrderExecution { ref symbol, .. } if symbol == "005930"));
        assert!(matches!(events.recv().await, Some(RiskEvent::OrderFailed { .. })));
    }
}
