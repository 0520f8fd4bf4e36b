use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::{Error, Fill, Order, OrderSide, OrderSink, Result};

#[derive(Debug, Default)]
struct Book {
    cash: f64,
    holdings: HashMap<String, u64>,
    fills: Vec<Fill>,
}

/// Simulated broker for paper trading.
///
/// Market orders fill at the order's reference price with configurable
/// slippage; nothing leaves the process.
pub struct PaperSink {
    book: Arc<RwLock<Book>>,
    /// Slippage in basis points applied to all fills.
    slippage_bps: f64,
}

impl PaperSink {
    pub fn new(starting_cash: f64, slippage_bps: f64) -> Self {
        info!(cash = starting_cash, slippage_bps, "PaperSink initialized");
        Self {
            book: Arc::new(RwLock::new(Book {
                cash: starting_cash,
                ..Book::default()
            })),
            slippage_bps,
        }
    }

    pub async fn cash(&self) -> f64 {
        self.book.read().await.cash
    }

    pub async fn holding(&self, symbol: &str) -> u64 {
        self.book.read().await.holdings.get(symbol).copied().unwrap_or(0)
    }

    pub async fn fills(&self) -> Vec<Fill> {
        self.book.read().await.fills.clone()
    }

    fn fill_price(&self, order: &Order) -> f64 {
        let base = order.price.unwrap_or(order.reference_price);
        // buys pay more, sells receive less
        match order.side {
            OrderSide::Buy => base * (1.0 + self.slippage_bps / 10_000.0),
            OrderSide::Sell => base * (1.0 - self.slippage_bps / 10_000.0),
        }
    }
}

#[async_trait]
impl OrderSink for PaperSink {
    async fn execute(&self, order: &Order) -> Result<Fill> {
        let reject = |reason: String| Error::OrderExecution {
            symbol: order.symbol.clone(),
            reason,
        };
        if order.quantity == 0 {
            return Err(reject("zero quantity".into()));
        }
        if !(order.reference_price.is_finite() && order.reference_price > 0.0) {
            return Err(reject(format!("no usable price ({})", order.reference_price)));
        }

        let fill_price = self.fill_price(order);
        let notional = fill_price * order.quantity as f64;

        let mut book = self.book.write().await;
        match order.side {
            OrderSide::Buy => {
                if notional > book.cash {
                    return Err(reject(format!("insufficient paper cash {:.2} for {notional:.2}", book.cash)));
                }
                book.cash -= notional;
                *book.holdings.entry(order.symbol.clone()).or_default() += order.quantity;
            }
            OrderSide::Sell => {
                let held = book.holdings.get(&order.symbol).copied().unwrap_or(0);
                if held < order.quantity {
                    return Err(reject(format!("selling {} but holding {held}", order.quantity)));
                }
                book.cash += notional;
                book.holdings.insert(order.symbol.clone(), held - order.quantity);
            }
        }

        let fill = Fill {
            order_id: order.id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            fill_price,
            quantity: order.quantity,
            timestamp: Utc::now(),
        };
        book.fills.push(fill.clone());

        debug!(
            symbol = %order.symbol,
            side = %order.side,
            reference = order.reference_price,
            fill = fill_price,
            qty = order.quantity,
            "Paper fill simulated"
        );
        Ok(fill)
    }
}
