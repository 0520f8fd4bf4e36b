use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use common::{OrderSide, ReasonCode, Result, StrategyId};

/// One simulated fill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub timestamp: NaiveDateTime,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: u64,
    pub reason: ReasonCode,
    /// Realized P/L of a sell, in currency units. `None` for buys.
    pub realized_pnl: Option<Decimal>,
    /// Sell price against entry, in percent (4 dp). `None` for buys.
    pub pnl_pct: Option<Decimal>,
    /// A sell that left part of the position open.
    pub partial: bool,
}

/// Summary of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub strategy: StrategyId,
    pub bars: usize,
    pub starting_balance: Decimal,
    pub final_balance: Decimal,
    pub realized_pnl: Decimal,
    /// `(final - start) / start * 100`, 4 dp, half away from zero.
    pub total_return_pct: Decimal,
    /// Fills, including a forced liquidation at the end.
    pub trade_count: usize,
    /// Sells that closed the position, the final liquidation included.
    pub round_trips: usize,
    /// Sells that left part of the position open.
    pub partial_exits: usize,
    /// Actionable signals the risk gate refused.
    pub rejected_signals: usize,
    pub trades: Vec<TradeRecord>,
}

impl BacktestResult {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Share of closing fills with positive P/L, in percent. `None` without sells.
    pub fn win_rate_pct(&self) -> Option<Decimal> {
        let closed: Vec<Decimal> = self.trades.iter().filter_map(|t| t.realized_pnl).collect();
        if closed.is_empty() {
            return None;
        }
        let wins = closed.iter().filter(|p| p.is_sign_positive() && !p.is_zero()).count();
        Some(percent(Decimal::from(wins), Decimal::from(closed.len())))
    }
}

/// `part / whole * 100`, rounded to 4 dp half away from zero.
pub(crate) fn percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part / whole * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}
