use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::StrategyId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RsiReversionMemory {
    pub was_oversold: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DonchianMemory {
    /// ATR at entry; sizes the initial stop.
    pub entry_atr: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullbackMemory {
    pub was_oversold: bool,
    pub entry_atr: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpeningRangeMemory {
    pub entry_time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqueezeMemory {
    pub squeeze_active: bool,
    pub entry_atr: Option<f64>,
}

/// Per-strategy private state, one variant per strategy that needs memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyMemory {
    RsiReversion(RsiReversionMemory),
    Donchian(DonchianMemory),
    Pullback(PullbackMemory),
    OpeningRange(OpeningRangeMemory),
    Squeeze(SqueezeMemory),
}

/// Typed access to one [`StrategyMemory`] variant.
pub trait MemorySlot: Default + Sized {
    fn wrap(self) -> StrategyMemory;
    fn slot(memory: &StrategyMemory) -> Option<&Self>;
    /// Returns the slot, replacing a mismatched variant with a default one.
    fn slot_mut(memory: &mut StrategyMemory) -> &mut Self;
}

macro_rules! memory_slot {
    ($ty:ty, $variant:ident) => {
        impl MemorySlot for $ty {
            fn wrap(self) -> StrategyMemory {
                StrategyMemory::$variant(self)
            }

            fn slot(memory: &StrategyMemory) -> Option<&Self> {
                match memory {
                    StrategyMemory::$variant(m) => Some(m),
                    _ => None,
                }
            }

            fn slot_mut(memory: &mut StrategyMemory) -> &mut Self {
                if Self::slot(memory).is_none() {
                    *memory = Self::default().wrap();
                }
                match memory {
                    StrategyMemory::$variant(m) => m,
                    _ => unreachable!("memory slot was just initialised"),
                }
            }
        }
    };
}

memory_slot!(RsiReversionMemory, RsiReversion);
memory_slot!(DonchianMemory, Donchian);
memory_slot!(PullbackMemory, Pullback);
memory_slot!(OpeningRangeMemory, OpeningRange);
memory_slot!(SqueezeMemory, Squeeze);

/// Mutable per symbol+strategy context owned by the backtest ledger or the
/// live session.
///
/// The high-water-mark only moves up while a position is open and is cleared
/// when the position closes. Strategy memory is keyed by [`StrategyId`], so an
/// ensemble and its constituents can share one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    pub symbol: String,
    pub has_position: bool,
    pub entry_price: f64,
    pub quantity: u64,
    pub high_water_mark: Option<f64>,
    pub available_cash: f64,
    pub entry_time: Option<NaiveDateTime>,
    pub trading_day: Option<NaiveDate>,
    pub daily_entry_count: u32,
    /// Confirmed partial exits of the open position.
    pub partial_exits: u32,
    memory: BTreeMap<StrategyId, StrategyMemory>,
}

impl PositionState {
    pub fn new(symbol: impl Into<String>, available_cash: f64) -> Self {
        Self {
            symbol: symbol.into(),
            has_position: false,
            entry_price: 0.0,
            quantity: 0,
            high_water_mark: None,
            available_cash,
            entry_time: None,
            trading_day: None,
            daily_entry_count: 0,
            partial_exits: 0,
            memory: BTreeMap::new(),
        }
    }

    /// Resets the day-scoped entry counter when `day` starts a new session.
    pub fn roll_day(&mut self, day: NaiveDate) {
        if self.trading_day != Some(day) {
            self.trading_day = Some(day);
            self.daily_entry_count = 0;
        }
    }

    /// Raises the high-water-mark to `price` if a position is open.
    pub fn mark_price(&mut self, price: f64) {
        if !self.has_position || !price.is_finite() {
            return;
        }
        self.high_water_mark = Some(match self.high_water_mark {
            Some(hwm) => hwm.max(price),
            None => price,
        });
    }

    /// Records a confirmed entry fill.
    pub fn open(&mut self, price: f64, quantity: u64, at: NaiveDateTime) {
        self.has_position = true;
        self.entry_price = price;
        self.quantity = quantity;
        self.high_water_mark = Some(price);
        self.entry_time = Some(at);
        self.daily_entry_count += 1;
        self.partial_exits = 0;
    }

    /// Records a confirmed exit fill of `quantity` units. Closing the last
    /// unit closes the position; anything less counts as a partial exit.
    pub fn reduce(&mut self, quantity: u64) {
        self.quantity = self.quantity.saturating_sub(quantity);
        if self.quantity == 0 {
            self.close();
        } else {
            self.partial_exits += 1;
        }
    }

    pub fn close(&mut self) {
        self.has_position = false;
        self.entry_price = 0.0;
        self.quantity = 0;
        self.high_water_mark = None;
        self.entry_time = None;
        self.partial_exits = 0;
    }

    /// Units to sell for a SELL with the given size fraction: the whole
    /// holding at 1.0, otherwise `floor(quantity * fraction)` but at least one.
    pub fn sell_quantity(&self, fraction: f64) -> u64 {
        if self.quantity == 0 {
            return 0;
        }
        if fraction >= 1.0 {
            return self.quantity;
        }
        let partial = (self.quantity as f64 * fraction.max(0.0)).floor() as u64;
        partial.clamp(1, self.quantity)
    }

    /// Unrealized P/L of the open position at `price`, in percent.
    pub fn unrealized_pnl_pct(&self, price: f64) -> Option<f64> {
        if !self.has_position || self.entry_price <= 0.0 {
            return None;
        }
        Some((price - self.entry_price) / self.entry_price * 100.0)
    }

    /// Percent drop of `price` below the high-water-mark.
    pub fn drawdown_from_peak_pct(&self, price: f64) -> Option<f64> {
        match self.high_water_mark {
            Some(hwm) if self.has_position && hwm > 0.0 => Some((hwm - price) / hwm * 100.0),
            _ => None,
        }
    }

    pub fn memory<T: MemorySlot>(&self, id: StrategyId) -> Option<&T> {
        self.memory.get(&id).and_then(T::slot)
    }

    /// Memory slot of strategy `id`, created on first use.
    pub fn memory_mut<T: MemorySlot>(&mut self, id: StrategyId) -> &mut T {
        let entry = self
            .memory
            .entry(id)
            .or_insert_with(|| T::default().wrap());
        T::slot_mut(entry)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
