use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use common::{Error, Result};

/// Decimal places kept when a feed price enters the ledger.
const PRICE_SCALE: u32 = 8;

/// Converts a price from the candle feed into ledger arithmetic.
pub fn to_decimal(value: f64) -> Result<Decimal> {
    Decimal::try_from(value)
        .map(|d| d.round_dp(PRICE_SCALE))
        .map_err(|e| Error::Data(format!("price {value} is not representable: {e}")))
}

/// Simulated cash account holding at most one long position.
///
/// All money is `Decimal`, so the final balance equals the starting balance
/// plus the sum of realized P/L exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    starting_balance: Decimal,
    cash: Decimal,
    quantity: u64,
    entry_price: Decimal,
    realized_pnl: Decimal,
}

impl Ledger {
    pub fn new(starting_balance: Decimal) -> Self {
        Self {
            starting_balance,
            cash: starting_balance,
            quantity: 0,
            entry_price: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
        }
    }

    pub fn starting_balance(&self) -> Decimal {
        self.starting_balance
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn entry_price(&self) -> Decimal {
        self.entry_price
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    /// Whole units the current cash buys at `price`.
    pub fn affordable(&self, price: Decimal) -> u64 {
        if price <= Decimal::ZERO {
            return 0;
        }
        (self.cash / price).floor().to_u64().unwrap_or(0)
    }

    /// Cash plus holdings marked at `price`.
    pub fn equity(&self, price: Decimal) -> Decimal {
        self.cash + price * Decimal::from(self.quantity)
    }

    pub fn buy(&mut self, price: Decimal, quantity: u64) -> Result<()> {
        if self.quantity > 0 {
            return Err(Error::Other("ledger already holds a position".into()));
        }
        let cost = price * Decimal::from(quantity);
        if quantity == 0 || cost > self.cash {
            return Err(Error::Other(format!(
                "cannot buy {quantity} @ {price} with cash {}",
                self.cash
            )));
        }
        self.cash -= cost;
        self.quantity = quantity;
        self.entry_price = price;
        Ok(())
    }

    /// Sells `quantity` units at `price` and returns the realized P/L.
    pub fn sell(&mut self, price: Decimal, quantity: u64) -> Result<Decimal> {
        if quantity == 0 || quantity > self.quantity {
            return Err(Error::Other(format!(
                "cannot sell {quantity}, holding {}",
                self.quantity
            )));
        }
        let qty = Decimal::from(quantity);
        let pnl = (price - self.entry_price) * qty;
        self.cash += price * qty;
        self.realized_pnl += pnl;
        self.quantity -= quantity;
        if self.quantity == 0 {
            self.entry_price = Decimal::ZERO;
        }
        Ok(pnl)
    }
}
