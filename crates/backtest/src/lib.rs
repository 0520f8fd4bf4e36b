pub mod ledger;
pub mod report;
pub mod service;
pub mod simulator;

pub use ledger::Ledger;
pub use report::{BacktestResult, TradeRecord};
pub use service::{BacktestRequest, BacktestService};
pub use simulator::{BacktestConfig, Backtester};
