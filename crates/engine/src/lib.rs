pub mod executor;
pub mod lifecycle;
pub mod scheduler;
pub mod throttle;

pub use executor::OrderExecutor;
pub use lifecycle::{Engine, EngineHandle};
pub use scheduler::{BatchReport, Scheduler, SymbolOutcome, TradingSession};
pub use throttle::Throttle;
