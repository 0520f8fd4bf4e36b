pub mod config;
pub mod decision;
pub mod error;
pub mod exchange;
pub mod position;
pub mod reason;
pub mod types;

pub use config::Config;
pub use decision::{DecisionRecord, DecisionSink, LogDecisionSink, MemoryDecisionSink};
pub use error::{Error, Result};
pub use exchange::{CandleProvider, OrderSink};
pub use position::{
    DonchianMemory, MemorySlot, OpeningRangeMemory, PositionState, PullbackMemory,
    RsiReversionMemory, SqueezeMemory, StrategyMemory,
};
pub use reason::ReasonCode;
pub use types::*;
