use thiserror::Error;

use crate::RejectionReason;

#[derive(Debug, Error)]
pub enum Error {
    /// Not enough candles to start a simulation or build a snapshot.
    #[error("Insufficient data for {symbol}: {bars} bars available, {required} required")]
    InsufficientData {
        symbol: String,
        bars: usize,
        required: usize,
    },

    #[error("Order execution failed for {symbol}: {reason}")]
    OrderExecution { symbol: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown strategy: '{0}'")]
    UnknownStrategy(String),

    #[error("Market data error: {0}")]
    Data(String),

    #[error("Order rejected: {reason}")]
    OrderRejected { reason: RejectionReason },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
