use std::sync::Mutex;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{MarketSnapshot, ReasonCode, RejectionReason, Signal, SignalKind};

/// Audit record for one evaluated step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Backtest run id or live session id.
    pub run_id: String,
    pub sequence: u64,
    pub symbol: String,
    pub strategy: String,
    pub timestamp: NaiveDateTime,
    pub kind: SignalKind,
    pub reason: ReasonCode,
    pub detail: String,
    /// Snapshot the decision was made on.
    pub inputs: serde_json::Value,
    pub approved: bool,
    pub rejection: Option<RejectionReason>,
}

impl DecisionRecord {
    pub fn new(
        run_id: impl Into<String>,
        sequence: u64,
        snapshot: &MarketSnapshot,
        signal: &Signal,
        rejection: Option<RejectionReason>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            sequence,
            symbol: snapshot.symbol.clone(),
            strategy: signal.strategy().to_string(),
            timestamp: snapshot.timestamp,
            kind: signal.kind(),
            reason: signal.reason(),
            detail: signal.detail().to_string(),
            inputs: serde_json::to_value(snapshot).unwrap_or(serde_json::Value::Null),
            approved: rejection.is_none(),
            rejection,
        }
    }
}

/// Receives per-step decision records for external audit logging.
pub trait DecisionSink: Send + Sync {
    fn record(&self, record: DecisionRecord);
}

/// Keeps every record in memory; used by tests and by callers that persist
/// the batch themselves.
#[derive(Debug, Default)]
pub struct MemoryDecisionSink {
    records: Mutex<Vec<DecisionRecord>>,
}

impl MemoryDecisionSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DecisionRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DecisionSink for MemoryDecisionSink {
    fn record(&self, record: DecisionRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

/// Emits each record as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDecisionSink;

impl DecisionSink for LogDecisionSink {
    fn record(&self, record: DecisionRecord) {
        info!(
            run_id = %record.run_id,
            seq = record.sequence,
            symbol = %record.symbol,
            strategy = %record.strategy,
            at = %record.timestamp,
            kind = %record.kind,
            reason = %record.reason,
            approved = record.approved,
            rejection = ?record.rejection,
            detail = %record.detail,
            "Decision"
        );
    }
}
