use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ReasonCode;

/// One OHLCV bar. Timestamps are exchange-local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// One evaluation unit: the current bar plus everything derived from the
/// bars up to and including it.
///
/// Derived fields are `None` until enough history exists to compute them.
/// Strategies treat a missing required field as `DATA_MISSING`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,

    pub ma_short: Option<f64>,
    pub ma_long: Option<f64>,
    /// True when the short MA is above its value on the previous bar.
    pub ma_short_rising: Option<bool>,
    /// Average volume of the bars preceding the current one.
    pub avg_volume: Option<f64>,
    /// Current volume divided by `avg_volume`.
    pub volume_ratio: Option<f64>,
    /// Bid/ask spread in percent. Only available from live quotes.
    pub spread_pct: Option<f64>,
    /// N-bar resistance: highest high of the preceding bars.
    pub breakout_price: Option<f64>,
    pub donchian_high: Option<f64>,
    pub donchian_low: Option<f64>,
    /// Rolling box over the preceding bars, used by the box breakout strategy.
    pub range_high: Option<f64>,
    pub range_low: Option<f64>,
    pub atr: Option<f64>,
    /// Percentile rank (0-100) of the current ATR within its trailing window.
    pub atr_percentile: Option<f64>,
    pub rsi: Option<f64>,
    pub opening_range_high: Option<f64>,
    pub opening_range_low: Option<f64>,
}

impl MarketSnapshot {
    /// Snapshot carrying only the raw bar; every derived field is empty.
    pub fn from_candle(symbol: impl Into<String>, candle: &Candle) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp: candle.timestamp,
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            volume: candle.volume,
            ma_short: None,
            ma_long: None,
            ma_short_rising: None,
            avg_volume: None,
            volume_ratio: None,
            spread_pct: None,
            breakout_price: None,
            donchian_high: None,
            donchian_low: None,
            range_high: None,
            range_low: None,
            atr: None,
            atr_percentile: None,
            rsi: None,
            opening_range_high: None,
            opening_range_low: None,
        }
    }

    /// A snapshot whose current price is not strictly positive must never
    /// reach a strategy.
    pub fn is_valid(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

/// Identifier of a built-in strategy. Also keys per-strategy memory inside
/// [`crate::PositionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    TrendBreakout,
    RsiReversion,
    SupportResistance,
    DonchianTrail,
    Pullback,
    OpeningRange,
    VolatilitySqueeze,
    Ensemble,
}

impl StrategyId {
    pub const ALL: [StrategyId; 8] = [
        StrategyId::TrendBreakout,
        StrategyId::RsiReversion,
        StrategyId::SupportResistance,
        StrategyId::DonchianTrail,
        StrategyId::Pullback,
        StrategyId::OpeningRange,
        StrategyId::VolatilitySqueeze,
        StrategyId::Ensemble,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::TrendBreakout => "trend_breakout",
            StrategyId::RsiReversion => "rsi_reversion",
            StrategyId::SupportResistance => "support_resistance",
            StrategyId::DonchianTrail => "donchian_trail",
            StrategyId::Pullback => "pullback",
            StrategyId::OpeningRange => "opening_range",
            StrategyId::VolatilitySqueeze => "volatility_squeeze",
            StrategyId::Ensemble => "ensemble",
        }
    }
}

impl std::fmt::Display for StrategyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StrategyId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        StrategyId::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| crate::Error::UnknownStrategy(s.to_string()))
    }
}

/// Decision kind. `Hold` = in a position, no action; `None` = flat, no action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    Buy,
    Sell,
    Hold,
    None,
}

impl SignalKind {
    pub fn is_actionable(&self) -> bool {
        matches!(self, SignalKind::Buy | SignalKind::Sell)
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::Buy => write!(f, "BUY"),
            SignalKind::Sell => write!(f, "SELL"),
            SignalKind::Hold => write!(f, "HOLD"),
            SignalKind::None => write!(f, "NONE"),
        }
    }
}

/// Output of one strategy evaluation. Built once, never mutated afterwards;
/// the `with_*` adapters consume and return a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    kind: SignalKind,
    symbol: String,
    strategy: String,
    reason: ReasonCode,
    detail: String,
    confidence: f64,
    size_fraction: f64,
}

impl Signal {
    fn new(
        kind: SignalKind,
        symbol: impl Into<String>,
        strategy: impl Into<String>,
        reason: ReasonCode,
        detail: impl Into<String>,
    ) -> Self {
        let weight = if kind.is_actionable() { 1.0 } else { 0.0 };
        Self {
            kind,
            symbol: symbol.into(),
            strategy: strategy.into(),
            reason,
            detail: detail.into(),
            confidence: weight,
            size_fraction: weight,
        }
    }

    pub fn buy(
        symbol: impl Into<String>,
        strategy: impl Into<String>,
        reason: ReasonCode,
        detail: impl Into<String>,
    ) -> Self {
        Self::new(SignalKind::Buy, symbol, strategy, reason, detail)
    }

    pub fn sell(
        symbol: impl Into<String>,
        strategy: impl Into<String>,
        reason: ReasonCode,
        detail: impl Into<String>,
    ) -> Self {
        Self::new(SignalKind::Sell, symbol, strategy, reason, detail)
    }

    pub fn hold(
        symbol: impl Into<String>,
        strategy: impl Into<String>,
        reason: ReasonCode,
        detail: impl Into<String>,
    ) -> Self {
        Self::new(SignalKind::Hold, symbol, strategy, reason, detail)
    }

    pub fn none(
        symbol: impl Into<String>,
        strategy: impl Into<String>,
        reason: ReasonCode,
        detail: impl Into<String>,
    ) -> Self {
        Self::new(SignalKind::None, symbol, strategy, reason, detail)
    }

    /// Confidence is clamped into `[0, 1]`; NaN becomes 0.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp_unit(confidence);
        self
    }

    /// Share of the position (SELL) or of available cash (BUY) to use.
    pub fn with_size_fraction(mut self, fraction: f64) -> Self {
        self.size_fraction = clamp_unit(fraction);
        self
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn reason(&self) -> ReasonCode {
        self.reason
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn size_fraction(&self) -> f64 {
        self.size_fraction
    }

    /// True for a SELL that only reduces the position.
    pub fn is_partial(&self) -> bool {
        self.kind == SignalKind::Sell && self.size_fraction < 1.0
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// An order handed to the [`crate::OrderSink`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    /// Whole units.
    pub quantity: u64,
    /// `None` = market order; `Some(price)` = limit order.
    pub price: Option<f64>,
    /// Close price of the snapshot that produced the signal.
    pub reference_price: f64,
}

impl Order {
    pub fn market(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: u64,
        reference_price: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            side,
            quantity,
            price: None,
            reference_price,
        }
    }
}

/// Confirmation of a filled order returned by the sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub fill_price: f64,
    pub quantity: u64,
    pub timestamp: DateTime<Utc>,
}

/// Whether the process replays history or paper-trades on a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Backtest,
    Paper,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Backtest => write!(f, "backtest"),
            TradingMode::Paper => write!(f, "paper"),
        }
    }
}

/// Reason a signal was rejected by the risk gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectionReason {
    KillSwitchInactive,
    DailyLossLimit { daily_pnl_pct: f64 },
    AlreadyInPosition,
    NoPosition,
    DailyEntryLimit { limit: u32 },
    Other(String),
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::KillSwitchInactive => write!(f, "kill switch inactive"),
            RejectionReason::DailyLossLimit { daily_pnl_pct } => {
                write!(f, "daily loss limit breached ({daily_pnl_pct:.2}%)")
            }
            RejectionReason::AlreadyInPosition => write!(f, "already in position"),
            RejectionReason::NoPosition => write!(f, "no position to sell"),
            RejectionReason::DailyEntryLimit { limit } => {
                write!(f, "daily entry limit of {limit} reached")
            }
            RejectionReason::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Current state of the live engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Stopped,
    Running,
    Paused,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Stopped => write!(f, "stopped"),
            EngineState::Running => write!(f, "running"),
            EngineState::Paused => write!(f, "paused"),
        }
    }
}

/// Commands sent to the engine via the command channel.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Start,
    Stop,
    Pause,
    Resume,
    ReactivateKillSwitch,
    /// Run one evaluation batch immediately, outside the schedule.
    EvaluateNow,
}

/// Events emitted by the risk gate and the order executor.
#[derive(Debug, Clone)]
pub enum RiskEvent {
    OrderRejected {
        symbol: String,
        strategy: String,
        kind: SignalKind,
        reason: RejectionReason,
    },
    OrderFailed {
        symbol: String,
        error: String,
    },
    Filled {
        fill: Fill,
        reason: ReasonCode,
    },
    KillSwitchTripped {
        daily_pnl_pct: f64,
    },
    KillSwitchReactivated,
}

// ─── Tests ────────────────────────────────────────────────────────────────────
