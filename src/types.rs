//! Data shapes shared across the engine: incoming ticks and outgoing results.

use rust_decimal::Decimal;
use std::time::Duration;

use crate::error::StrategyError;

/// A single incoming price observation.
///
/// Immutable once produced; `updated_at_ms` is the sole temporal input to
/// time-based (debounced) strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricePoint {
    pub new_price: Decimal,
    /// Unix timestamp in milliseconds.
    pub updated_at_ms: i64,
}

impl PricePoint {
    pub fn new(new_price: Decimal, updated_at_ms: i64) -> Self {
        Self {
            new_price,
            updated_at_ms,
        }
    }
}

/// Which of the two non-hybrid categories a general-lane strategy belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneralLaneTag {
    Fixed,
    Debounced,
}

/// Which of the two hybrid categories a hybrid-lane strategy belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HybridLaneTag {
    HybridFixed,
    HybridDebounced,
}

/// The kind of exit a general-lane strategy guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    StopLoss,
    TakeProfit,
}

/// The kind of exit a hybrid-lane strategy fired, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HybridTriggerKind {
    None,
    StopLoss,
    TakeProfit,
}

/// One strategy's evaluation of one tick, for the four non-hybrid lanes.
#[derive(Debug)]
pub struct GeneralResult {
    pub strategy_name: String,
    pub lane_tag: GeneralLaneTag,
    pub trigger_kind: TriggerKind,
    pub last_price: Decimal,
    pub price_threshold: Decimal,
    pub last_time: i64,
    pub time_threshold: Duration,
    pub triggered: bool,
    pub error: Option<StrategyError>,
}

/// One strategy's evaluation of one tick, for the two hybrid lanes.
#[derive(Debug)]
pub struct HybridResult {
    pub strategy_name: String,
    pub lane_tag: HybridLaneTag,
    pub last_price: Decimal,
    pub stop_threshold: Decimal,
    pub profit_threshold: Decimal,
    pub last_time: i64,
    pub time_threshold: Duration,
    pub triggered: bool,
    pub trigger_kind: HybridTriggerKind,
    pub error: Option<StrategyError>,
}

/// A result record from either result channel, as seen by a `report_callback`.
#[derive(Debug)]
pub enum EngineResult {
    General(GeneralResult),
    Hybrid(HybridResult),
}

impl EngineResult {
    pub fn triggered(&self) -> bool {
        match self {
            EngineResult::General(r) => r.triggered,
            EngineResult::Hybrid(r) => r.triggered,
        }
    }

    pub fn has_error(&self) -> bool {
        match self {
            EngineResult::General(r) => r.error.is_some(),
            EngineResult::Hybrid(r) => r.error.is_some(),
        }
    }
}
