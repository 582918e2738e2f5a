//! The six strategy capability sets the engine consumes.
//!
//! The business logic behind each method (how a threshold is computed, how
//! a trigger decision is made) is an external collaborator; this module only
//! declares the shape the engine calls into, plus the internal adapters that
//! let the lane workers treat all four non-hybrid variants (and both hybrid
//! variants) through one shared evaluation path.

use rust_decimal::Decimal;
use std::time::Duration;

use crate::error::StrategyError;
use crate::types::{GeneralLaneTag, HybridLaneTag, TriggerKind};

pub trait FixedStopLoss: Send + Sync {
    fn calc_stop(&self, price: Decimal) -> Result<Decimal, StrategyError>;
    fn should_trigger_stop(&self, price: Decimal) -> Result<bool, StrategyError>;
}

pub trait DebouncedStopLoss: Send + Sync {
    fn calc_stop(&self, price: Decimal) -> Result<Decimal, StrategyError>;
    fn should_trigger_stop(&self, price: Decimal, ts_ms: i64) -> Result<bool, StrategyError>;
    fn time_threshold(&self) -> Duration;
}

pub trait FixedTakeProfit: Send + Sync {
    fn calc_tp(&self, price: Decimal) -> Result<Decimal, StrategyError>;
    fn should_trigger_tp(&self, price: Decimal) -> Result<bool, StrategyError>;
}

pub trait DebouncedTakeProfit: Send + Sync {
    fn calc_tp(&self, price: Decimal) -> Result<Decimal, StrategyError>;
    fn should_trigger_tp(&self, price: Decimal, ts_ms: i64) -> Result<bool, StrategyError>;
    fn time_threshold(&self) -> Duration;
}

pub trait HybridWithoutTime: Send + Sync {
    fn calculate(&self, price: Decimal) -> Result<(Decimal, Decimal), StrategyError>;
    fn should_trigger_stop(&self, price: Decimal) -> Result<bool, StrategyError>;
    fn should_trigger_tp(&self, price: Decimal) -> Result<bool, StrategyError>;
}

pub trait HybridWithTime: Send + Sync {
    fn calculate(&self, price: Decimal) -> Result<(Decimal, Decimal), StrategyError>;
    fn should_trigger_stop(&self, price: Decimal) -> Result<bool, StrategyError>;
    fn should_trigger_tp(&self, price: Decimal) -> Result<bool, StrategyError>;
}

/// Internal evaluation surface shared by the four non-hybrid lanes (FSS, DSS,
/// FTP, DTP). The lane worker calls only these methods; it never needs to
/// know which of the four public traits a given boxed strategy implements.
pub(crate) trait GeneralLaneStrategy: Send + Sync {
    fn threshold(&self, price: Decimal) -> Result<Decimal, StrategyError>;
    fn triggered(&self, price: Decimal, ts_ms: i64) -> Result<bool, StrategyError>;
    fn time_threshold(&self) -> Duration;
    fn trigger_kind(&self) -> TriggerKind;
    fn lane_tag(&self) -> GeneralLaneTag;
}

/// Internal evaluation surface shared by the two hybrid lanes (HF, HD).
pub(crate) trait HybridLaneStrategy: Send + Sync {
    fn calculate(&self, price: Decimal) -> Result<(Decimal, Decimal), StrategyError>;
    fn should_trigger_stop(&self, price: Decimal) -> Result<bool, StrategyError>;
    fn should_trigger_tp(&self, price: Decimal) -> Result<bool, StrategyError>;
    fn time_threshold(&self) -> Duration;
    fn lane_tag(&self) -> HybridLaneTag;
}

pub(crate) struct FixedStopLossAdapter(pub Box<dyn FixedStopLoss>);

impl GeneralLaneStrategy for FixedStopLossAdapter {
    fn threshold(&self, price: Decimal) -> Result<Decimal, StrategyError> {
        self.0.calc_stop(price)
    }

    fn triggered(&self, price: Decimal, _ts_ms: i64) -> Result<bool, StrategyError> {
        self.0.should_trigger_stop(price)
    }

    fn time_threshold(&self) -> Duration {
        Duration::ZERO
    }

    fn trigger_kind(&self) -> TriggerKind {
        TriggerKind::StopLoss
    }

    fn lane_tag(&self) -> GeneralLaneTag {
        GeneralLaneTag::Fixed
    }
}

pub(crate) struct DebouncedStopLossAdapter(pub Box<dyn DebouncedStopLoss>);

impl GeneralLaneStrategy for DebouncedStopLossAdapter {
    fn threshold(&self, price: Decimal) -> Result<Decimal, StrategyError> {
        self.0.calc_stop(price)
    }

    fn triggered(&self, price: Decimal, ts_ms: i64) -> Result<bool, StrategyError> {
        self.0.should_trigger_stop(price, ts_ms)
    }

    fn time_threshold(&self) -> Duration {
        self.0.time_threshold()
    }

    fn trigger_kind(&self) -> TriggerKind {
        TriggerKind::StopLoss
    }

    fn lane_tag(&self) -> GeneralLaneTag {
        GeneralLaneTag::Debounced
    }
}

pub(crate) struct FixedTakeProfitAdapter(pub Box<dyn FixedTakeProfit>);

impl GeneralLaneStrategy for FixedTakeProfitAdapter {
    fn threshold(&self, price: Decimal) -> Result<Decimal, StrategyError> {
        self.0.calc_tp(price)
    }

    fn triggered(&self, price: Decimal, _ts_ms: i64) -> Result<bool, StrategyError> {
        self.0.should_trigger_tp(price)
    }

    fn time_threshold(&self) -> Duration {
        Duration::ZERO
    }

    fn trigger_kind(&self) -> TriggerKind {
        TriggerKind::TakeProfit
    }

    fn lane_tag(&self) -> GeneralLaneTag {
        GeneralLaneTag::Fixed
    }
}

pub(crate) struct DebouncedTakeProfitAdapter(pub Box<dyn DebouncedTakeProfit>);

impl GeneralLaneStrategy for DebouncedTakeProfitAdapter {
    fn threshold(&self, price: Decimal) -> Result<Decimal, StrategyError> {
        self.0.calc_tp(price)
    }

    fn triggered(&self, price: Decimal, ts_ms: i64) -> Result<bool, StrategyError> {
        self.0.should_trigger_tp(price, ts_ms)
    }

    fn time_threshold(&self) -> Duration {
        self.0.time_threshold()
    }

    fn trigger_kind(&self) -> TriggerKind {
        TriggerKind::TakeProfit
    }

    fn lane_tag(&self) -> GeneralLaneTag {
        GeneralLaneTag::Debounced
    }
}

pub(crate) struct HybridWithoutTimeAdapter(pub Box<dyn HybridWithoutTime>);

impl HybridLaneStrategy for HybridWithoutTimeAdapter {
    fn calculate(&self, price: Decimal) -> Result<(Decimal, Decimal), StrategyError> {
        self.0.calculate(price)
    }

    fn should_trigger_stop(&self, price: Decimal) -> Result<bool, StrategyError> {
        self.0.should_trigger_stop(price)
    }

    fn should_trigger_tp(&self, price: Decimal) -> Result<bool, StrategyError> {
        self.0.should_trigger_tp(price)
    }

    fn time_threshold(&self) -> Duration {
        Duration::ZERO
    }

    fn lane_tag(&self) -> HybridLaneTag {
        HybridLaneTag::HybridFixed
    }
}

pub(crate) struct HybridWithTimeAdapter(pub Box<dyn HybridWithTime>);

impl HybridLaneStrategy for HybridWithTimeAdapter {
    fn calculate(&self, price: Decimal) -> Result<(Decimal, Decimal), StrategyError> {
        self.0.calculate(price)
    }

    fn should_trigger_stop(&self, price: Decimal) -> Result<bool, StrategyError> {
        self.0.should_trigger_stop(price)
    }

    fn should_trigger_tp(&self, price: Decimal) -> Result<bool, StrategyError> {
        self.0.should_trigger_tp(price)
    }

    fn time_threshold(&self) -> Duration {
        Duration::ZERO
    }

    fn lane_tag(&self) -> HybridLaneTag {
        HybridLaneTag::HybridDebounced
    }
}
