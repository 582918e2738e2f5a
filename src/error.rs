//! Error types surfaced at the engine's public boundary.

use std::fmt;

/// A strategy capability call's error is out of scope for this crate (the
/// business logic behind it lives elsewhere); it is carried opaquely.
pub type StrategyError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned synchronously from the engine's configuration surface.
///
/// Per-tick per-strategy failures do not appear here; they are attached to
/// the offending [`crate::types::GeneralResult`] / [`crate::types::HybridResult`]
/// instead (see [`crate::types::EngineResult`]).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// `start()` was called with an empty portfolio.
    #[error("no strategies registered")]
    NoStrategiesRegistered,

    /// Unreachable under this crate's typed registration entry points:
    /// registration can never observe an "unsupported" variant, because the
    /// method the caller invoked already fixes the lane.
    #[error("unsupported strategy type")]
    UnsupportedStrategyType,

    /// A registration was attempted after `start()` had already been called.
    #[error("strategy \"{0}\" registered after start")]
    AlreadyStarted(String),
}

impl fmt::Debug for StrategyErrorDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thin display wrapper so a boxed [`StrategyError`] can be logged (see the
/// `tracing` calls in `worker.rs`) without requiring the call site to import
/// `std::error::Error`.
pub struct StrategyErrorDisplay<'a>(pub &'a StrategyError);

impl fmt::Display for StrategyErrorDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
