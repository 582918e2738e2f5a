//! Four atomic counters over drained result records.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::EngineResult;

#[derive(Default)]
pub struct Reporter {
    general_results: AtomicU64,
    hybrid_results: AtomicU64,
    triggers: AtomicU64,
    errors: AtomicU64,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one drained record's effect on the four counters. Called once
    /// per record inside a result collector's loop, never once at startup.
    pub fn record(&self, result: &EngineResult) {
        match result {
            EngineResult::General(_) => self.general_results.fetch_add(1, Ordering::Relaxed),
            EngineResult::Hybrid(_) => self.hybrid_results.fetch_add(1, Ordering::Relaxed),
        };

        if result.has_error() {
            self.errors.fetch_add(1, Ordering::Relaxed);
        } else if result.triggered() {
            self.triggers.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> ReporterSnapshot {
        ReporterSnapshot {
            general_results: self.general_results.load(Ordering::Relaxed),
            hybrid_results: self.hybrid_results.load(Ordering::Relaxed),
            triggers: self.triggers.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReporterSnapshot {
    pub general_results: u64,
    pub hybrid_results: u64,
    pub triggers: u64,
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GeneralLaneTag, GeneralResult, TriggerKind};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn general(triggered: bool, error: Option<&str>) -> EngineResult {
        EngineResult::General(GeneralResult {
            strategy_name: "s".to_string(),
            lane_tag: GeneralLaneTag::Fixed,
            trigger_kind: TriggerKind::StopLoss,
            last_price: dec!(100),
            price_threshold: dec!(95),
            last_time: 0,
            time_threshold: Duration::ZERO,
            triggered,
            error: error.map(|e| e.into()),
        })
    }

    #[test]
    fn per_record_increments_not_once_at_startup() {
        let reporter = Reporter::new();
        assert_eq!(reporter.snapshot().general_results, 0);
        reporter.record(&general(false, None));
        assert_eq!(reporter.snapshot().general_results, 1);
        reporter.record(&general(false, None));
        assert_eq!(reporter.snapshot().general_results, 2);
    }

    #[test]
    fn error_wins_over_triggered() {
        let reporter = Reporter::new();
        reporter.record(&general(true, Some("boom")));
        let snapshot = reporter.snapshot();
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.triggers, 0);
    }

    #[test]
    fn triggered_without_error_counts_as_trigger() {
        let reporter = Reporter::new();
        reporter.record(&general(true, None));
        let snapshot = reporter.snapshot();
        assert_eq!(snapshot.triggers, 1);
        assert_eq!(snapshot.errors, 0);
    }
}
