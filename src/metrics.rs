//! Atomic counters: global received/dropped and per-lane received/dropped/timeout.
//!
//! Cache-line aligned so the six concurrently-writing lane workers don't
//! false-share a line.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::portfolio::Lane;

#[repr(C, align(64))]
struct LaneCounters {
    received: AtomicU64,
    dropped: AtomicU64,
    timeout: AtomicU64,
    _padding: [u8; 40],
}

impl LaneCounters {
    const fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            timeout: AtomicU64::new(0),
            _padding: [0; 40],
        }
    }
}

fn lane_index(lane: Lane) -> usize {
    match lane {
        Lane::FixedStopLoss => 0,
        Lane::DebouncedStopLoss => 1,
        Lane::FixedTakeProfit => 2,
        Lane::DebouncedTakeProfit => 3,
        Lane::HybridWithoutTime => 4,
        Lane::HybridWithTime => 5,
    }
}

pub struct Metrics {
    total_received: AtomicU64,
    total_dropped: AtomicU64,
    lanes: [LaneCounters; 6],
    started_at: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_received: AtomicU64::new(0),
            total_dropped: AtomicU64::new(0),
            lanes: [
                LaneCounters::new(),
                LaneCounters::new(),
                LaneCounters::new(),
                LaneCounters::new(),
                LaneCounters::new(),
                LaneCounters::new(),
            ],
            started_at: Instant::now(),
        }
    }

    #[inline]
    pub fn record_received(&self, lane: Lane) {
        self.total_received.fetch_add(1, Ordering::Relaxed);
        self.lanes[lane_index(lane)]
            .received
            .fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self, lane: Lane) {
        self.total_dropped.fetch_add(1, Ordering::Relaxed);
        self.lanes[lane_index(lane)]
            .dropped
            .fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_timeout(&self, lane: Lane) {
        self.lanes[lane_index(lane)]
            .timeout
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_received = self.total_received.load(Ordering::Relaxed);
        let total_dropped = self.total_dropped.load(Ordering::Relaxed);
        let drop_rate_percent = if total_received == 0 {
            0
        } else {
            100 * total_dropped / total_received
        };

        let lane_of = |lane: Lane| {
            let counters = &self.lanes[lane_index(lane)];
            LaneSnapshot {
                received: counters.received.load(Ordering::Relaxed),
                dropped: counters.dropped.load(Ordering::Relaxed),
                timeout: counters.timeout.load(Ordering::Relaxed),
            }
        };

        MetricsSnapshot {
            uptime_secs: self.started_at.elapsed().as_secs(),
            total_received,
            total_dropped,
            drop_rate_percent,
            fixed_stop_loss: lane_of(Lane::FixedStopLoss),
            debounced_stop_loss: lane_of(Lane::DebouncedStopLoss),
            fixed_take_profit: lane_of(Lane::FixedTakeProfit),
            debounced_take_profit: lane_of(Lane::DebouncedTakeProfit),
            hybrid_without_time: lane_of(Lane::HybridWithoutTime),
            hybrid_with_time: lane_of(Lane::HybridWithTime),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaneSnapshot {
    pub received: u64,
    pub dropped: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub total_received: u64,
    pub total_dropped: u64,
    pub drop_rate_percent: u64,
    pub fixed_stop_loss: LaneSnapshot,
    pub debounced_stop_loss: LaneSnapshot,
    pub fixed_take_profit: LaneSnapshot,
    pub debounced_take_profit: LaneSnapshot,
    pub hybrid_without_time: LaneSnapshot,
    pub hybrid_with_time: LaneSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_counters_are_cache_aligned() {
        assert_eq!(std::mem::align_of::<LaneCounters>(), 64);
        assert_eq!(std::mem::size_of::<LaneCounters>(), 64);
    }

    #[test]
    fn drop_rate_zero_when_no_ticks_received() {
        let metrics = Metrics::new();
        assert_eq!(metrics.snapshot().drop_rate_percent, 0);
    }

    #[test]
    fn drop_rate_arithmetic() {
        let metrics = Metrics::new();
        for _ in 0..10 {
            metrics.record_received(Lane::FixedStopLoss);
        }
        for _ in 0..3 {
            metrics.record_dropped(Lane::FixedStopLoss);
        }
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_received, 10);
        assert_eq!(snapshot.total_dropped, 3);
        assert_eq!(snapshot.drop_rate_percent, 30);
        assert_eq!(snapshot.fixed_stop_loss.received, 10);
        assert_eq!(snapshot.fixed_stop_loss.dropped, 3);
    }

    #[test]
    fn timeout_is_per_lane_only() {
        let metrics = Metrics::new();
        metrics.record_timeout(Lane::HybridWithTime);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.hybrid_with_time.timeout, 1);
        assert_eq!(snapshot.fixed_stop_loss.timeout, 0);
    }

    #[test]
    fn concurrent_increments_are_consistent() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(Metrics::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let metrics = metrics.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    metrics.record_received(Lane::FixedTakeProfit);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().fixed_take_profit.received, 8000);
        assert_eq!(metrics.snapshot().total_received, 8000);
    }
}
