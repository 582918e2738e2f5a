//! The six bounded ingest channels and two bounded result channels, plus
//! their fixed-order close protocol.
//!
//! Ingest sender handles are wrapped in a lock so `close_all()` can drop them
//! explicitly (closing the channel) without requiring `&mut self` on the
//! shared [`crate::engine::Engine`]. The lock is uncontended in the common
//! case (a single producer calling `collect`), so it does not undermine the
//! "collect never blocks on worker latency" guarantee.

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::portfolio::Lane;
use crate::types::{GeneralResult, HybridResult, PricePoint};

/// Whether a lane feeds the general or the hybrid result channel. Used by
/// `Engine::start` to pick which worker loop to spawn for a given lane.
pub fn is_hybrid_lane(lane: Lane) -> bool {
    matches!(lane, Lane::HybridWithoutTime | Lane::HybridWithTime)
}

struct IngestChannel {
    tx: Mutex<Option<mpsc::Sender<PricePoint>>>,
    rx: Mutex<Option<mpsc::Receiver<PricePoint>>>,
}

impl IngestChannel {
    fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Non-blocking send; `Ok(false)` means the channel is full (ingest
    /// backpressure), `Ok(true)` means delivered, and `Err(())` means the
    /// channel has already been closed (post-`stop` `collect` calls land
    /// here per S5 and must not panic).
    fn try_send(&self, tick: PricePoint) -> Result<bool, ()> {
        let guard = self.tx.lock();
        match guard.as_ref() {
            Some(tx) => Ok(tx.try_send(tick).is_ok()),
            None => Err(()),
        }
    }

    fn take_receiver(&self) -> Option<mpsc::Receiver<PricePoint>> {
        self.rx.lock().take()
    }

    fn close(&self) {
        self.tx.lock().take();
    }
}

pub struct Execution {
    fixed_stop_loss: IngestChannel,
    debounced_stop_loss: IngestChannel,
    fixed_take_profit: IngestChannel,
    debounced_take_profit: IngestChannel,
    hybrid_without_time: IngestChannel,
    hybrid_with_time: IngestChannel,

    general_tx: mpsc::Sender<GeneralResult>,
    general_rx: Mutex<Option<mpsc::Receiver<GeneralResult>>>,
    hybrid_tx: mpsc::Sender<HybridResult>,
    hybrid_rx: Mutex<Option<mpsc::Receiver<HybridResult>>>,
}

impl Execution {
    pub fn new(buffer_size: usize, buffer_result_size: usize) -> Self {
        let (general_tx, general_rx) = mpsc::channel(buffer_result_size);
        let (hybrid_tx, hybrid_rx) = mpsc::channel(buffer_result_size);
        Self {
            fixed_stop_loss: IngestChannel::new(buffer_size),
            debounced_stop_loss: IngestChannel::new(buffer_size),
            fixed_take_profit: IngestChannel::new(buffer_size),
            debounced_take_profit: IngestChannel::new(buffer_size),
            hybrid_without_time: IngestChannel::new(buffer_size),
            hybrid_with_time: IngestChannel::new(buffer_size),
            general_tx,
            general_rx: Mutex::new(Some(general_rx)),
            hybrid_tx,
            hybrid_rx: Mutex::new(Some(hybrid_rx)),
        }
    }

    fn ingest(&self, lane: Lane) -> &IngestChannel {
        match lane {
            Lane::FixedStopLoss => &self.fixed_stop_loss,
            Lane::DebouncedStopLoss => &self.debounced_stop_loss,
            Lane::FixedTakeProfit => &self.fixed_take_profit,
            Lane::DebouncedTakeProfit => &self.debounced_take_profit,
            Lane::HybridWithoutTime => &self.hybrid_without_time,
            Lane::HybridWithTime => &self.hybrid_with_time,
        }
    }

    /// Non-blocking ingest send for `collect()`. See [`IngestChannel::try_send`].
    pub fn try_send_tick(&self, lane: Lane, tick: PricePoint) -> Result<bool, ()> {
        self.ingest(lane).try_send(tick)
    }

    /// Takes the ingest receiver for a lane. Called exactly once, by `start()`,
    /// when spawning that lane's worker.
    pub fn take_ingest_receiver(&self, lane: Lane) -> Option<mpsc::Receiver<PricePoint>> {
        self.ingest(lane).take_receiver()
    }

    pub fn general_sender(&self) -> mpsc::Sender<GeneralResult> {
        self.general_tx.clone()
    }

    pub fn hybrid_sender(&self) -> mpsc::Sender<HybridResult> {
        self.hybrid_tx.clone()
    }

    pub fn take_general_receiver(&self) -> Option<mpsc::Receiver<GeneralResult>> {
        self.general_rx.lock().take()
    }

    pub fn take_hybrid_receiver(&self) -> Option<mpsc::Receiver<HybridResult>> {
        self.hybrid_rx.lock().take()
    }

    /// Closes ingest channels, then result channels, in that fixed order.
    /// Must only be called after every worker and collector task has exited.
    pub fn close_all(&self) {
        for lane in Lane::ALL {
            self.ingest(lane).close();
        }
        // `general_rx`/`hybrid_rx` are only `Some` here if `start()` was never
        // called for that result channel (no lane ever opened it), in which
        // case dropping the never-taken receiver closes it. When `start()`
        // did take a receiver, it already moved into its collector task, and
        // that task's exit (by the time `close_all` runs) is what actually
        // closed the channel; these drops are then a no-op on an already-`None`
        // slot.
        drop(self.general_rx.lock().take());
        drop(self.hybrid_rx.lock().take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn try_send_reports_full_channel() {
        let execution = Execution::new(1, 1);
        let tick = PricePoint::new(dec!(100), 0);
        assert_eq!(
            execution.try_send_tick(Lane::FixedStopLoss, tick),
            Ok(true)
        );
        assert_eq!(
            execution.try_send_tick(Lane::FixedStopLoss, tick),
            Ok(false)
        );
    }

    #[test]
    fn try_send_after_close_reports_closed_not_panic() {
        let execution = Execution::new(1, 1);
        execution.close_all();
        let tick = PricePoint::new(dec!(100), 0);
        assert_eq!(execution.try_send_tick(Lane::FixedStopLoss, tick), Err(()));
    }

    #[test]
    fn take_ingest_receiver_is_one_shot() {
        let execution = Execution::new(1, 1);
        assert!(execution.take_ingest_receiver(Lane::FixedStopLoss).is_some());
        assert!(execution.take_ingest_receiver(Lane::FixedStopLoss).is_none());
    }

    #[test]
    fn is_hybrid_lane_matches_only_the_two_hybrid_lanes() {
        assert!(!is_hybrid_lane(Lane::FixedStopLoss));
        assert!(!is_hybrid_lane(Lane::DebouncedStopLoss));
        assert!(!is_hybrid_lane(Lane::FixedTakeProfit));
        assert!(!is_hybrid_lane(Lane::DebouncedTakeProfit));
        assert!(is_hybrid_lane(Lane::HybridWithoutTime));
        assert!(is_hybrid_lane(Lane::HybridWithTime));
    }
}
