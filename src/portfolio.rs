//! Registry of strategies, keyed by name, partitioned into six lanes.
//!
//! All six maps, the open-flags, and the count live behind one
//! `parking_lot::Mutex`. Getters return a shallow copy (an `Arc` clone per
//! entry) so a lane worker can iterate its lane without holding the lock and
//! without racing a concurrent registration.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::strategy::{
    DebouncedStopLoss, DebouncedStopLossAdapter, DebouncedTakeProfit, DebouncedTakeProfitAdapter,
    FixedStopLoss, FixedStopLossAdapter, FixedTakeProfit, FixedTakeProfitAdapter,
    GeneralLaneStrategy, HybridLaneStrategy, HybridWithTime, HybridWithTimeAdapter,
    HybridWithoutTime, HybridWithoutTimeAdapter,
};

type GeneralMap = HashMap<String, Arc<dyn GeneralLaneStrategy>>;
type HybridMap = HashMap<String, Arc<dyn HybridLaneStrategy>>;

#[derive(Default)]
struct Inner {
    fixed_stop_loss: GeneralMap,
    debounced_stop_loss: GeneralMap,
    fixed_take_profit: GeneralMap,
    debounced_take_profit: GeneralMap,
    hybrid_without_time: HybridMap,
    hybrid_with_time: HybridMap,
    open_general: bool,
    open_hybrid: bool,
    count: usize,
    started: bool,
}

pub struct Portfolio {
    inner: Mutex<Inner>,
    /// One bit per lane, set the moment that lane receives its first
    /// registration. Lane membership is frozen at `start()` (registration
    /// after start is rejected), so `lane_non_empty` can read this lock-free
    /// on the per-tick `collect()` hot path instead of locking `inner`.
    lane_mask: AtomicU8,
}

impl Default for Portfolio {
    fn default() -> Self {
        Self::new()
    }
}

impl Portfolio {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            lane_mask: AtomicU8::new(0),
        }
    }

    /// Marks the portfolio as started; subsequent registrations are rejected.
    pub(crate) fn mark_started(&self) {
        self.inner.lock().started = true;
    }

    pub fn register_fixed_stop_loss(
        &self,
        name: impl Into<String>,
        strategy: Box<dyn FixedStopLoss>,
    ) -> Result<(), String> {
        let name = name.into();
        let mut inner = self.inner.lock();
        if inner.started {
            return Err(name);
        }
        inner
            .fixed_stop_loss
            .insert(name, Arc::new(FixedStopLossAdapter(strategy)));
        inner.open_general = true;
        inner.count += 1;
        self.lane_mask
            .fetch_or(lane_bit(Lane::FixedStopLoss), Ordering::Release);
        Ok(())
    }

    pub fn register_debounced_stop_loss(
        &self,
        name: impl Into<String>,
        strategy: Box<dyn DebouncedStopLoss>,
    ) -> Result<(), String> {
        let name = name.into();
        let mut inner = self.inner.lock();
        if inner.started {
            return Err(name);
        }
        inner
            .debounced_stop_loss
            .insert(name, Arc::new(DebouncedStopLossAdapter(strategy)));
        inner.open_general = true;
        inner.count += 1;
        self.lane_mask
            .fetch_or(lane_bit(Lane::DebouncedStopLoss), Ordering::Release);
        Ok(())
    }

    pub fn register_fixed_take_profit(
        &self,
        name: impl Into<String>,
        strategy: Box<dyn FixedTakeProfit>,
    ) -> Result<(), String> {
        let name = name.into();
        let mut inner = self.inner.lock();
        if inner.started {
            return Err(name);
        }
        inner
            .fixed_take_profit
            .insert(name, Arc::new(FixedTakeProfitAdapter(strategy)));
        inner.open_general = true;
        inner.count += 1;
        self.lane_mask
            .fetch_or(lane_bit(Lane::FixedTakeProfit), Ordering::Release);
        Ok(())
    }

    pub fn register_debounced_take_profit(
        &self,
        name: impl Into<String>,
        strategy: Box<dyn DebouncedTakeProfit>,
    ) -> Result<(), String> {
        let name = name.into();
        let mut inner = self.inner.lock();
        if inner.started {
            return Err(name);
        }
        inner
            .debounced_take_profit
            .insert(name, Arc::new(DebouncedTakeProfitAdapter(strategy)));
        inner.open_general = true;
        inner.count += 1;
        self.lane_mask
            .fetch_or(lane_bit(Lane::DebouncedTakeProfit), Ordering::Release);
        Ok(())
    }

    pub fn register_hybrid_without_time(
        &self,
        name: impl Into<String>,
        strategy: Box<dyn HybridWithoutTime>,
    ) -> Result<(), String> {
        let name = name.into();
        let mut inner = self.inner.lock();
        if inner.started {
            return Err(name);
        }
        inner
            .hybrid_without_time
            .insert(name, Arc::new(HybridWithoutTimeAdapter(strategy)));
        inner.open_hybrid = true;
        inner.count += 1;
        self.lane_mask
            .fetch_or(lane_bit(Lane::HybridWithoutTime), Ordering::Release);
        Ok(())
    }

    pub fn register_hybrid_with_time(
        &self,
        name: impl Into<String>,
        strategy: Box<dyn HybridWithTime>,
    ) -> Result<(), String> {
        let name = name.into();
        let mut inner = self.inner.lock();
        if inner.started {
            return Err(name);
        }
        inner
            .hybrid_with_time
            .insert(name, Arc::new(HybridWithTimeAdapter(strategy)));
        inner.open_hybrid = true;
        inner.count += 1;
        self.lane_mask
            .fetch_or(lane_bit(Lane::HybridWithTime), Ordering::Release);
        Ok(())
    }

    pub fn get_fixed_stop_loss(&self) -> Vec<(String, Arc<dyn GeneralLaneStrategy>)> {
        snapshot(&self.inner.lock().fixed_stop_loss)
    }

    pub fn get_debounced_stop_loss(&self) -> Vec<(String, Arc<dyn GeneralLaneStrategy>)> {
        snapshot(&self.inner.lock().debounced_stop_loss)
    }

    pub fn get_fixed_take_profit(&self) -> Vec<(String, Arc<dyn GeneralLaneStrategy>)> {
        snapshot(&self.inner.lock().fixed_take_profit)
    }

    pub fn get_debounced_take_profit(&self) -> Vec<(String, Arc<dyn GeneralLaneStrategy>)> {
        snapshot(&self.inner.lock().debounced_take_profit)
    }

    pub fn get_hybrid_without_time(&self) -> Vec<(String, Arc<dyn HybridLaneStrategy>)> {
        snapshot(&self.inner.lock().hybrid_without_time)
    }

    pub fn get_hybrid_with_time(&self) -> Vec<(String, Arc<dyn HybridLaneStrategy>)> {
        snapshot(&self.inner.lock().hybrid_with_time)
    }

    /// Dispatches to the matching `get_*` method for one of the four
    /// non-hybrid lanes. Panics if called with a hybrid lane; callers only
    /// reach this from the general-lane worker spawn path.
    pub fn get_lane_general(&self, lane: Lane) -> Vec<(String, Arc<dyn GeneralLaneStrategy>)> {
        match lane {
            Lane::FixedStopLoss => self.get_fixed_stop_loss(),
            Lane::DebouncedStopLoss => self.get_debounced_stop_loss(),
            Lane::FixedTakeProfit => self.get_fixed_take_profit(),
            Lane::DebouncedTakeProfit => self.get_debounced_take_profit(),
            Lane::HybridWithoutTime | Lane::HybridWithTime => {
                unreachable!("{lane:?} is a hybrid lane")
            }
        }
    }

    /// Dispatches to the matching `get_*` method for one of the two hybrid
    /// lanes. Panics if called with a non-hybrid lane.
    pub fn get_lane_hybrid(&self, lane: Lane) -> Vec<(String, Arc<dyn HybridLaneStrategy>)> {
        match lane {
            Lane::HybridWithoutTime => self.get_hybrid_without_time(),
            Lane::HybridWithTime => self.get_hybrid_with_time(),
            _ => unreachable!("{lane:?} is not a hybrid lane"),
        }
    }

    pub fn count(&self) -> usize {
        self.inner.lock().count
    }

    pub fn open_general(&self) -> bool {
        self.inner.lock().open_general
    }

    pub fn open_hybrid(&self) -> bool {
        self.inner.lock().open_hybrid
    }

    /// Lock-free: reads the bitmask kept in sync by the `register_*` methods
    /// rather than locking `inner`, since this is called once per tick from
    /// `Engine::collect`.
    pub fn lane_non_empty(&self, lane: Lane) -> bool {
        self.lane_mask.load(Ordering::Acquire) & lane_bit(lane) != 0
    }
}

fn snapshot<V: Clone>(map: &HashMap<String, V>) -> Vec<(String, V)> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn lane_bit(lane: Lane) -> u8 {
    match lane {
        Lane::FixedStopLoss => 1 << 0,
        Lane::DebouncedStopLoss => 1 << 1,
        Lane::FixedTakeProfit => 1 << 2,
        Lane::DebouncedTakeProfit => 1 << 3,
        Lane::HybridWithoutTime => 1 << 4,
        Lane::HybridWithTime => 1 << 5,
    }
}

/// The six lanes, used to ask the portfolio which workers `start()` must spawn.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    FixedStopLoss,
    DebouncedStopLoss,
    FixedTakeProfit,
    DebouncedTakeProfit,
    HybridWithoutTime,
    HybridWithTime,
}

impl Lane {
    pub const ALL: [Lane; 6] = [
        Lane::FixedStopLoss,
        Lane::DebouncedStopLoss,
        Lane::FixedTakeProfit,
        Lane::DebouncedTakeProfit,
        Lane::HybridWithoutTime,
        Lane::HybridWithTime,
    ];
}
