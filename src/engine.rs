//! The engine facade: the one type library consumers construct, register
//! strategies against, and drive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::collector::{run_general_collector, run_hybrid_collector};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::execution::{is_hybrid_lane, Execution};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::portfolio::{Lane, Portfolio};
use crate::reporter::{Reporter, ReporterSnapshot};
use crate::strategy::{
    DebouncedStopLoss, DebouncedTakeProfit, FixedStopLoss, FixedTakeProfit, HybridWithTime,
    HybridWithoutTime,
};
use crate::supervisor::{Heartbeat, Supervisor};
use crate::types::PricePoint;

/// Owns the portfolio, execution channels, metrics, reporter, and the
/// supervised worker/collector tasks.
///
/// `portfolio` and `execution` are individually `Arc`-wrapped rather than the
/// whole `Engine`, so spawned tasks can hold their own cheap handles without
/// the facade needing an `Arc<Self>` receiver anywhere.
pub struct Engine {
    config: EngineConfig,
    portfolio: Arc<Portfolio>,
    execution: Arc<Execution>,
    metrics: Arc<Metrics>,
    reporter: Arc<Reporter>,
    supervisor: Supervisor,
    started: AtomicBool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let execution = Execution::new(config.buffer_size, config.resolved_buffer_result_size());
        Ok(Self {
            config,
            portfolio: Arc::new(Portfolio::new()),
            execution: Arc::new(execution),
            metrics: Arc::new(Metrics::new()),
            reporter: Arc::new(Reporter::new()),
            supervisor: Supervisor::new(),
            started: AtomicBool::new(false),
        })
    }

    pub fn register_fixed_stop_loss(
        &self,
        name: impl Into<String>,
        strategy: Box<dyn FixedStopLoss>,
    ) -> Result<(), EngineError> {
        self.portfolio
            .register_fixed_stop_loss(name, strategy)
            .map_err(EngineError::AlreadyStarted)
    }

    pub fn register_debounced_stop_loss(
        &self,
        name: impl Into<String>,
        strategy: Box<dyn DebouncedStopLoss>,
    ) -> Result<(), EngineError> {
        self.portfolio
            .register_debounced_stop_loss(name, strategy)
            .map_err(EngineError::AlreadyStarted)
    }

    pub fn register_fixed_take_profit(
        &self,
        name: impl Into<String>,
        strategy: Box<dyn FixedTakeProfit>,
    ) -> Result<(), EngineError> {
        self.portfolio
            .register_fixed_take_profit(name, strategy)
            .map_err(EngineError::AlreadyStarted)
    }

    pub fn register_debounced_take_profit(
        &self,
        name: impl Into<String>,
        strategy: Box<dyn DebouncedTakeProfit>,
    ) -> Result<(), EngineError> {
        self.portfolio
            .register_debounced_take_profit(name, strategy)
            .map_err(EngineError::AlreadyStarted)
    }

    pub fn register_hybrid_without_time(
        &self,
        name: impl Into<String>,
        strategy: Box<dyn HybridWithoutTime>,
    ) -> Result<(), EngineError> {
        self.portfolio
            .register_hybrid_without_time(name, strategy)
            .map_err(EngineError::AlreadyStarted)
    }

    pub fn register_hybrid_with_time(
        &self,
        name: impl Into<String>,
        strategy: Box<dyn HybridWithTime>,
    ) -> Result<(), EngineError> {
        self.portfolio
            .register_hybrid_with_time(name, strategy)
            .map_err(EngineError::AlreadyStarted)
    }

    /// Spawns exactly the lane workers whose lane is non-empty, plus the
    /// collectors for whichever result channel has at least one feeding lane.
    pub fn start(&self) -> Result<(), EngineError> {
        if self.portfolio.count() == 0 {
            return Err(EngineError::NoStrategiesRegistered);
        }
        self.portfolio.mark_started();
        self.started.store(true, Ordering::Release);

        for lane in Lane::ALL {
            if !self.portfolio.lane_non_empty(lane) {
                continue;
            }
            if is_hybrid_lane(lane) {
                self.spawn_hybrid_worker(lane);
            } else {
                self.spawn_general_worker(lane);
            }
        }

        if self.portfolio.open_general() {
            let reporter = self.reporter.clone();
            let cancel = self.supervisor.cancellation_token();
            let callback = self.config.report_callback.clone();
            if let Some(rx) = self.execution.take_general_receiver() {
                self.supervisor.go("general-collector", move || {
                    let reporter = reporter.clone();
                    let callback = callback.clone();
                    let cancel = cancel.clone();
                    async move { run_general_collector(rx, reporter, callback, cancel).await }
                });
            }
        }
        if self.portfolio.open_hybrid() {
            let reporter = self.reporter.clone();
            let cancel = self.supervisor.cancellation_token();
            let callback = self.config.report_callback.clone();
            if let Some(rx) = self.execution.take_hybrid_receiver() {
                self.supervisor.go("hybrid-collector", move || {
                    let reporter = reporter.clone();
                    let callback = callback.clone();
                    let cancel = cancel.clone();
                    async move { run_hybrid_collector(rx, reporter, callback, cancel).await }
                });
            }
        }

        Ok(())
    }

    fn spawn_general_worker(&self, lane: Lane) {
        let Some(ingest) = self.execution.take_ingest_receiver(lane) else {
            return;
        };
        let ingest = Arc::new(tokio::sync::Mutex::new(ingest));
        let result_tx = self.execution.general_sender();
        let portfolio = self.portfolio.clone();
        let metrics = self.metrics.clone();
        let cancel = self.supervisor.cancellation_token();
        let heartbeat = Heartbeat::new();
        let heartbeat_interval = self.config.heartbeat_interval;
        let read_timeout = self.config.read_timeout;
        let retry_interval = self.config.retry_interval;

        self.supervisor.watch_heartbeat(
            lane_name(lane),
            heartbeat.clone(),
            self.config.health_check_interval,
        );

        self.supervisor
            .safe_go(lane_name(lane), retry_interval, move || {
                let ingest = ingest.clone();
                let result_tx = result_tx.clone();
                let portfolio = portfolio.clone();
                let metrics = metrics.clone();
                let cancel = cancel.clone();
                let heartbeat = heartbeat.clone();
                async move {
                    let mut ingest = ingest.lock().await;
                    let snapshot = move || portfolio.get_lane_general(lane);
                    crate::worker::run_general_lane_worker(
                        lane,
                        &mut ingest,
                        result_tx,
                        snapshot,
                        metrics,
                        cancel,
                        heartbeat,
                        heartbeat_interval,
                        read_timeout,
                    )
                    .await
                }
            });
    }

    fn spawn_hybrid_worker(&self, lane: Lane) {
        let Some(ingest) = self.execution.take_ingest_receiver(lane) else {
            return;
        };
        let ingest = Arc::new(tokio::sync::Mutex::new(ingest));
        let result_tx = self.execution.hybrid_sender();
        let portfolio = self.portfolio.clone();
        let metrics = self.metrics.clone();
        let cancel = self.supervisor.cancellation_token();
        let heartbeat = Heartbeat::new();
        let heartbeat_interval = self.config.heartbeat_interval;
        let read_timeout = self.config.read_timeout;
        let retry_interval = self.config.retry_interval;

        self.supervisor.watch_heartbeat(
            lane_name(lane),
            heartbeat.clone(),
            self.config.health_check_interval,
        );

        self.supervisor
            .safe_go(lane_name(lane), retry_interval, move || {
                let ingest = ingest.clone();
                let result_tx = result_tx.clone();
                let portfolio = portfolio.clone();
                let metrics = metrics.clone();
                let cancel = cancel.clone();
                let heartbeat = heartbeat.clone();
                async move {
                    let mut ingest = ingest.lock().await;
                    let snapshot = move || portfolio.get_lane_hybrid(lane);
                    crate::worker::run_hybrid_lane_worker(
                        lane,
                        &mut ingest,
                        result_tx,
                        snapshot,
                        metrics,
                        cancel,
                        heartbeat,
                        heartbeat_interval,
                        read_timeout,
                    )
                    .await
                }
            });
    }

    /// Fans a tick out to every non-empty lane. Never blocks: each per-lane
    /// send is non-blocking, and a full channel increments the drop metrics
    /// and invokes `on_drop` rather than waiting.
    pub fn collect(&self, tick_price: Decimal, updated_at_ms: i64, mut on_drop: impl FnMut(Lane)) {
        let tick = PricePoint::new(tick_price, updated_at_ms);
        for lane in Lane::ALL {
            if !self.portfolio.lane_non_empty(lane) {
                continue;
            }
            self.metrics.record_received(lane);
            match self.execution.try_send_tick(lane, tick) {
                Ok(true) => {}
                Ok(false) => {
                    self.metrics.record_dropped(lane);
                    on_drop(lane);
                }
                Err(()) => {
                    // Ingest channel already closed (post-stop collect); treat
                    // as a drop rather than panicking, per this crate's S5 policy.
                    self.metrics.record_dropped(lane);
                    on_drop(lane);
                }
            }
        }
    }

    /// Cancels every worker/collector, waits for them to finish, then closes
    /// all channels in the fixed ingest-then-result order.
    pub async fn stop(&self) {
        self.supervisor.stop().await;
        self.execution.close_all();
    }

    pub fn snapshot(&self) -> ReporterSnapshot {
        self.reporter.snapshot()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

fn lane_name(lane: Lane) -> &'static str {
    match lane {
        Lane::FixedStopLoss => "fixed-stop-loss",
        Lane::DebouncedStopLoss => "debounced-stop-loss",
        Lane::FixedTakeProfit => "fixed-take-profit",
        Lane::DebouncedTakeProfit => "debounced-take-profit",
        Lane::HybridWithoutTime => "hybrid-without-time",
        Lane::HybridWithTime => "hybrid-with-time",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StrategyError;
    use rust_decimal_macros::dec;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct FixedStop;
    impl FixedStopLoss for FixedStop {
        fn calc_stop(&self, price: Decimal) -> Result<Decimal, StrategyError> {
            Ok(price * dec!(0.95))
        }
        fn should_trigger_stop(&self, price: Decimal) -> Result<bool, StrategyError> {
            Ok(price < dec!(95))
        }
    }

    #[tokio::test]
    async fn start_without_strategies_fails() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        assert!(matches!(
            engine.start(),
            Err(EngineError::NoStrategiesRegistered)
        ));
    }

    #[tokio::test]
    async fn s1_sequential_ticks_produce_ordered_results() {
        let mut config = EngineConfig::default();
        config.heartbeat_interval = Duration::from_secs(60);
        config.health_check_interval = Duration::from_secs(60);
        let engine = Engine::new(config).unwrap();
        engine
            .register_fixed_stop_loss("s5", Box::new(FixedStop))
            .unwrap();
        engine.start().unwrap();

        engine.collect(dec!(100), 0, |_| {});
        engine.collect(dec!(94), 1, |_| {});

        tokio::time::sleep(Duration::from_millis(50)).await;
        engine.stop().await;

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.general_results, 2);
        assert_eq!(snapshot.triggers, 1);
    }

    #[tokio::test]
    async fn registration_after_start_is_rejected() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        engine
            .register_fixed_stop_loss("s5", Box::new(FixedStop))
            .unwrap();
        engine.start().unwrap();

        let result = engine.register_fixed_stop_loss("late", Box::new(FixedStop));
        assert!(matches!(result, Err(EngineError::AlreadyStarted(name)) if name == "late"));
        engine.stop().await;
    }

    #[tokio::test]
    async fn s5_collect_after_stop_does_not_panic() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        engine
            .register_fixed_stop_loss("s5", Box::new(FixedStop))
            .unwrap();
        engine.start().unwrap();
        engine.stop().await;

        let drops = Arc::new(AtomicUsize::new(0));
        let drops_clone = drops.clone();
        engine.collect(dec!(100), 0, move |_| {
            drops_clone.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(drops.load(Ordering::Relaxed), 1);
    }
}
