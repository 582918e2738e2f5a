//! End-to-end tests driving the public `Engine` facade.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use threshold_engine::prelude::*;
use threshold_engine::error::StrategyError;

struct AlwaysTriggersHybrid;
impl HybridWithoutTime for AlwaysTriggersHybrid {
    fn calculate(&self, price: Decimal) -> Result<(Decimal, Decimal), StrategyError> {
        Ok((price - dec!(5), price + dec!(10)))
    }
    fn should_trigger_stop(&self, _price: Decimal) -> Result<bool, StrategyError> {
        Ok(true)
    }
    fn should_trigger_tp(&self, _price: Decimal) -> Result<bool, StrategyError> {
        Ok(true)
    }
}

#[tokio::test]
async fn s2_hybrid_without_time_reports_stop_loss_precedence() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    engine
        .register_hybrid_without_time("h", Box::new(AlwaysTriggersHybrid))
        .unwrap();
    engine.start().unwrap();

    engine.collect(dec!(200), 0, |_| {});

    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.stop().await;

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.hybrid_results, 1);
    assert_eq!(snapshot.triggers, 1);
    assert_eq!(snapshot.errors, 0);
}

struct NeverDrains;
impl FixedStopLoss for NeverDrains {
    fn calc_stop(&self, price: Decimal) -> Result<Decimal, StrategyError> {
        Ok(price * dec!(0.95))
    }
    fn should_trigger_stop(&self, price: Decimal) -> Result<bool, StrategyError> {
        Ok(price < dec!(95))
    }
}

#[tokio::test]
async fn s3_full_ingest_channel_drops_and_never_blocks_collect() {
    let mut config = EngineConfig::default();
    config.buffer_size = 2;
    let engine = Engine::new(config).unwrap();
    engine
        .register_fixed_stop_loss("s", Box::new(NeverDrains))
        .unwrap();
    // Deliberately do not start(): nothing drains the ingest channel, so
    // collect's non-blocking send fills up and starts dropping, exactly as
    // it would if the worker were saturated.

    let drops = Arc::new(AtomicUsize::new(0));
    for i in 0..5 {
        let drops = drops.clone();
        engine.collect(dec!(100), i, move |_lane| {
            drops.fetch_add(1, Ordering::Relaxed);
        });
    }

    assert!(drops.load(Ordering::Relaxed) >= 3);
    assert!(engine.metrics().total_dropped >= 3);
}

#[tokio::test]
async fn s5_stop_then_collect_does_not_panic() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    engine
        .register_fixed_stop_loss("s", Box::new(NeverDrains))
        .unwrap();
    engine.start().unwrap();
    engine.stop().await;

    // Must not panic; dropped ticks after stop are reported like any other drop.
    engine.collect(dec!(100), 0, |_| {});
    assert!(engine.metrics().total_dropped >= 1);
}

struct AlwaysPanicsHybrid;
impl HybridWithTime for AlwaysPanicsHybrid {
    fn calculate(&self, _price: Decimal) -> Result<(Decimal, Decimal), StrategyError> {
        panic!("calculate is broken");
    }
    fn should_trigger_stop(&self, _price: Decimal) -> Result<bool, StrategyError> {
        Ok(false)
    }
    fn should_trigger_tp(&self, _price: Decimal) -> Result<bool, StrategyError> {
        Ok(false)
    }
}

#[tokio::test]
async fn s6_panicking_strategy_is_restarted_and_produces_no_results() {
    let mut config = EngineConfig::default();
    config.retry_interval = Duration::from_millis(10);
    config.heartbeat_interval = Duration::from_secs(60);
    config.health_check_interval = Duration::from_secs(60);
    let engine = Engine::new(config).unwrap();
    engine
        .register_hybrid_with_time("panics-always", Box::new(AlwaysPanicsHybrid))
        .unwrap();
    engine.start().unwrap();

    for i in 0..3 {
        engine.collect(dec!(100), i, |_| {});
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    engine.stop().await;

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.hybrid_results, 0);
}
