//! Lane worker loops.
//!
//! There are six lanes but only two distinct evaluation shapes (general vs.
//! hybrid), so there are only two loop functions here; `engine::start()`
//! instantiates each one four and two times respectively, bound to the
//! correct ingest channel, result sender, and portfolio snapshot getter.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::StrategyErrorDisplay;
use crate::metrics::Metrics;
use crate::portfolio::Lane;
use crate::strategy::{GeneralLaneStrategy, HybridLaneStrategy};
use crate::supervisor::Heartbeat;
use crate::types::{GeneralResult, HybridResult, HybridTriggerKind, PricePoint};

/// Runs one of the four non-hybrid lane workers (FSS, DSS, FTP, DTP).
#[allow(clippy::too_many_arguments)]
pub async fn run_general_lane_worker(
    lane: Lane,
    ingest: &mut mpsc::Receiver<PricePoint>,
    result_tx: mpsc::Sender<GeneralResult>,
    snapshot: impl Fn() -> Vec<(String, Arc<dyn GeneralLaneStrategy>)>,
    metrics: Arc<Metrics>,
    cancel: CancellationToken,
    heartbeat: Heartbeat,
    heartbeat_interval: Duration,
    read_timeout: Duration,
) {
    let mut heartbeat_ticker = tokio::time::interval(heartbeat_interval);
    heartbeat_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = heartbeat_ticker.tick() => {
                heartbeat.pulse();
                tracing::debug!(?lane, "lane worker heartbeat");
            }
            tick = ingest.recv() => {
                let Some(tick) = tick else { return };
                for (strategy_name, strategy) in snapshot() {
                    // Threshold-calculation failure suppresses the record entirely.
                    let price_threshold = match strategy.threshold(tick.new_price) {
                        Ok(threshold) => threshold,
                        Err(err) => {
                            tracing::debug!(
                                ?lane,
                                strategy = %strategy_name,
                                error = %StrategyErrorDisplay(&err),
                                "threshold calculation failed, record suppressed"
                            );
                            continue;
                        }
                    };
                    let triggered_outcome = strategy.triggered(tick.new_price, tick.updated_at_ms);
                    let (triggered, error) = match triggered_outcome {
                        Ok(triggered) => (triggered, None),
                        Err(err) => {
                            tracing::warn!(
                                ?lane,
                                strategy = %strategy_name,
                                error = %StrategyErrorDisplay(&err),
                                "trigger check failed"
                            );
                            (false, Some(err))
                        }
                    };

                    let result = GeneralResult {
                        strategy_name,
                        lane_tag: strategy.lane_tag(),
                        trigger_kind: strategy.trigger_kind(),
                        last_price: tick.new_price,
                        price_threshold,
                        last_time: tick.updated_at_ms,
                        time_threshold: strategy.time_threshold(),
                        triggered,
                        error,
                    };

                    if !send_general_result(&result_tx, result, read_timeout, &cancel, lane, &metrics).await {
                        return;
                    }
                }
            }
        }
    }
}

/// Runs one of the two hybrid lane workers (HF, HD).
#[allow(clippy::too_many_arguments)]
pub async fn run_hybrid_lane_worker(
    lane: Lane,
    ingest: &mut mpsc::Receiver<PricePoint>,
    result_tx: mpsc::Sender<HybridResult>,
    snapshot: impl Fn() -> Vec<(String, Arc<dyn HybridLaneStrategy>)>,
    metrics: Arc<Metrics>,
    cancel: CancellationToken,
    heartbeat: Heartbeat,
    heartbeat_interval: Duration,
    read_timeout: Duration,
) {
    let mut heartbeat_ticker = tokio::time::interval(heartbeat_interval);
    heartbeat_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = heartbeat_ticker.tick() => {
                heartbeat.pulse();
                tracing::debug!(?lane, "lane worker heartbeat");
            }
            tick = ingest.recv() => {
                let Some(tick) = tick else { return };
                for (strategy_name, strategy) in snapshot() {
                    let (stop_threshold, profit_threshold) = match strategy.calculate(tick.new_price) {
                        Ok(thresholds) => thresholds,
                        Err(err) => {
                            tracing::debug!(
                                ?lane,
                                strategy = %strategy_name,
                                error = %StrategyErrorDisplay(&err),
                                "threshold calculation failed, record suppressed"
                            );
                            continue;
                        }
                    };

                    let stop_outcome = strategy.should_trigger_stop(tick.new_price);
                    let tp_outcome = strategy.should_trigger_tp(tick.new_price);

                    // Precedence: stop trigger > tp trigger > stop error > tp error.
                    let (triggered, trigger_kind, error) = match (stop_outcome, tp_outcome) {
                        (Ok(true), _) => (true, HybridTriggerKind::StopLoss, None),
                        (_, Ok(true)) => (true, HybridTriggerKind::TakeProfit, None),
                        (Err(stop_err), _) => {
                            tracing::warn!(
                                ?lane,
                                strategy = %strategy_name,
                                error = %StrategyErrorDisplay(&stop_err),
                                "hybrid stop-loss check failed"
                            );
                            (false, HybridTriggerKind::None, Some(stop_err))
                        }
                        (_, Err(tp_err)) => {
                            tracing::warn!(
                                ?lane,
                                strategy = %strategy_name,
                                error = %StrategyErrorDisplay(&tp_err),
                                "hybrid take-profit check failed"
                            );
                            (false, HybridTriggerKind::None, Some(tp_err))
                        }
                        (Ok(false), Ok(false)) => (false, HybridTriggerKind::None, None),
                    };

                    let result = HybridResult {
                        strategy_name,
                        lane_tag: strategy.lane_tag(),
                        last_price: tick.new_price,
                        stop_threshold,
                        profit_threshold,
                        last_time: tick.updated_at_ms,
                        time_threshold: strategy.time_threshold(),
                        triggered,
                        trigger_kind,
                        error,
                    };

                    if !send_hybrid_result(&result_tx, result, read_timeout, &cancel, lane, &metrics).await {
                        return;
                    }
                }
            }
        }
    }
}

/// Returns `false` when the worker should stop (cancellation fired or the
/// result channel has been closed by its collector going away).
async fn send_general_result(
    tx: &mpsc::Sender<GeneralResult>,
    result: GeneralResult,
    read_timeout: Duration,
    cancel: &CancellationToken,
    lane: Lane,
    metrics: &Metrics,
) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        outcome = tokio::time::timeout(read_timeout, tx.send(result)) => {
            match outcome {
                Ok(Ok(())) => true,
                Ok(Err(_closed)) => false,
                Err(_elapsed) => {
                    metrics.record_timeout(lane);
                    true
                }
            }
        }
    }
}

async fn send_hybrid_result(
    tx: &mpsc::Sender<HybridResult>,
    result: HybridResult,
    read_timeout: Duration,
    cancel: &CancellationToken,
    lane: Lane,
    metrics: &Metrics,
) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        outcome = tokio::time::timeout(read_timeout, tx.send(result)) => {
            match outcome {
                Ok(Ok(())) => true,
                Ok(Err(_closed)) => false,
                Err(_elapsed) => {
                    metrics.record_timeout(lane);
                    true
                }
            }
        }
    }
}

impl std::fmt::Debug for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Lane::FixedStopLoss => "fixed_stop_loss",
            Lane::DebouncedStopLoss => "debounced_stop_loss",
            Lane::FixedTakeProfit => "fixed_take_profit",
            Lane::DebouncedTakeProfit => "debounced_take_profit",
            Lane::HybridWithoutTime => "hybrid_without_time",
            Lane::HybridWithTime => "hybrid_with_time",
        };
        f.write_str(name)
    }
}
