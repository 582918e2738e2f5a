//! Result collectors: drain a result channel into the [`Reporter`] and the
//! optional user-supplied `report_callback`.
//!
//! There are two, one per result channel, mirroring the two lane families in
//! [`crate::worker`]. Neither collector restarts on its own; they exit
//! cleanly whenever either the channel closes or cancellation fires, and
//! `Supervisor::go` (not `safe_go`) is what spawns them in `engine::start()`.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::ReportCallback;
use crate::reporter::Reporter;
use crate::types::{EngineResult, GeneralResult, HybridResult};

pub async fn run_general_collector(
    mut results: mpsc::Receiver<GeneralResult>,
    reporter: Arc<Reporter>,
    report_callback: Option<ReportCallback>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            record = results.recv() => {
                let Some(record) = record else { return };
                let result = EngineResult::General(record);
                reporter.record(&result);
                if let Some(callback) = &report_callback {
                    callback(&result);
                }
            }
        }
    }
}

pub async fn run_hybrid_collector(
    mut results: mpsc::Receiver<HybridResult>,
    reporter: Arc<Reporter>,
    report_callback: Option<ReportCallback>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            record = results.recv() => {
                let Some(record) = record else { return };
                let result = EngineResult::Hybrid(record);
                reporter.record(&result);
                if let Some(callback) = &report_callback {
                    callback(&result);
                }
            }
        }
    }
}
