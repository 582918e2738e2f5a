//! Task lifecycle: a shared cancellation token, two spawn modes, and an
//! explicit (non-restarting) liveness heartbeat.
//!
//! Panic detection is per-task (`JoinHandle`/`JoinError::is_panic`) rather
//! than a process-wide hook, since only a per-task signal lets `SafeGo`
//! restart just the failed task without touching its siblings.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

/// A worker's forward-progress counter. Pulsed once per heartbeat tick (the
/// lane workers' `heartbeat_interval` ticker arm), not once per processed
/// price tick; read only for diagnostic logging, never to decide a restart.
#[derive(Clone, Default)]
pub struct Heartbeat(Arc<AtomicU64>);

impl Heartbeat {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU64::new(0)))
    }

    pub fn pulse(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

fn panic_message(err: &JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    "panicked".to_string()
}

/// Owns the root cancellation token and the set of live task handles.
pub struct Supervisor {
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawn once. On panic, log and exit — no restart.
    pub fn go<F, Fut>(&self, name: &'static str, body: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            if let Err(err) = tokio::spawn(body()).await {
                if err.is_panic() {
                    tracing::error!(task = name, error = %panic_message(&err), "task panicked");
                }
            }
        });
        self.tasks.lock().push(handle);
    }

    /// Spawn and, on panic only, log and restart the task body. Between
    /// restart attempts waits `retry_interval` or exits if cancelled first.
    /// Deliberately does **not** restart on any kind of timeout: a body that
    /// simply keeps running (the normal steady state for a lane worker) is
    /// not a fault.
    pub fn safe_go<F, Fut>(&self, name: &'static str, retry_interval: Duration, body: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                match tokio::spawn(body()).await {
                    Ok(()) => break,
                    Err(err) if err.is_panic() => {
                        tracing::error!(
                            task = name,
                            error = %panic_message(&err),
                            "task panicked, restarting"
                        );
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(retry_interval) => {}
                        }
                    }
                    Err(_aborted) => break,
                }
            }
        });
        self.tasks.lock().push(handle);
    }

    /// Logs when a heartbeat stops advancing. Purely diagnostic: an idle
    /// worker between ticks is not a fault, so this never triggers a restart.
    pub fn watch_heartbeat(&self, name: &'static str, heartbeat: Heartbeat, interval: Duration) {
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            let mut last = heartbeat.count();
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        let current = heartbeat.count();
                        if current == last {
                            tracing::warn!(task = name, "no heartbeat advancement in last interval");
                        }
                        last = current;
                    }
                }
            }
        });
        self.tasks.lock().push(handle);
    }

    /// Cancels the token, then waits for every spawned task to finish.
    /// Does not touch any channel.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handles: Vec<_> = self.tasks.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }
}
