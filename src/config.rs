//! Engine configuration.
//!
//! Every field is a plain runtime value validated once at construction —
//! there is no compile-time/runtime split here, since this engine has no
//! hot-path constant-folding to protect.

use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::types::EngineResult;

/// Invoked by a result collector once per drained record.
pub type ReportCallback = Arc<dyn Fn(&EngineResult) + Send + Sync>;

/// Runtime configuration for an [`crate::engine::Engine`].
#[derive(Clone)]
pub struct EngineConfig {
    /// Ingest channel capacity, one per lane.
    pub buffer_size: usize,
    /// Result channel capacity. Falls back to `buffer_size` when zero.
    pub buffer_result_size: usize,
    /// Per-send deadline on the result channels.
    pub read_timeout: Duration,
    /// Reserved heartbeat cadence; currently unread by any component.
    pub check_interval: Duration,
    /// Lane-worker heartbeat log cadence.
    pub heartbeat_interval: Duration,
    /// Delay between `SafeGo` restart attempts.
    pub retry_interval: Duration,
    /// Liveness-log cadence for `SafeGo` tasks (no longer a restart deadline).
    pub health_check_interval: Duration,
    /// Optional per-record callback invoked by the result collectors.
    pub report_callback: Option<ReportCallback>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_size: 2048,
            buffer_result_size: 0,
            read_timeout: Duration::from_secs(3),
            check_interval: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(5),
            retry_interval: Duration::from_secs(1),
            health_check_interval: Duration::from_secs(5),
            report_callback: None,
        }
    }
}

impl EngineConfig {
    /// Resolved result-channel capacity (`buffer_result_size`, or
    /// `buffer_size` when the former is left at zero).
    pub fn resolved_buffer_result_size(&self) -> usize {
        if self.buffer_result_size == 0 {
            self.buffer_size
        } else {
            self.buffer_result_size
        }
    }

    /// Validate the configuration. Called by [`crate::engine::Engine::new`].
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            bail!("buffer_size must be positive");
        }
        if self.read_timeout.is_zero() {
            bail!("read_timeout must be positive");
        }
        if self.heartbeat_interval.is_zero() {
            bail!("heartbeat_interval must be positive");
        }
        if self.retry_interval.is_zero() {
            bail!("retry_interval must be positive");
        }
        if self.health_check_interval.is_zero() {
            bail!("health_check_interval must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_buffer_size_rejected() {
        let mut config = EngineConfig::default();
        config.buffer_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_health_check_interval_rejected() {
        let mut config = EngineConfig::default();
        config.health_check_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn resolved_buffer_result_size_falls_back() {
        let config = EngineConfig::default();
        assert_eq!(config.resolved_buffer_result_size(), config.buffer_size);

        let mut config = EngineConfig::default();
        config.buffer_result_size = 99;
        assert_eq!(config.resolved_buffer_result_size(), 99);
    }
}
