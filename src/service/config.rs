//! Service configuration

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Default seconds between snapshots and between maintenance polls
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Configuration for [`super::LedgerService`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Snapshot file
    pub data_path: PathBuf,
    /// Time between periodic snapshots
    pub save_interval: Duration,
    /// Time between wealth-tax and loan-deadline checks
    pub poll_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data.json"),
            save_interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            poll_interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
        }
    }
}

impl ServiceConfig {
    /// Create a config, replacing zero intervals with the default
    pub fn new(data_path: impl Into<PathBuf>, save_secs: u64, poll_secs: u64) -> Self {
        Self {
            data_path: data_path.into(),
            save_interval: interval_or_default("save_interval", save_secs),
            poll_interval: interval_or_default("poll_interval", poll_secs),
        }
    }
}

fn interval_or_default(name: &str, secs: u64) -> Duration {
    if secs == 0 {
        warn!(
            setting = name,
            default = DEFAULT_INTERVAL_SECS,
            "Invalid interval (0s), using default"
        );
        Duration::from_secs(DEFAULT_INTERVAL_SECS)
    } else {
        Duration::from_secs(secs)
    }
}
