/// P2p client configuration.
///
/// Operational parameters for the block downloader: polling interval and
/// read-ahead bound.
use std::time::Duration;

use anyhow::{Context, Result, ensure};

/// Interval between block source polls when no new blocks are available (in milliseconds).
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 100;

/// Maximum number of blocks the downloader buffers ahead of the client.
pub const DEFAULT_L2_QUEUE_SIZE: usize = 1000;

pub const CHECK_INTERVAL_ENV: &str = "P2P_CHECK_INTERVAL";
pub const L2_QUEUE_SIZE_ENV: &str = "P2P_L2_QUEUE_SIZE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct P2pConfig {
    pub check_interval: Duration,
    pub l2_queue_size: usize,
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_millis(DEFAULT_CHECK_INTERVAL_MS),
            l2_queue_size: DEFAULT_L2_QUEUE_SIZE,
        }
    }
}

impl P2pConfig {
    /// Read the configuration from `P2P_CHECK_INTERVAL` and `P2P_L2_QUEUE_SIZE`.
    ///
    /// Unset variables fall back to the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup(CHECK_INTERVAL_ENV) {
            let millis: u64 = value
                .trim()
                .parse()
                .with_context(|| format!("invalid {CHECK_INTERVAL_ENV} value {value:?}"))?;
            config.check_interval = Duration::from_millis(millis);
        }

        if let Some(value) = lookup(L2_QUEUE_SIZE_ENV) {
            config.l2_queue_size = value
                .trim()
                .parse()
                .with_context(|| format!("invalid {L2_QUEUE_SIZE_ENV} value {value:?}"))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.check_interval.is_zero(), "check interval must be positive");
        ensure!(self.l2_queue_size > 0, "l2 queue size must be positive");
        // Semaphore permits are u32
        ensure!(
            self.l2_queue_size <= u32::MAX as usize,
            "l2 queue size {} is too large",
            self.l2_queue_size
        );
        Ok(())
    }
}
