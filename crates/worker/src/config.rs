//! Worker configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! Everything in [`backroom_storage::config`], plus:
//!
//! ## Optional
//! - `BACKROOM_WORKER_POLL_MS` - delay between empty queue polls in
//!   milliseconds (default: 1000)

use std::time::Duration;

use backroom_storage::config::{ConfigError, StorageConfig};

use crate::consumer::DEFAULT_POLL_INTERVAL;

/// Worker host configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Storage backend configuration shared with the façade.
    pub storage: StorageConfig,
    /// Delay between queue polls that found no messages.
    pub poll_interval: Duration,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or any
    /// variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let storage = StorageConfig::from_env()?;

        let poll_interval = match std::env::var("BACKROOM_WORKER_POLL_MS") {
            Err(_) => DEFAULT_POLL_INTERVAL,
            Ok(raw) if raw.is_empty() => DEFAULT_POLL_INTERVAL,
            Ok(raw) => {
                let millis: u64 = raw.parse().map_err(|_| {
                    ConfigError::InvalidEnvVar(
                        "BACKROOM_WORKER_POLL_MS".to_owned(),
                        format!("expected an integer number of milliseconds, got {raw:?}"),
                    )
                })?;
                Duration::from_millis(millis)
            }
        };

        Ok(Self {
            storage,
            poll_interval,
        })
    }
}
