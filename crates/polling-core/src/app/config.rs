//! ReconcilerConfig - 運用上の定数とタイムアウト
//!
//! JSON ファイルから読み込めるが、すべてのフィールドに既定値がある。

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::FailurePolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    pub failure_policy: FailurePolicy,

    /// Bound on every subscription store call.
    pub store_timeout_ms: u64,

    /// Bound on every bus, redelivery, lifecycle and status call.
    pub bus_timeout_ms: u64,

    /// How long a report waits for another report on the same subscription.
    pub lock_wait_ms: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            store_timeout_ms: 10_000,
            bus_timeout_ms: 10_000,
            lock_wait_ms: 60_000,
        }
    }
}

impl ReconcilerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_policy.reset_every == 0 {
            return Err(ConfigError::Invalid("failure_policy.reset_every must be > 0".into()));
        }
        if self.failure_policy.give_up_at == 0 {
            return Err(ConfigError::Invalid("failure_policy.give_up_at must be > 0".into()));
        }
        if self.store_timeout_ms == 0 || self.bus_timeout_ms == 0 || self.lock_wait_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be > 0".into()));
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn bus_timeout(&self) -> Duration {
        Duration::from_millis(self.bus_timeout_ms)
    }

    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }
}
