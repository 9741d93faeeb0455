use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Call-start budget for a [`crate::Throttle`]: at most `limit` starts per `interval_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    pub limit: u32,
    pub interval_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self::per_second(5)
    }
}

impl ThrottleConfig {
    pub fn per_second(limit: u32) -> Self {
        Self {
            limit,
            interval_ms: 1000,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limit".to_string(),
                reason: "must be a positive integer".to_string(),
            });
        }
        if self.interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "interval_ms".to_string(),
                reason: "must be a positive number of milliseconds".to_string(),
            });
        }
        Ok(())
    }
}

/// Serializable retry settings, turned into a [`crate::RetryConfig`] at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 15_000,
            jitter: true,
        }
    }
}
