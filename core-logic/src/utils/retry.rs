//! Bounded retry with exponential backoff
//!
//! Delay before retry `n` (0-based) is `base_delay * 2^n`, capped at
//! `max_delay`, then scaled by a random factor in `[0.5, 1.5]` when jitter
//! is on so that many callers failing together do not retry in lockstep.

use crate::config::RetrySettings;
use anyhow::{Context, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetrySettings::default().into()
    }
}

impl From<RetrySettings> for RetryConfig {
    fn from(settings: RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            jitter: settings.jitter,
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
            max_delay: Duration::from_millis(base_delay_ms.saturating_mul(30)),
            jitter: true,
        }
    }

    /// No retries at all, the first error is returned as-is
    pub fn none() -> Self {
        Self::new(0, 0).without_jitter()
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        if self.jitter {
            delay.mul_f64(rand::thread_rng().gen_range(0.5..=1.5))
        } else {
            delay
        }
    }
}

/// Runs `operation` until it succeeds or `config.max_retries` retries are spent.
///
/// The final error carries the operation name and attempt count as context,
/// except with [`RetryConfig::none`] where it is returned untouched.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, operation_name: &str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = config.max_retries + 1;
    let mut attempt = 0;
    loop {
        let err = match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("{} succeeded on attempt {}/{}", operation_name, attempt + 1, attempts);
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if attempt == config.max_retries {
            if config.max_retries == 0 {
                return Err(err);
            }
            warn!("{} gave up after {} attempts: {:#}", operation_name, attempts, err);
            return Err(err).context(format!("{} failed after {} attempts", operation_name, attempts));
        }

        let delay = config.delay_for(attempt);
        debug!(
            "{} attempt {}/{} failed, retrying in {:?}: {:#}",
            operation_name,
            attempt + 1,
            attempts,
            delay,
            err
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_cap() {
        let config = RetryConfig::new(5, 100).without_jitter();
        assert_eq!(config.delay_for(0), Duration::from_millis(100));
        assert_eq!(config.delay_for(1), Duration::from_millis(200));
        assert_eq!(config.delay_for(3), Duration::from_millis(800));
        assert_eq!(config.delay_for(10), Duration::from_millis(3000));
        assert_eq!(config.delay_for(u32::MAX), Duration::from_millis(3000));
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let config = RetryConfig::new(3, 1000);
        for _ in 0..50 {
            let delay = config.delay_for(0);
            assert!(delay >= Duration::from_millis(500) && delay <= Duration::from_millis(1500));
        }
    }
}
