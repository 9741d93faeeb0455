//! # Core Logic - Rate Limiting Utilities
//!
//! Sliding-window call throttling shared by every phase that talks to a
//! rate-limited API.
//!
//! A [`Throttle`] admits at most `limit` call starts inside any window of
//! `interval`. Callers beyond the budget wait in submission order; nobody is
//! dropped. Only the *start* of a call is paced, the call itself runs outside
//! the limiter, so a slow or failing call never blocks the queue behind it.

use crate::config::ThrottleConfig;
use crate::error::ConfigError;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::trace;

#[derive(Debug)]
struct ThrottleState {
    limit: usize,
    interval: Duration,
    /// Start instants inside the current window, oldest first.
    /// The tokio mutex is fair, so lock order is submission order.
    window: Mutex<VecDeque<Instant>>,
    started: AtomicU64,
}

/// Thread-safe call-start limiter
///
/// Cloning is cheap and every clone shares the same window.
#[derive(Debug, Clone)]
pub struct Throttle {
    state: Arc<ThrottleState>,
}

impl Throttle {
    pub fn new(config: ThrottleConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: Arc::new(ThrottleState {
                limit: config.limit as usize,
                interval: config.interval(),
                window: Mutex::new(VecDeque::with_capacity(config.limit as usize)),
                started: AtomicU64::new(0),
            }),
        })
    }

    /// Shorthand for `limit` calls per second
    pub fn per_second(limit: u32) -> Result<Self, ConfigError> {
        Self::new(ThrottleConfig::per_second(limit))
    }

    /// Wait until a start slot is free and claim it
    pub async fn acquire(&self) {
        let mut window = self.state.window.lock().await;
        loop {
            let now = Instant::now();
            while let Some(oldest) = window.front() {
                if now.duration_since(*oldest) >= self.state.interval {
                    window.pop_front();
                } else {
                    break;
                }
            }

            if window.len() < self.state.limit {
                window.push_back(now);
                let started = self.state.started.fetch_add(1, Ordering::SeqCst) + 1;
                trace!("Throttle slot granted (#{}, {} in window)", started, window.len());
                return;
            }

            // Window is full: the oldest start frees the next slot.
            if let Some(oldest) = window.front().copied() {
                sleep_until(oldest + self.state.interval).await;
            }
        }
    }

    /// Run `operation` once a start slot is available
    pub async fn call<T, F, Fut>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.acquire().await;
        operation().await
    }

    /// Wrap a unary async function so every invocation goes through this throttle
    pub fn wrap<F>(&self, f: F) -> Throttled<F> {
        Throttled {
            throttle: self.clone(),
            f,
        }
    }

    /// Total number of starts granted so far
    pub fn started(&self) -> u64 {
        self.state.started.load(Ordering::SeqCst)
    }

    pub fn limit(&self) -> usize {
        self.state.limit
    }

    pub fn interval(&self) -> Duration {
        self.state.interval
    }
}

/// A function bound to a [`Throttle`], see [`Throttle::wrap`]
#[derive(Debug, Clone)]
pub struct Throttled<F> {
    throttle: Throttle,
    f: F,
}

impl<F> Throttled<F> {
    pub async fn call<I, Fut>(&self, input: I) -> Fut::Output
    where
        F: Fn(I) -> Fut,
        Fut: Future,
    {
        self.throttle.acquire().await;
        (self.f)(input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_limit() {
        assert!(Throttle::new(ThrottleConfig {
            limit: 0,
            interval_ms: 1000
        })
        .is_err());
        assert!(Throttle::new(ThrottleConfig {
            limit: 5,
            interval_ms: 0
        })
        .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_burst_is_immediate() {
        let throttle = Throttle::per_second(3).unwrap();
        let start = Instant::now();
        for _ in 0..3 {
            throttle.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(throttle.started(), 3);
        assert_eq!(throttle.limit(), 3);
        assert_eq!(throttle.interval(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflow_waits_for_window() {
        let throttle = Throttle::per_second(2).unwrap();
        let start = Instant::now();
        for _ in 0..3 {
            throttle.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrapped_function_receives_input() {
        let throttle = Throttle::per_second(5).unwrap();
        let double = throttle.wrap(|x: u32| async move { x * 2 });
        assert_eq!(double.call(21).await, 42);
        assert_eq!(throttle.started(), 1);
    }
}
