//! Account nonce sequencing for one sender
//!
//! The counter starts at the account nonce reported by the API and hands out
//! one value per transaction. Taking a nonce is a synchronous atomic step, so
//! it always happens before the dispatching task first yields: two in-flight
//! transfers can never share a nonce, whatever order they complete in.
//!
//! Values are never returned to the pool. A transfer that fails after taking
//! its nonce leaves a gap the operator resolves from the distribution log.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct NonceCounter {
    /// The NEXT nonce to hand out
    next: AtomicU64,
}

impl NonceCounter {
    pub fn new(account_nonce: u64) -> Self {
        Self {
            next: AtomicU64::new(account_nonce),
        }
    }

    /// Returns the current nonce and advances the counter
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// The nonce the next call to [`NonceCounter::next`] will return
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}
