//! # Utilities Module
//!
//! Internal utility modules for the core-logic crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

pub(crate) mod logger;
pub(crate) mod rate_limiter;
pub(crate) mod retry;

pub use logger::{setup_logger, PROGRESS_TARGET};
pub use rate_limiter::{Throttle, Throttled};
pub use retry::{with_retry, RetryConfig};
