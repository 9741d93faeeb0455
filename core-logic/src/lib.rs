//! # Core Logic - Shared Utilities for Batch API Pipelines
//!
//! Chain-agnostic pieces used by the chain crates: call throttling,
//! bounded retry, logging setup and typed errors.
//!
//! ## Modules
//!
//! - [`config`] - Serializable throttle and retry settings
//! - [`error`] - Typed error handling with thiserror
//! - `utils` - Throttle, retry and logger implementations

pub mod config;
pub mod error;
pub(crate) mod utils;

pub use config::{RetrySettings, ThrottleConfig};
pub use error::{ConfigError, NetworkError};

pub use utils::{setup_logger, with_retry, RetryConfig, Throttle, Throttled, PROGRESS_TARGET};
