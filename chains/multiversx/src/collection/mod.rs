//! Collection phase - snapshot every owner of a collection
//!
//! Flow:
//! 1. [`paginator::count_items`] asks the API how many items exist
//! 2. [`paginator::fetch_collection_items`] fetches every page through the throttle
//! 3. [`aggregator::aggregate_owners`] groups, filters and sorts by owner
//! 4. [`crate::snapshot::write_snapshot`] persists the result

pub mod aggregator;
pub mod metadata;
pub mod paginator;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use aggregator::{AggregateOptions, aggregate_owners, parse_allowlist};
pub use metadata::metadata_file_name;
pub use paginator::{PAGE_SIZE, count_items, fetch_collection_items};

/// A fetched item reduced to what aggregation needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEntry {
    pub owner: String,
    pub identifier: String,
    pub metadata_file_name: String,
}

/// One item held by an owner, as stored in the snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedToken {
    pub identifier: String,
    pub metadata_file_name: String,
}

/// Snapshot record: an owner and everything it holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRecord {
    pub owner: String,
    pub tokens: Vec<DerivedToken>,
    pub tokens_count: u64,
}

impl OwnerRecord {
    pub fn new(owner: String, tokens: Vec<DerivedToken>) -> Self {
        let tokens_count = tokens.len() as u64;
        Self {
            owner,
            tokens,
            tokens_count,
        }
    }
}

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("No items found in collection '{collection}'")]
    NoItems { collection: String },

    #[error("No owner addresses left to snapshot")]
    NoOwners,

    #[error("Page {index} of '{collection}' could not be fetched: {reason}")]
    PageFailed {
        collection: String,
        index: u64,
        reason: String,
    },

    #[error("Collection lookup failed: {0:#}")]
    Network(anyhow::Error),
}

impl CollectionError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            CollectionError::NoItems { .. }
            | CollectionError::NoOwners
            | CollectionError::Network(_) => crate::EXIT_PRECONDITION,
            CollectionError::PageFailed { .. } => 1,
        }
    }
}
