//! Snapshot and distribution log files
//!
//! Both files are pretty-printed JSON arrays written relative to the working
//! directory and overwritten on every run.

use crate::collection::OwnerRecord;
use crate::distribution::DistributionResult;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Collection phase output, distribution phase input
pub const SNAPSHOT_FILE: &str = "nft-collection-owners.json";
/// Per-owner outcome of a distribution run
pub const DISTRIBUTION_LOG_FILE: &str = "nft-collection-owners-distribution.json";

fn write_pretty_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Writes the owner list, replacing any previous snapshot at `path`
pub fn write_snapshot(path: impl AsRef<Path>, records: &[OwnerRecord]) -> Result<()> {
    let path = path.as_ref();
    write_pretty_json(path, records)?;
    debug!("Snapshot with {} owners written to {}", records.len(), path.display());
    Ok(())
}

/// Reads a snapshot back.
///
/// A missing or unreadable file yields `None`; the caller decides whether
/// that is fatal or worth asking the operator for another path.
pub fn read_snapshot(path: impl AsRef<Path>) -> Option<Vec<OwnerRecord>> {
    let path = path.as_ref();
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Snapshot {} not found: {}", path.display(), e);
            return None;
        }
    };

    let records = match serde_json::from_str::<Vec<OwnerRecord>>(&content) {
        Ok(records) => records,
        Err(e) => {
            warn!("Snapshot {} is not a valid owner list: {}", path.display(), e);
            return None;
        }
    };

    // tokensCount scales distribution amounts, it must match the item list
    if let Some(bad) = records
        .iter()
        .find(|r| r.tokens_count != r.tokens.len() as u64)
    {
        warn!(
            "Snapshot {} lists {} items for {} but tokensCount is {}",
            path.display(),
            bad.tokens.len(),
            bad.owner,
            bad.tokens_count
        );
        return None;
    }

    Some(records)
}

/// Writes the distribution results, replacing any previous log at `path`
pub fn write_distribution_log(path: impl AsRef<Path>, results: &[DistributionResult]) -> Result<()> {
    write_pretty_json(path.as_ref(), results)
}
