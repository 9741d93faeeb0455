//! Distribution phase - one transfer per snapshot owner
//!
//! See [`engine::DistributionEngine`] for the run state machine. Results are
//! recorded per owner; a failed transfer never stops the batch.

pub mod engine;
pub mod nonce;
pub mod token;
pub mod transaction;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use engine::{AutoConfirm, Confirmer, DistributionEngine, DistributionPlan, DistributionReport};
pub use nonce::NonceCounter;
pub use token::{DistributionParams, TokenKind, TokenTypeContext};
pub use transaction::{SignedTransaction, Transaction, TransferBuilder};

/// Transaction status as reported by the network, plus the local `failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Success,
    Executed,
    Fail,
    Invalid,
    /// Send or confirmation failed locally
    Failed,
    #[serde(other)]
    Unknown,
}

impl TxStatus {
    /// No further status change is expected
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            TxStatus::Success | TxStatus::Executed | TxStatus::Fail | TxStatus::Invalid | TxStatus::Failed
        )
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, TxStatus::Success | TxStatus::Executed)
    }
}

/// Outcome of the transfer to one owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionResult {
    pub receiver_address: String,
    pub tx_hash: String,
    pub tx_status: TxStatus,
}

impl DistributionResult {
    pub fn failed(receiver_address: &str) -> Self {
        Self {
            receiver_address: receiver_address.to_string(),
            tx_hash: String::new(),
            tx_status: TxStatus::Failed,
        }
    }
}

#[derive(Error, Debug)]
pub enum DistributionError {
    #[error("Distribution aborted, no transactions were sent")]
    Aborted,

    #[error("Invalid distribution parameters: {0}")]
    InvalidParameters(String),

    #[error("Snapshot is empty, nothing to distribute")]
    EmptySnapshot,

    #[error("Snapshot not found at {path}")]
    SnapshotNotFound { path: String },

    #[error("Token '{token_id}' is missing required field '{field}'")]
    MissingTokenData { token_id: String, field: &'static str },

    #[error("{count} snapshot address(es) are malformed (first: '{first}'), no transactions were sent")]
    InvalidAddresses { count: usize, first: String },

    #[error("Token '{token_id}' could not be looked up: {reason:#}")]
    TokenLookup {
        token_id: String,
        reason: anyhow::Error,
    },

    #[error("Distribution lookup failed: {0:#}")]
    Network(anyhow::Error),

    #[error("Failed to write distribution log: {0:#}")]
    Log(anyhow::Error),
}

impl DistributionError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            DistributionError::Aborted => crate::EXIT_ABORTED,
            DistributionError::Network(_) | DistributionError::Log(_) => 1,
            _ => crate::EXIT_PRECONDITION,
        }
    }
}
