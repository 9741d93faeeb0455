//! Distribution run
//!
//! ```text
//! validate params -> confirm -> resolve token -> validate addresses
//!     -> account nonce -> dispatch (throttled, one transfer per owner) -> write log
//! ```
//!
//! Every step before dispatch can stop the run with nothing sent. Once
//! dispatch starts the run always completes: a transfer that fails is
//! recorded as `failed` and the others carry on.

use super::nonce::NonceCounter;
use super::token::{DistributionParams, parse_amount, resolve_token_context};
use super::transaction::TransferBuilder;
use super::{DistributionError, DistributionResult};
use crate::address::is_valid_address;
use crate::api::CollectionApi;
use crate::collection::OwnerRecord;
use crate::config::GasSettings;
use crate::sender::{TransactionSender, TransactionSigner};
use crate::snapshot::{DISTRIBUTION_LOG_FILE, write_distribution_log};
use anyhow::Result;
use async_trait::async_trait;
use core_logic::{PROGRESS_TARGET, Throttle};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the operator is asked to approve
#[derive(Debug, Clone)]
pub struct DistributionPlan {
    pub params: DistributionParams,
    pub owners: usize,
    /// Sum of `tokensCount` over all owners
    pub total_items: u64,
}

impl DistributionPlan {
    pub fn summary(&self) -> String {
        let per_owner = if self.params.multiply_by_count {
            " per held item"
        } else {
            " per owner"
        };
        format!(
            "Send {} {}{} to {} owners ({} items)",
            self.params.amount,
            self.params.token_label(),
            per_owner,
            self.owners,
            self.total_items
        )
    }
}

/// Final go / no-go before anything is sent
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, plan: &DistributionPlan) -> Result<bool>;
}

/// Fixed answer, for `--yes` and tests
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirmer for AutoConfirm {
    async fn confirm(&self, _plan: &DistributionPlan) -> Result<bool> {
        Ok(self.0)
    }
}

#[derive(Debug, Clone)]
pub struct DistributionReport {
    /// One entry per snapshot owner, in snapshot order
    pub results: Vec<DistributionResult>,
    pub log_path: PathBuf,
}

impl DistributionReport {
    pub fn succeeded(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.tx_status.is_successful())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

pub struct DistributionEngine {
    api: Arc<dyn CollectionApi>,
    signer: Arc<dyn TransactionSigner>,
    sender: Arc<dyn TransactionSender>,
    throttle: Throttle,
    chain_id: String,
    gas: GasSettings,
    log_path: PathBuf,
}

impl DistributionEngine {
    pub fn new(
        api: Arc<dyn CollectionApi>,
        signer: Arc<dyn TransactionSigner>,
        sender: Arc<dyn TransactionSender>,
        throttle: Throttle,
        chain_id: &str,
        gas: GasSettings,
    ) -> Self {
        Self {
            api,
            signer,
            sender,
            throttle,
            chain_id: chain_id.to_string(),
            gas,
            log_path: PathBuf::from(DISTRIBUTION_LOG_FILE),
        }
    }

    pub fn with_log_path(mut self, path: impl AsRef<Path>) -> Self {
        self.log_path = path.as_ref().to_path_buf();
        self
    }

    /// Runs one distribution over `records`.
    ///
    /// Returns an error only when the run stops before the first transfer,
    /// or when the log cannot be written afterwards.
    pub async fn run(
        &self,
        records: &[OwnerRecord],
        params: &DistributionParams,
        confirmer: &dyn Confirmer,
    ) -> Result<DistributionReport, DistributionError> {
        if records.is_empty() {
            return Err(DistributionError::EmptySnapshot);
        }
        params.validate()?;

        let plan = DistributionPlan {
            params: params.clone(),
            owners: records.len(),
            total_items: records.iter().map(|r| r.tokens_count).sum(),
        };
        match confirmer.confirm(&plan).await {
            Ok(true) => {}
            Ok(false) => return Err(DistributionError::Aborted),
            Err(e) => {
                warn!("Confirmation failed: {:#}", e);
                return Err(DistributionError::Aborted);
            }
        }

        let context = self
            .throttle
            .call(|| resolve_token_context(self.api.as_ref(), params))
            .await?;
        debug!("Token context for {}: {:?}", params.token_label(), context);

        let invalid: Vec<&str> = records
            .iter()
            .map(|r| r.owner.as_str())
            .filter(|owner| !is_valid_address(owner))
            .collect();
        if let Some(first) = invalid.first() {
            return Err(DistributionError::InvalidAddresses {
                count: invalid.len(),
                first: first.to_string(),
            });
        }

        let amounts = owner_amounts(records, params, context.decimals())?;

        let sender_address = self.signer.address().to_string();
        let account_nonce = self
            .throttle
            .call(|| self.api.account_nonce(&sender_address))
            .await
            .map_err(DistributionError::Network)?;
        let nonces = NonceCounter::new(account_nonce);
        info!(
            target: PROGRESS_TARGET,
            "Distributing {} to {} owners from {} (nonce {})",
            params.token_label(),
            records.len(),
            sender_address,
            account_nonce
        );

        let builder = TransferBuilder::new(
            params.kind,
            params.token_id.as_deref(),
            context,
            &sender_address,
            &self.chain_id,
            self.gas,
        );

        let transfers = records.iter().zip(amounts).map(|(record, amount)| {
            let receiver = record.owner.as_str();
            // Built and numbered here, before the transfer future first yields
            let prepared = builder.build(receiver, amount).map(|mut tx| {
                tx.nonce = nonces.next();
                tx
            });

            async move {
                let tx = match prepared {
                    Ok(tx) => tx,
                    Err(e) => {
                        warn!(target: PROGRESS_TARGET, "FAILED {}: {}", receiver, e);
                        return DistributionResult::failed(receiver);
                    }
                };
                let nonce = tx.nonce;

                let outcome = self
                    .throttle
                    .call(|| async move {
                        let signed = self.signer.sign(tx).await?;
                        let hash = self.sender.send(&signed).await?;
                        let status = self.sender.await_completed(&hash).await?;
                        anyhow::Ok((hash, status))
                    })
                    .await;

                match outcome {
                    Ok((hash, status)) => {
                        if status.is_successful() {
                            info!(target: PROGRESS_TARGET, "SUCCESS {} nonce {} tx {}", receiver, nonce, hash);
                        } else {
                            warn!(target: PROGRESS_TARGET, "FAILED {} nonce {} tx {} ({:?})", receiver, nonce, hash, status);
                        }
                        DistributionResult {
                            receiver_address: receiver.to_string(),
                            tx_hash: hash,
                            tx_status: status,
                        }
                    }
                    Err(e) => {
                        warn!(target: PROGRESS_TARGET, "FAILED {} nonce {}: {:#}", receiver, nonce, e);
                        DistributionResult::failed(receiver)
                    }
                }
            }
        });
        let results = join_all(transfers.collect::<Vec<_>>()).await;
        debug!("Next unused account nonce: {}", nonces.peek());

        write_distribution_log(&self.log_path, &results).map_err(DistributionError::Log)?;
        let report = DistributionReport {
            results,
            log_path: self.log_path.clone(),
        };
        info!(
            target: PROGRESS_TARGET,
            "Distribution finished: {} succeeded, {} failed, log at {}",
            report.succeeded(),
            report.failed(),
            report.log_path.display()
        );
        Ok(report)
    }
}

/// Per-owner amounts in base units, in snapshot order
fn owner_amounts(
    records: &[OwnerRecord],
    params: &DistributionParams,
    decimals: u32,
) -> Result<Vec<u128>, DistributionError> {
    let base = parse_amount(&params.amount, decimals).map_err(DistributionError::InvalidParameters)?;
    if !params.multiply_by_count {
        return Ok(vec![base; records.len()]);
    }

    records
        .iter()
        .map(|record| {
            base.checked_mul(u128::from(record.tokens_count)).ok_or_else(|| {
                DistributionError::InvalidParameters(format!(
                    "{} x {} overflows for {}",
                    params.amount, record.tokens_count, record.owner
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::DerivedToken;
    use crate::distribution::TokenKind;

    fn record(owner: &str, count: usize) -> OwnerRecord {
        let tokens = (0..count)
            .map(|i| DerivedToken {
                identifier: format!("COLL-abc123-{:02x}", i + 1),
                metadata_file_name: String::new(),
            })
            .collect();
        OwnerRecord::new(owner.to_string(), tokens)
    }

    fn params(amount: &str, multiply_by_count: bool) -> DistributionParams {
        DistributionParams {
            kind: TokenKind::Egld,
            token_id: None,
            amount: amount.to_string(),
            multiply_by_count,
        }
    }

    #[test]
    fn test_amounts_flat_and_multiplied() {
        let records = vec![record("a", 3), record("b", 1)];

        assert_eq!(owner_amounts(&records, &params("0.5", false), 2).unwrap(), vec![50, 50]);
        assert_eq!(owner_amounts(&records, &params("0.5", true), 2).unwrap(), vec![150, 50]);
    }

    #[test]
    fn test_amounts_reject_precision_and_overflow() {
        let records = vec![record("a", 2)];
        assert!(owner_amounts(&records, &params("0.001", false), 2).is_err());

        let huge = format!("{}", u128::MAX / 2 + 1);
        assert!(matches!(
            owner_amounts(&records, &params(&huge, true), 0),
            Err(DistributionError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_plan_summary() {
        let plan = DistributionPlan {
            params: params("1", true),
            owners: 4,
            total_items: 9,
        };
        assert_eq!(plan.summary(), "Send 1 EGLD per held item to 4 owners (9 items)");
    }
}
