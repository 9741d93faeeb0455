//! Sign and send capabilities
//!
//! The distribution engine only sees two seams:
//!
//! - [`TransactionSigner`]: turns an unsigned [`Transaction`] into a
//!   [`SignedTransaction`]. Keys never enter this crate; [`RemoteSigner`]
//!   delegates to a signing service.
//! - [`TransactionSender`]: broadcasts a signed transaction and reports its
//!   status. [`GatewaySender`] talks to the API's `/transactions` endpoints.

use crate::api::ApiClient;
use crate::config::MultiversxConfig;
use crate::distribution::{SignedTransaction, Transaction, TxStatus};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Bech32 address of the signing account
    fn address(&self) -> &str;

    async fn sign(&self, tx: Transaction) -> Result<SignedTransaction>;
}

#[async_trait]
pub trait TransactionSender: Send + Sync {
    /// Broadcasts `tx` and returns its hash
    async fn send(&self, tx: &SignedTransaction) -> Result<String>;

    async fn transaction_status(&self, hash: &str) -> Result<TxStatus>;

    /// Polls until the transaction reaches a final status or the sender's
    /// await timeout expires.
    async fn await_completed(&self, hash: &str) -> Result<TxStatus>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    tx_hash: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: TxStatus,
}

/// Broadcasts through the API gateway
#[derive(Debug, Clone)]
pub struct GatewaySender {
    client: ApiClient,
    await_timeout: Duration,
    poll_interval: Duration,
}

impl GatewaySender {
    pub fn new(client: ApiClient, await_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            client,
            await_timeout,
            poll_interval,
        }
    }

    pub fn from_config(config: &MultiversxConfig) -> Result<Self> {
        Ok(Self::new(
            ApiClient::from_config(config)?,
            config.tx_await_timeout(),
            config.tx_poll_interval(),
        ))
    }
}

#[async_trait]
impl TransactionSender for GatewaySender {
    async fn send(&self, tx: &SignedTransaction) -> Result<String> {
        let response: SendResponse = self.client.post_json("/transactions", tx).await?;
        debug!("Broadcast nonce {} -> {}", tx.transaction.nonce, response.tx_hash);
        Ok(response.tx_hash)
    }

    async fn transaction_status(&self, hash: &str) -> Result<TxStatus> {
        let response: StatusResponse = self
            .client
            .get_json(&format!("/transactions/{}?fields=status", hash))
            .await?;
        Ok(response.status)
    }

    async fn await_completed(&self, hash: &str) -> Result<TxStatus> {
        let poll = async {
            loop {
                // Freshly broadcast transactions are not indexed yet
                if let Ok(status) = self.transaction_status(hash).await {
                    if status.is_final() {
                        return status;
                    }
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        tokio::time::timeout(self.await_timeout, poll)
            .await
            .with_context(|| {
                format!(
                    "Transaction {} not final after {}s",
                    hash,
                    self.await_timeout.as_secs()
                )
            })
    }
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    signature: String,
}

/// Delegates signing to an HTTP signing service.
///
/// The service receives the unsigned transaction JSON on `POST /sign` and
/// answers `{ "signature": "<hex>" }`.
#[derive(Debug, Clone)]
pub struct RemoteSigner {
    client: ApiClient,
    address: String,
}

impl RemoteSigner {
    pub fn new(client: ApiClient, address: &str) -> Self {
        Self {
            client,
            address: address.trim().to_string(),
        }
    }

    pub fn from_config(config: &MultiversxConfig) -> Result<Self> {
        let (Some(url), Some(address)) = (&config.signer.url, &config.signer.address) else {
            bail!("Signer is not configured, set [signer] url and address in the config file");
        };
        if !crate::address::is_valid_address(address) {
            bail!("Signer address '{}' is not a valid erd1 address", address);
        }
        let client = ApiClient::new(url, config.request_timeout())?;
        Ok(Self::new(client, address))
    }
}

#[async_trait]
impl TransactionSigner for RemoteSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign(&self, tx: Transaction) -> Result<SignedTransaction> {
        let response: SignResponse = self
            .client
            .post_json("/sign", &tx)
            .await
            .context("Signing service rejected the transaction")?;
        Ok(SignedTransaction {
            transaction: tx,
            signature: response.signature,
        })
    }
}
