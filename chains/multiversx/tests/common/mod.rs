//! In-memory stand-ins for the API, signer and gateway
#![allow(dead_code)]

use anyhow::{Result, bail};
use async_trait::async_trait;
use core_logic::NetworkError;
use multiversx_dropper::api::{CollectionApi, RemoteItem, TokenInfo};
use multiversx_dropper::collection::{DerivedToken, OwnerRecord};
use multiversx_dropper::distribution::{SignedTransaction, TokenKind, Transaction, TxStatus};
use multiversx_dropper::sender::{TransactionSender, TransactionSigner};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const SENDER: &str = "erd1qyu5wthldzr8wx5c9ucg8kjagg0jfs53s8nr3zpz3hypefsdd8ssycr6th";

pub const OWNERS: [&str; 12] = [
    "erd1dc6qh88lkdaf3899gnntk7q293ufq8flkvmnsa59zx3sv9a05qwstqzaf3",
    "erd1f063yte5g42v2w7796ace54hu0gkqzkkx8pctfwhen3rcau9gkdqur9ha5",
    "erd1m0qmfjgqlljg646mtkjuvwqyqyjlvhdslclzgj2twm4fsezhmxrq9fltfr",
    "erd1pp876z9e0zh56lgedf6yd2rttqqfucmtvywmzcs3kedf4t0l98zslx7f80",
    "erd1u5kec5yv2q35wdzd3sr6mywt6crg4lr4la3f9urz5zw28qwgnecslee6w2",
    "erd1uaae4xhfuv9sm0dk75g2ye80nhncz5qa0d4e9t5favzeck4hg0dsxa98vs",
    "erd1vavxax866f76pwvk30qrng00xnynnwdcu53630hcn4rcvzx9anmqyzm48k",
    "erd1eg6cwk8k6flxeazjw2fhjaa8fr7cswgakeuuaknac7l37qz7apusrs6d7d",
    "erd1hm4dw7v5eatnxs0vz76ch0m7kdxjwywfj0qaja439ze33rwps2dqaw5l0u",
    "erd19dxrgt65x047tydpmfm7qy73kuj8243dfptcmj5tsjavvegu8jusgfc9jc",
    "erd1qxaywxwgpdh7jydsjxnuq5fyke8wan5kfcyuqk8037vqtkk2234sm54wdq",
    "erd1ul85dgrclm204lgttca079zgq2u9879wgkdy7rq54hfnzjmucwnqszkt0y",
];

pub const CONTRACT: &str = "erd1qqqqqqqqqqqqqpgquzu6s7vlxfzn53uvjy303wpuae5wzmd33aysqez3e2";

/// Well-formed (not checksummed) address, distinct per `i`
pub fn format_address(i: usize) -> String {
    const CHARSET: &[u8] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
    let mut n = i;
    let suffix: String = (0..4)
        .map(|_| {
            let c = CHARSET[n % 32] as char;
            n /= 32;
            c
        })
        .collect();
    format!("erd1{}{}", "x".repeat(54), suffix)
}

pub fn item(owner: &str, nonce: u64) -> RemoteItem {
    RemoteItem {
        owner: Some(owner.to_string()),
        identifier: format!("COLL-abc123-{:02x}", nonce),
        attributes: None,
    }
}

pub fn record(owner: &str, count: usize) -> OwnerRecord {
    let tokens = (0..count)
        .map(|i| DerivedToken {
            identifier: format!("COLL-abc123-{:02x}", i + 1),
            metadata_file_name: (i + 1).to_string(),
        })
        .collect();
    OwnerRecord::new(owner.to_string(), tokens)
}

#[derive(Default)]
pub struct FakeApi {
    pub items: Vec<RemoteItem>,
    pub token: TokenInfo,
    pub account_nonce: u64,
    /// Page start offset -> failures left before the page answers
    pub flaky_pages: Mutex<HashMap<u64, u32>>,
    /// Later pages answer sooner
    pub reverse_latency: bool,
    /// Count and token lookups answer 404
    pub not_found: bool,
    pub page_calls: AtomicUsize,
    pub token_calls: AtomicUsize,
}

impl FakeApi {
    pub fn with_items(items: Vec<RemoteItem>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    pub fn with_token(token: TokenInfo, account_nonce: u64) -> Self {
        Self {
            token,
            account_nonce,
            ..Default::default()
        }
    }

    pub fn not_found() -> Self {
        Self {
            not_found: true,
            ..Default::default()
        }
    }

    pub fn flaky(self, from: u64, failures: u32) -> Self {
        self.flaky_pages.lock().unwrap().insert(from, failures);
        self
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }
}

fn http_404(endpoint: &str) -> anyhow::Error {
    NetworkError::HttpError {
        status_code: 404,
        endpoint: endpoint.to_string(),
    }
    .into()
}

#[async_trait]
impl CollectionApi for FakeApi {
    async fn collection_count(&self, collection: &str) -> Result<u64> {
        if self.not_found {
            return Err(http_404(&format!("/collections/{}/nfts/count", collection)));
        }
        Ok(self.items.len() as u64)
    }

    async fn collection_page(&self, _collection: &str, from: u64, size: u64) -> Result<Vec<RemoteItem>> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);

        let fail = {
            let mut flaky = self.flaky_pages.lock().unwrap();
            match flaky.get_mut(&from) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            }
        };
        if fail {
            bail!("HTTP 503 for page starting at {}", from);
        }

        if self.reverse_latency {
            let pages = (self.items.len() as u64).div_ceil(size);
            let index = from / size;
            tokio::time::sleep(Duration::from_millis((pages - index) * 50)).await;
        }

        let len = self.items.len();
        let start = (from as usize).min(len);
        let end = ((from + size) as usize).min(len);
        Ok(self.items[start..end].to_vec())
    }

    async fn token_info(&self, token_id: &str, _kind: TokenKind) -> Result<TokenInfo> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        if self.not_found {
            return Err(http_404(&format!("/tokens/{}", token_id)));
        }
        Ok(self.token.clone())
    }

    async fn account_nonce(&self, _address: &str) -> Result<u64> {
        Ok(self.account_nonce)
    }
}

pub struct FakeSigner;

#[async_trait]
impl TransactionSigner for FakeSigner {
    fn address(&self) -> &str {
        SENDER
    }

    async fn sign(&self, tx: Transaction) -> Result<SignedTransaction> {
        Ok(SignedTransaction {
            transaction: tx,
            signature: "00".repeat(64),
        })
    }
}

#[derive(Default)]
pub struct FakeSender {
    pub sent: Mutex<Vec<SignedTransaction>>,
    /// Receivers whose transfer the gateway refuses
    pub reject: HashSet<String>,
    /// Final status reported for accepted transfers, `success` when unset
    pub final_status: Option<TxStatus>,
}

impl FakeSender {
    pub fn rejecting(receivers: &[&str]) -> Self {
        Self {
            reject: receivers.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<SignedTransaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_nonces(&self) -> Vec<u64> {
        self.sent().iter().map(|tx| tx.transaction.nonce).collect()
    }
}

pub fn tx_hash(nonce: u64) -> String {
    format!("{:064x}", nonce)
}

#[async_trait]
impl TransactionSender for FakeSender {
    async fn send(&self, tx: &SignedTransaction) -> Result<String> {
        let nonce = tx.transaction.nonce;
        // Uneven latency so transfers complete out of submission order
        tokio::time::sleep(Duration::from_millis((nonce % 7) * 120)).await;

        if self.reject.contains(&tx.transaction.receiver) {
            bail!("HTTP 400: transaction rejected");
        }
        self.sent.lock().unwrap().push(tx.clone());
        Ok(tx_hash(nonce))
    }

    async fn transaction_status(&self, _hash: &str) -> Result<TxStatus> {
        Ok(self.final_status.unwrap_or(TxStatus::Success))
    }

    async fn await_completed(&self, hash: &str) -> Result<TxStatus> {
        self.transaction_status(hash).await
    }
}
