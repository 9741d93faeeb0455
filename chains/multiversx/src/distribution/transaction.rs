//! Transfer construction per token kind
//!
//! | kind      | receiver | value  | data                                                  |
//! |-----------|----------|--------|-------------------------------------------------------|
//! | EGLD      | owner    | amount | -                                                     |
//! | ESDT      | owner    | 0      | `ESDTTransfer@token@amount`                           |
//! | SFT, Meta | sender   | 0      | `ESDTNFTTransfer@collection@nonce@amount@owner_pubkey` |

use super::token::{TokenKind, TokenTypeContext};
use crate::address::{AddressError, pubkey_hex};
use crate::config::GasSettings;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

pub const TX_VERSION: u32 = 1;
/// Builtin function cost on top of the data cost
pub const ESDT_TRANSFER_GAS: u64 = 200_000;
pub const ESDT_NFT_TRANSFER_GAS: u64 = 1_000_000;

/// Unsigned transaction in the gateway's JSON shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub nonce: u64,
    pub value: String,
    pub receiver: String,
    pub sender: String,
    pub gas_price: u64,
    pub gas_limit: u64,
    /// Base64 encoded data field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(rename = "chainID")]
    pub chain_id: String,
    pub version: u32,
}

impl Transaction {
    /// Decoded data field, for logs and tests
    pub fn data_text(&self) -> Option<String> {
        self.data
            .as_deref()
            .and_then(|d| STANDARD.decode(d).ok())
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub signature: String,
}

/// Gas for calls whose data grows with an embedded list: a base allowance
/// plus a fixed amount per element.
pub fn scaled_gas_limit(base: u64, per_item: u64, items: usize) -> u64 {
    base.saturating_add(per_item.saturating_mul(items as u64))
}

/// Big-endian hex with an even number of digits, as smart contract arguments expect
fn hex_arg(value: u128) -> String {
    let hex = format!("{:x}", value);
    if hex.len() % 2 == 1 {
        format!("0{}", hex)
    } else {
        hex
    }
}

/// Builds one kind of transfer from a fixed sender
#[derive(Debug, Clone)]
pub struct TransferBuilder {
    kind: TokenKind,
    token_id: String,
    context: TokenTypeContext,
    sender: String,
    chain_id: String,
    gas: GasSettings,
}

impl TransferBuilder {
    pub fn new(
        kind: TokenKind,
        token_id: Option<&str>,
        context: TokenTypeContext,
        sender: &str,
        chain_id: &str,
        gas: GasSettings,
    ) -> Self {
        Self {
            kind,
            token_id: token_id.unwrap_or_default().trim().to_string(),
            context,
            sender: sender.to_string(),
            chain_id: chain_id.to_string(),
            gas,
        }
    }

    fn data_gas(&self, data: Option<&str>) -> u64 {
        scaled_gas_limit(
            self.gas.min_gas_limit,
            self.gas.gas_per_data_byte,
            data.map(str::len).unwrap_or(0),
        )
    }

    fn transfer_data(&self, receiver: &str, amount: u128) -> Result<Option<String>, AddressError> {
        let data = match self.kind {
            TokenKind::Egld => return Ok(None),
            TokenKind::Esdt => format!(
                "ESDTTransfer@{}@{}",
                hex::encode(&self.token_id),
                hex_arg(amount)
            ),
            TokenKind::Sft | TokenKind::MetaEsdt => format!(
                "ESDTNFTTransfer@{}@{}@{}@{}",
                hex::encode(self.context.collection_ticker.as_deref().unwrap_or_default()),
                hex_arg(u128::from(self.context.nonce.unwrap_or_default())),
                hex_arg(amount),
                pubkey_hex(receiver)?
            ),
        };
        Ok(Some(data))
    }

    /// Builds the transfer of `amount` base units to `receiver`, with nonce 0.
    /// The caller stamps the nonce right before dispatch.
    pub fn build(&self, receiver: &str, amount: u128) -> Result<Transaction, AddressError> {
        let data = self.transfer_data(receiver, amount)?;
        let gas_limit = self.data_gas(data.as_deref()).saturating_add(match self.kind {
            TokenKind::Egld => 0,
            TokenKind::Esdt => ESDT_TRANSFER_GAS,
            TokenKind::Sft | TokenKind::MetaEsdt => ESDT_NFT_TRANSFER_GAS,
        });

        let (receiver, value) = match self.kind {
            TokenKind::Egld => (receiver.to_string(), amount.to_string()),
            TokenKind::Esdt => (receiver.to_string(), "0".to_string()),
            // NFT-style transfers are calls on the sender's own account
            TokenKind::Sft | TokenKind::MetaEsdt => (self.sender.clone(), "0".to_string()),
        };

        Ok(Transaction {
            nonce: 0,
            value,
            receiver,
            sender: self.sender.clone(),
            gas_price: self.gas.gas_price,
            gas_limit,
            data: data.map(|d| STANDARD.encode(d)),
            chain_id: self.chain_id.clone(),
            version: TX_VERSION,
        })
    }
}
