//! Token kinds, per-run token context and amount conversion

use super::DistributionError;
use crate::api::CollectionApi;
use std::fmt;
use std::str::FromStr;

pub const EGLD_DECIMALS: u32 = 18;

/// What is being distributed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Native coin
    Egld,
    /// Fungible token
    Esdt,
    /// Semi-fungible token
    Sft,
    /// Meta-fungible token
    MetaEsdt,
}

impl TokenKind {
    pub const ALL: [TokenKind; 4] = [TokenKind::Egld, TokenKind::Esdt, TokenKind::Sft, TokenKind::MetaEsdt];

    pub fn needs_token_id(&self) -> bool {
        !matches!(self, TokenKind::Egld)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Egld => "EGLD",
            TokenKind::Esdt => "ESDT",
            TokenKind::Sft => "SFT",
            TokenKind::MetaEsdt => "MetaESDT",
        };
        f.write_str(name)
    }
}

impl FromStr for TokenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "egld" | "native" => Ok(TokenKind::Egld),
            "esdt" | "fungible" => Ok(TokenKind::Esdt),
            "sft" | "semifungible" => Ok(TokenKind::Sft),
            "metaesdt" | "meta" => Ok(TokenKind::MetaEsdt),
            other => Err(format!(
                "unknown token kind '{}', expected one of EGLD, ESDT, SFT, MetaESDT",
                other
            )),
        }
    }
}

/// Operator input for a distribution run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionParams {
    pub kind: TokenKind,
    /// Token identifier; ignored for EGLD. For SFT / MetaESDT this is the
    /// full identifier including the nonce suffix.
    pub token_id: Option<String>,
    /// Human readable amount per owner, e.g. `"0.5"`
    pub amount: String,
    /// Multiply the amount by the owner's `tokensCount`
    pub multiply_by_count: bool,
}

impl DistributionParams {
    pub fn validate(&self) -> Result<(), DistributionError> {
        if self.kind.needs_token_id()
            && self.token_id.as_deref().map(str::trim).unwrap_or_default().is_empty()
        {
            return Err(DistributionError::InvalidParameters(format!(
                "{} distribution needs a token identifier",
                self.kind
            )));
        }
        // Decimals are unknown until the token is resolved
        check_amount(&self.amount).map_err(DistributionError::InvalidParameters)?;
        Ok(())
    }

    pub fn token_label(&self) -> String {
        match (&self.kind, &self.token_id) {
            (TokenKind::Egld, _) | (_, None) => self.kind.to_string(),
            (_, Some(id)) => id.trim().to_string(),
        }
    }
}

/// Token metadata resolved once per run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenTypeContext {
    pub num_decimals: Option<u32>,
    pub nonce: Option<u64>,
    pub collection_ticker: Option<String>,
}

impl TokenTypeContext {
    /// Decimals used for amount conversion; SFTs have none
    pub fn decimals(&self) -> u32 {
        self.num_decimals.unwrap_or(0)
    }
}

/// Looks up what the token kind requires and fails if any of it is missing.
pub async fn resolve_token_context(
    api: &dyn CollectionApi,
    params: &DistributionParams,
) -> Result<TokenTypeContext, DistributionError> {
    if params.kind == TokenKind::Egld {
        return Ok(TokenTypeContext {
            num_decimals: Some(EGLD_DECIMALS),
            ..Default::default()
        });
    }

    let token_id = params.token_id.as_deref().unwrap_or_default().trim();
    let info = api
        .token_info(token_id, params.kind)
        .await
        .map_err(|reason| DistributionError::TokenLookup {
            token_id: token_id.to_string(),
            reason,
        })?;

    let missing = |field: &'static str| DistributionError::MissingTokenData {
        token_id: token_id.to_string(),
        field,
    };

    match params.kind {
        TokenKind::Egld => unreachable!("handled above"),
        TokenKind::Esdt => Ok(TokenTypeContext {
            num_decimals: Some(info.decimals.ok_or_else(|| missing("decimals"))?),
            ..Default::default()
        }),
        TokenKind::Sft => Ok(TokenTypeContext {
            num_decimals: None,
            nonce: Some(info.nonce.ok_or_else(|| missing("nonce"))?),
            collection_ticker: Some(info.collection.ok_or_else(|| missing("collection"))?),
        }),
        TokenKind::MetaEsdt => Ok(TokenTypeContext {
            num_decimals: Some(info.decimals.ok_or_else(|| missing("decimals"))?),
            nonce: Some(info.nonce.ok_or_else(|| missing("nonce"))?),
            collection_ticker: Some(info.collection.ok_or_else(|| missing("collection"))?),
        }),
    }
}

fn split_amount(amount: &str) -> Result<(&str, &str), String> {
    let amount = amount.trim();
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));

    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(format!("'{}' is not a positive decimal amount", amount));
    }

    let fraction = fraction.trim_end_matches('0');
    if whole.bytes().chain(fraction.bytes()).all(|b| b == b'0') {
        return Err(format!("'{}' must be greater than zero", amount));
    }
    Ok((whole, fraction))
}

/// Checks that `amount` is a positive decimal number, without scaling it
pub fn check_amount(amount: &str) -> Result<(), String> {
    split_amount(amount).map(|_| ())
}

/// Converts a decimal amount string into base units.
///
/// `"1.5"` with 18 decimals is `1_500_000_000_000_000_000`. Zero, negative,
/// malformed and over-precise amounts are rejected.
pub fn parse_amount(amount: &str, decimals: u32) -> Result<u128, String> {
    let (whole, fraction) = split_amount(amount)?;
    let amount = amount.trim();

    if fraction.len() as u64 > u64::from(decimals) {
        return Err(format!(
            "'{}' has more than {} decimal places",
            amount, decimals
        ));
    }

    let overflow = || format!("'{}' is too large", amount);
    let scale = 10u128.checked_pow(decimals).ok_or_else(overflow)?;
    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| overflow())?
    };
    let fraction_units = if fraction.is_empty() {
        0
    } else {
        let padding = 10u128.pow(decimals - fraction.len() as u32);
        fraction.parse::<u128>().map_err(|_| overflow())? * padding
    };

    whole_units
        .checked_mul(scale)
        .and_then(|w| w.checked_add(fraction_units))
        .ok_or_else(overflow)
}
