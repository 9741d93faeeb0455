//! HTTP API client - the query capability behind the collection and distribution phases
//!
//! [`CollectionApi`] is the seam the pipeline depends on; [`ApiClient`] is the
//! `reqwest` implementation talking to a MultiversX API instance. Every
//! request carries the configured timeout, and transport failures are mapped
//! to [`NetworkError`] so callers can tell a timeout from a bad payload.

use crate::config::MultiversxConfig;
use crate::distribution::token::TokenKind;
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::NetworkError;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One collection item as returned by a page fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    /// Missing for items without a single holder (SFT supply spread over accounts)
    #[serde(default)]
    pub owner: Option<String>,
    pub identifier: String,
    /// Base64 encoded attribute string
    #[serde(default)]
    pub attributes: Option<String>,
}

/// Token properties needed to build transfers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    #[serde(default)]
    pub decimals: Option<u32>,
    #[serde(default)]
    pub nonce: Option<u64>,
    /// Collection ticker, present on SFT / MetaESDT lookups
    #[serde(default)]
    pub collection: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AccountInfo {
    nonce: u64,
}

/// Read-only queries the pipeline needs from the network
#[async_trait]
pub trait CollectionApi: Send + Sync {
    /// Number of items in a collection
    async fn collection_count(&self, collection: &str) -> Result<u64>;

    /// Items `[from, from + size)` of a collection, with owners
    async fn collection_page(&self, collection: &str, from: u64, size: u64)
    -> Result<Vec<RemoteItem>>;

    /// Token properties; the endpoint depends on the token kind
    async fn token_info(&self, token_id: &str, kind: TokenKind) -> Result<TokenInfo>;

    /// Next nonce of an account
    async fn account_nonce(&self, address: &str) -> Result<u64>;
}

/// `reqwest` backed API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nft-dropper/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &MultiversxConfig) -> Result<Self> {
        Self::new(&config.api_url(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn transport_error(&self, endpoint: &str, err: reqwest::Error) -> NetworkError {
        if err.is_timeout() {
            NetworkError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
                endpoint: endpoint.to_string(),
            }
        } else if err.is_connect() {
            NetworkError::ConnectionRefused {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            }
        } else {
            NetworkError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            }
        }
    }

    fn check_status(endpoint: &str, status: StatusCode) -> Result<(), NetworkError> {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(NetworkError::RateLimited {
                endpoint: endpoint.to_string(),
            });
        }
        if !status.is_success() {
            return Err(NetworkError::HttpError {
                status_code: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }
        Ok(())
    }

    async fn get_text(&self, path: &str) -> Result<String, NetworkError> {
        let endpoint = self.endpoint(path);
        let response = self
            .http
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| self.transport_error(&endpoint, e))?;
        Self::check_status(&endpoint, response.status())?;
        response
            .text()
            .await
            .map_err(|e| self.transport_error(&endpoint, e))
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, NetworkError> {
        let endpoint = self.endpoint(path);
        let body = self.get_text(path).await?;
        serde_json::from_str(&body).map_err(|e| NetworkError::InvalidResponse {
            endpoint,
            reason: e.to_string(),
        })
    }

    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, NetworkError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let endpoint = self.endpoint(path);
        let response = self
            .http
            .post(&endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::TOO_MANY_REQUESTS {
            // The gateway explains rejected transactions in the body
            let reason = response.text().await.unwrap_or_default();
            return Err(NetworkError::InvalidResponse {
                endpoint,
                reason: format!("HTTP {}: {}", status.as_u16(), reason.trim()),
            });
        }
        Self::check_status(&endpoint, status)?;

        response
            .json::<T>()
            .await
            .map_err(|e| self.transport_error(&endpoint, e))
    }
}

#[async_trait]
impl CollectionApi for ApiClient {
    async fn collection_count(&self, collection: &str) -> Result<u64> {
        let path = format!("/collections/{}/nfts/count", collection);
        let body = self.get_text(&path).await?;
        body.trim()
            .parse::<u64>()
            .map_err(|_| NetworkError::InvalidResponse {
                endpoint: self.endpoint(&path),
                reason: format!("expected an item count, got '{}'", body.trim()),
            })
            .map_err(Into::into)
    }

    async fn collection_page(
        &self,
        collection: &str,
        from: u64,
        size: u64,
    ) -> Result<Vec<RemoteItem>> {
        let path = format!(
            "/collections/{}/nfts?withOwner=true&from={}&size={}",
            collection, from, size
        );
        Ok(self.get_json(&path).await?)
    }

    async fn token_info(&self, token_id: &str, kind: TokenKind) -> Result<TokenInfo> {
        let path = match kind {
            TokenKind::Egld => {
                return Ok(TokenInfo {
                    decimals: Some(crate::distribution::token::EGLD_DECIMALS),
                    ..Default::default()
                });
            }
            TokenKind::Esdt => format!("/tokens/{}", token_id),
            TokenKind::Sft | TokenKind::MetaEsdt => format!("/nfts/{}", token_id),
        };
        Ok(self.get_json(&path).await?)
    }

    async fn account_nonce(&self, address: &str) -> Result<u64> {
        let account: AccountInfo = self.get_json(&format!("/accounts/{}", address)).await?;
        Ok(account.nonce)
    }
}
