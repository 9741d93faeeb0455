//! Configuration loader for the nft-dropper
//!
//! Settings come from `config/config.toml`, then `MULTIVERSX_NETWORK` and
//! `MULTIVERSX_API_URL` from the environment (a `.env` file is honored by the
//! binary). Every field has a default so an empty file is a valid devnet config.

use anyhow::{Context, Result};
use core_logic::{ConfigError, RetrySettings, ThrottleConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const NETWORK_ENV: &str = "MULTIVERSX_NETWORK";
pub const API_URL_ENV: &str = "MULTIVERSX_API_URL";

/// Network environment the tool talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Local,
    #[default]
    Devnet,
    Testnet,
    Mainnet,
}

impl Network {
    pub fn default_api_url(&self) -> &'static str {
        match self {
            Network::Local => "http://localhost:7950",
            Network::Devnet => "https://devnet-api.multiversx.com",
            Network::Testnet => "https://testnet-api.multiversx.com",
            Network::Mainnet => "https://api.multiversx.com",
        }
    }

    pub fn default_chain_id(&self) -> &'static str {
        match self {
            Network::Local => "localnet",
            Network::Devnet => "D",
            Network::Testnet => "T",
            Network::Mainnet => "1",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Local => "local",
            Network::Devnet => "devnet",
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        };
        f.write_str(name)
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "localnet" => Ok(Network::Local),
            "dev" | "devnet" => Ok(Network::Devnet),
            "test" | "testnet" => Ok(Network::Testnet),
            "main" | "mainnet" => Ok(Network::Mainnet),
            other => Err(ConfigError::InvalidValue {
                field: "network".to_string(),
                reason: format!("unknown network '{}'", other),
            }),
        }
    }
}

/// Per-network API base URL overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiOverrides {
    pub local: Option<String>,
    pub devnet: Option<String>,
    pub testnet: Option<String>,
    pub mainnet: Option<String>,
}

impl ApiOverrides {
    fn get(&self, network: Network) -> Option<&str> {
        match network {
            Network::Local => self.local.as_deref(),
            Network::Devnet => self.devnet.as_deref(),
            Network::Testnet => self.testnet.as_deref(),
            Network::Mainnet => self.mainnet.as_deref(),
        }
    }
}

/// Gas settings applied to every transfer
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct GasSettings {
    pub gas_price: u64,
    pub min_gas_limit: u64,
    pub gas_per_data_byte: u64,
}

impl Default for GasSettings {
    fn default() -> Self {
        Self {
            gas_price: 1_000_000_000,
            min_gas_limit: 50_000,
            gas_per_data_byte: 1_500,
        }
    }
}

/// Remote signing service used as the opaque "sign" capability
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerSettings {
    pub url: Option<String>,
    pub address: Option<String>,
}

/// Configuration for the collection and distribution phases
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiversxConfig {
    pub network: Network,
    /// Overrides the chain id derived from `network`
    pub chain_id: Option<String>,
    pub api: ApiOverrides,
    /// Collection phase API calls per second
    pub collection_calls_per_second: u32,
    /// Distribution phase transfers per second
    pub distribution_calls_per_second: u32,
    /// Bound on every single HTTP request
    pub request_timeout_secs: u64,
    /// Bound on waiting for one transaction to reach a final status
    pub tx_await_timeout_secs: u64,
    pub tx_poll_interval_ms: u64,
    /// Retry policy for collection page fetches
    pub page_retry: RetrySettings,
    pub gas: GasSettings,
    pub signer: SignerSettings,
}

impl Default for MultiversxConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            chain_id: None,
            api: ApiOverrides::default(),
            collection_calls_per_second: 5,
            distribution_calls_per_second: 5,
            request_timeout_secs: 10,
            tx_await_timeout_secs: 120,
            tx_poll_interval_ms: 2_000,
            page_retry: RetrySettings::default(),
            gas: GasSettings::default(),
            signer: SignerSettings::default(),
        }
    }
}

impl MultiversxConfig {
    /// Load configuration from a TOML file
    ///
    /// # Example
    /// ```ignore
    /// let config = MultiversxConfig::from_path("config/config.toml")?;
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when it exists, falls back to defaults otherwise, then
    /// applies environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_path(path)?
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_overrides(
            std::env::var(NETWORK_ENV).ok().as_deref(),
            std::env::var(API_URL_ENV).ok().as_deref(),
        )?;
        Ok(config)
    }

    /// Applies `MULTIVERSX_NETWORK` / `MULTIVERSX_API_URL` style overrides
    pub fn apply_overrides(&mut self, network: Option<&str>, api_url: Option<&str>) -> Result<()> {
        if let Some(network) = network.filter(|n| !n.trim().is_empty()) {
            self.network = network.parse()?;
        }
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            let url = url.trim().to_string();
            match self.network {
                Network::Local => self.api.local = Some(url),
                Network::Devnet => self.api.devnet = Some(url),
                Network::Testnet => self.api.testnet = Some(url),
                Network::Mainnet => self.api.mainnet = Some(url),
            }
        }
        self.validate()?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.collection_throttle().validate()?;
        self.distribution_throttle().validate()?;
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if let Some(url) = self.api.get(self.network) {
            Url::parse(url).map_err(|_| ConfigError::InvalidApiUrl {
                url: url.to_string(),
            })?;
        }
        Ok(())
    }

    /// Base URL of the API for the selected network, without trailing slash
    pub fn api_url(&self) -> String {
        self.api
            .get(self.network)
            .unwrap_or(self.network.default_api_url())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn chain_id(&self) -> String {
        self.chain_id
            .clone()
            .unwrap_or_else(|| self.network.default_chain_id().to_string())
    }

    pub fn collection_throttle(&self) -> ThrottleConfig {
        ThrottleConfig::per_second(self.collection_calls_per_second)
    }

    pub fn distribution_throttle(&self) -> ThrottleConfig {
        ThrottleConfig::per_second(self.distribution_calls_per_second)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn tx_await_timeout(&self) -> Duration {
        Duration::from_secs(self.tx_await_timeout_secs)
    }

    pub fn tx_poll_interval(&self) -> Duration {
        Duration::from_millis(self.tx_poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_devnet_defaults() {
        let config = MultiversxConfig::from_toml("").unwrap();
        assert_eq!(config.network, Network::Devnet);
        assert_eq!(config.api_url(), "https://devnet-api.multiversx.com");
        assert_eq!(config.chain_id(), "D");
        assert_eq!(config.collection_calls_per_second, 5);
        assert_eq!(config.distribution_calls_per_second, 5);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_api_override_for_selected_network() {
        let config = MultiversxConfig::from_toml(
            r#"
            network = "mainnet"
            distribution_calls_per_second = 2

            [api]
            mainnet = "https://my-proxy.example.com/"
            devnet = "https://ignored.example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_url(), "https://my-proxy.example.com");
        assert_eq!(config.chain_id(), "1");
        assert_eq!(config.distribution_throttle().limit, 2);
        assert_eq!(config.collection_throttle().limit, 5);
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let err = MultiversxConfig::from_toml("collection_calls_per_second = 0").unwrap_err();
        assert!(format!("{:#}", err).contains("limit"));
    }

    #[test]
    fn test_invalid_override_url_rejected() {
        let result = MultiversxConfig::from_toml(
            r#"
            network = "testnet"
            [api]
            testnet = "not a url"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_env_style_overrides() {
        let mut config = MultiversxConfig::default();
        config
            .apply_overrides(Some("main"), Some("http://127.0.0.1:3001"))
            .unwrap();

        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.api_url(), "http://127.0.0.1:3001");
    }

    #[test]
    fn test_sample_config_parses() {
        let config =
            MultiversxConfig::from_path(concat!(env!("CARGO_MANIFEST_DIR"), "/config/config.toml")).unwrap();
        assert_eq!(config.network, Network::Devnet);
        assert_eq!(config.page_retry.max_retries, 3);
        assert_eq!(config.gas.min_gas_limit, 50_000);
        assert!(config.signer.url.is_none());
    }

    #[test]
    fn test_network_parsing() {
        assert_eq!("local".parse::<Network>().unwrap(), Network::Local);
        assert_eq!("Testnet".parse::<Network>().unwrap(), Network::Testnet);
        assert!("moonnet".parse::<Network>().is_err());
    }
}
