//! Figment-based configuration loading.
//!
//! Configuration priority (highest wins):
//! 1. CLI arguments (applied by the commands)
//! 2. Config file (TOML)
//! 3. Environment variables (`PLEDGE_` prefix, `__` between sections)
//! 4. Defaults

use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use fvm_shared::address::{Network, set_current_network};
use pledge_primitives::DEFAULT_DEAL_DURATION;
use serde::{Deserialize, Serialize};

/// Directory under the home directory holding config and keys.
const PLEDGE_DIR: &str = ".pledge";

/// Returns `~/.pledge`, or `.pledge` when no home directory is known.
pub fn default_pledge_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(PLEDGE_DIR))
        .unwrap_or_else(|| PathBuf::from(PLEDGE_DIR))
}

/// Returns the default config file path.
pub fn default_config_file() -> PathBuf {
    default_pledge_dir().join("config.toml")
}

/// Complete client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PledgeConfig {
    pub chain: ChainConfig,
    pub wallet: WalletConfig,
    pub deal: DealDefaults,
}

/// Lotus node to read chain state from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub api_url: String,
    /// Bearer token for the Lotus API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub network: NetworkName,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:1234/rpc/v1".to_string(),
            token: None,
            network: NetworkName::Mainnet,
        }
    }
}

/// Address prefix family: `f` on mainnet, `t` on test networks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkName {
    #[default]
    Mainnet,
    Testnet,
}

impl NetworkName {
    /// Makes addresses parse and print with this network's prefix.
    pub fn apply(self) {
        set_current_network(match self {
            Self::Mainnet => Network::Mainnet,
            Self::Testnet => Network::Testnet,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub keystore_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_address: Option<String>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self { keystore_dir: default_pledge_dir().join("keystore"), default_address: None }
    }
}

/// Deal terms used when the command line leaves them out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DealDefaults {
    /// Deal duration in epochs.
    pub duration: i64,
    pub exchange_timeout_secs: u64,
    /// Bounds both dialing and waiting for the provider's identify info.
    pub connect_timeout_secs: u64,
    /// attoFIL per GiB per epoch.
    pub price: String,
}

impl Default for DealDefaults {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DEAL_DURATION,
            exchange_timeout_secs: 60,
            connect_timeout_secs: 30,
            price: "0".to_string(),
        }
    }
}

impl PledgeConfig {
    /// Load configuration from defaults, environment, and config file.
    /// CLI overrides should be applied separately after loading.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(PledgeConfig::default()))
            .merge(Env::prefixed("PLEDGE_").ignore(&["CONFIG"]).split("__"));

        let path = config_path.map(Path::to_path_buf).unwrap_or_else(default_config_file);
        if path.exists() {
            figment = figment.merge(Toml::file(&path));
        }

        figment.extract().wrap_err("Failed to load configuration")
    }
}
