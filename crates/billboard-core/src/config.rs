//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/billboard/config.toml)
//! 3. Environment variables (BILLBOARD_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable prefix
const ENV_PREFIX: &str = "BILLBOARD";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Wallet provider JSON-RPC endpoint (accounts and signing)
    #[serde(default = "default_wallet_url")]
    pub wallet_url: String,

    /// Node JSON-RPC endpoint (reads and event subscriptions)
    #[serde(default = "default_node_url")]
    pub node_url: String,

    /// Per-call transport timeout in seconds
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Binding of the deployed message contract
    #[serde(default)]
    pub contract: ContractBinding,
}

/// Where the message contract lives and how to address its surface
///
/// Selectors and the event topic are configured rather than derived, so the
/// binding works against any contract exposing a single mutable string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractBinding {
    /// Contract address (0x-prefixed)
    #[serde(default)]
    pub address: String,

    /// 4-byte selector of the value read function, hex
    #[serde(default)]
    pub read_selector: String,

    /// 4-byte selector of the value update function, hex
    #[serde(default)]
    pub update_selector: String,

    /// 32-byte topic of the update-confirmation event, hex
    #[serde(default)]
    pub update_topic: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wallet_url: default_wallet_url(),
            node_url: default_node_url(),
            call_timeout_secs: default_call_timeout_secs(),
            contract: ContractBinding::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (BILLBOARD_WALLET_URL, BILLBOARD_NODE_URL, ...)
    /// 2. Config file (~/.config/billboard/config.toml or BILLBOARD_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides. If the file
    /// doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_WALLET_URL", ENV_PREFIX)) {
            self.wallet_url = val;
        }

        if let Ok(val) = std::env::var(format!("{}_NODE_URL", ENV_PREFIX)) {
            self.node_url = val;
        }

        if let Ok(val) = std::env::var(format!("{}_CONTRACT_ADDRESS", ENV_PREFIX)) {
            self.contract.address = val;
        }
    }

    /// Path to the config file
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("billboard")
            .join("config.toml")
    }
}


fn default_wallet_url() -> String {
    "ws://127.0.0.1:8546".to_string()
}

fn default_node_url() -> String {
    "ws://127.0.0.1:8545".to_string()
}

fn default_call_timeout_secs() -> u64 {
    30
}
