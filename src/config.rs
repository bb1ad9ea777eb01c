//! Configuration documents.
//!
//! Operator-editable state lives in two JSON documents under the data
//! directory: `config.json` (active chain, token pair, strategy, alert and
//! status flags) and `chain_data.json` (per-chain RPC endpoints and token
//! metadata). Both are re-read before every order attempt so control-panel
//! edits take effect on the next signal, never mid-order.
//!
//! A missing or unreadable document falls back to its `.default.json`
//! sibling, then to the compiled-in defaults.

use crate::store::{read_json, write_json_atomic};
use anyhow::Result;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::warn;

/// Network parameters of the chain the bot currently trades on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveChain {
    /// Key into chain data, e.g. `POLYGON_MAINNET`.
    pub name: String,
    pub id: u64,
    pub rpc: String,
    /// Explorer base URL used to build transaction links.
    pub explorer: String,
    pub display_name: String,
    /// Native currency symbol, e.g. `MATIC`.
    pub currency: String,
}

/// The traded pair, by symbol. Resolved against chain data per order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub stablecoin: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    /// Fraction of the stablecoin balance committed per buy.
    pub size: Decimal,
    /// Slippage tolerance passed to the router, in percent.
    pub slippage: Decimal,
    /// Minimum stablecoin balance required to place a buy.
    pub min: Decimal,
    pub max: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    pub telegram: bool,
}

/// The operator-facing configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub active_chain: ActiveChain,
    pub tokens: TokenPair,
    pub strategy: Strategy,
    pub logs: LogSettings,
    /// Bot enabled flag: when false, signals are acknowledged and dropped.
    pub status: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            active_chain: ActiveChain {
                name: "POLYGON_MAINNET".to_string(),
                id: 137,
                rpc: "https://polygon-rpc.com".to_string(),
                explorer: "https://polygonscan.com/".to_string(),
                display_name: "Polygon".to_string(),
                currency: "MATIC".to_string(),
            },
            tokens: TokenPair {
                stablecoin: "USDC".to_string(),
                token: "WETH".to_string(),
            },
            strategy: Strategy {
                size: Decimal::new(25, 2),     // 0.25
                slippage: Decimal::new(5, 1),  // 0.5%
                min: Decimal::from(10),
                max: false,
            },
            logs: LogSettings { telegram: true },
            status: false,
        }
    }
}

/// Token metadata as stored in chain data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEntry {
    #[serde(rename = "CONTRACT")]
    pub contract: String,
    #[serde(rename = "DECIMALS")]
    pub decimals: u8,
    #[serde(rename = "SYMBOL")]
    pub symbol: String,
    #[serde(rename = "NAME")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainEntry {
    #[serde(rename = "RPC")]
    pub rpc: String,
    #[serde(rename = "TOKENS")]
    pub tokens: HashMap<String, TokenEntry>,
}

/// Per-chain RPC endpoints and token metadata, keyed by chain name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainData {
    pub chains: HashMap<String, ChainEntry>,
}

impl ChainData {
    pub fn chain(&self, name: &str) -> Option<&ChainEntry> {
        self.chains.get(name)
    }
}

fn token_entry(contract: &str, decimals: u8, symbol: &str, name: &str) -> TokenEntry {
    TokenEntry {
        contract: contract.to_string(),
        decimals,
        symbol: symbol.to_string(),
        name: name.to_string(),
    }
}

impl Default for ChainData {
    fn default() -> Self {
        let mut chains = HashMap::new();

        let mut polygon = HashMap::new();
        polygon.insert(
            "USDC".to_string(),
            token_entry("0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174", 6, "USDC", "USD Coin"),
        );
        polygon.insert(
            "WETH".to_string(),
            token_entry("0x7ceB23fD6bC0adD59E62ac25578270cFf1b9f619", 18, "WETH", "Wrapped Ether"),
        );
        chains.insert(
            "POLYGON_MAINNET".to_string(),
            ChainEntry {
                rpc: "https://polygon-rpc.com".to_string(),
                tokens: polygon,
            },
        );

        let mut ethereum = HashMap::new();
        ethereum.insert(
            "USDC".to_string(),
            token_entry("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", 6, "USDC", "USD Coin"),
        );
        ethereum.insert(
            "WETH".to_string(),
            token_entry("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", 18, "WETH", "Wrapped Ether"),
        );
        chains.insert(
            "ETH_MAINNET".to_string(),
            ChainEntry {
                rpc: "https://eth.llamarpc.com".to_string(),
                tokens: ethereum,
            },
        );

        Self { chains }
    }
}

const CONFIG_FILE: &str = "config";
const CHAIN_DATA_FILE: &str = "chain_data";

/// Reader/writer for the configuration documents.
pub struct ConfigStore {
    dir: PathBuf,
    lock: RwLock<()>,
}

impl ConfigStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            lock: RwLock::new(()),
        }
    }

    fn load_with_fallback<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let primary = self.dir.join(format!("{}.json", name));

        match read_json(&primary) {
            Ok(value) => Some(value),
            Err(e) => {
                if primary.exists() {
                    warn!("Error reading {}.json: {:#}", name, e);
                }
                read_json(&self.dir.join(format!("{}.default.json", name))).ok()
            }
        }
    }

    /// Current configuration, freshly read from disk.
    pub fn load(&self) -> AppConfig {
        let _guard = self.lock.read().unwrap();
        self.load_with_fallback(CONFIG_FILE).unwrap_or_default()
    }

    /// Replace the configuration document.
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        let _guard = self.lock.write().unwrap();
        write_json_atomic(&self.dir.join(format!("{}.json", CONFIG_FILE)), config)
    }

    /// Current chain data, freshly read from disk.
    pub fn chain_data(&self) -> ChainData {
        let _guard = self.lock.read().unwrap();
        self.load_with_fallback(CHAIN_DATA_FILE).unwrap_or_default()
    }

    /// Bot enabled flag.
    pub fn status(&self) -> bool {
        self.load().status
    }

    /// Set the bot enabled flag, returning the updated config.
    pub fn set_status(&self, status: bool) -> Result<AppConfig> {
        let mut config = self.load();
        config.status = status;
        self.save(&config)?;
        Ok(config)
    }
}
