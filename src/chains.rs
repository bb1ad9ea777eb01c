//! Chain and token resolution.
//!
//! Maps the configured chain name to its explorer API, API-key environment
//! variable, and CoinGecko coin id, and resolves configured token symbols
//! into concrete contract metadata. Pure lookups, no side effects.

use crate::config::ChainData;
use alloy::primitives::Address;
use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::str::FromStr;

/// Chains the bot can trade on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedChain {
    EthMainnet,
    EthGoerli,
    PolygonMainnet,
    PolygonMumbai,
    Optimism,
    Arbitrum,
}

impl SupportedChain {
    /// Explorer API base for balance and transaction proxy lookups.
    pub fn explorer_api(&self) -> &'static str {
        match self {
            SupportedChain::EthMainnet => "https://api.etherscan.io",
            SupportedChain::EthGoerli => "https://api-goerli.etherscan.io",
            SupportedChain::PolygonMainnet => "https://api.polygonscan.com",
            SupportedChain::PolygonMumbai => "https://api-mumbai.polygonscan.com",
            SupportedChain::Optimism => "https://api-optimistic.etherscan.io",
            SupportedChain::Arbitrum => "https://api.arbiscan.io",
        }
    }

    /// Environment variable holding the explorer API key for this chain.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            SupportedChain::EthMainnet | SupportedChain::EthGoerli => "ETHERSCAN_KEY",
            SupportedChain::PolygonMainnet | SupportedChain::PolygonMumbai => "POLYGONSCAN_KEY",
            SupportedChain::Optimism => "OPTIMISM_KEY",
            SupportedChain::Arbitrum => "ARBISCAN_KEY",
        }
    }

    pub fn api_key(&self) -> String {
        std::env::var(self.api_key_env()).unwrap_or_default()
    }

    /// CoinGecko coin id of the chain's native token.
    pub fn coingecko_id(&self) -> &'static str {
        match self {
            SupportedChain::EthMainnet | SupportedChain::EthGoerli => "ethereum",
            SupportedChain::PolygonMainnet | SupportedChain::PolygonMumbai => "matic-network",
            SupportedChain::Optimism => "optimism",
            SupportedChain::Arbitrum => "arbitrum",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedChain::EthMainnet => "ETH_MAINNET",
            SupportedChain::EthGoerli => "ETH_GOERLI",
            SupportedChain::PolygonMainnet => "POLYGON_MAINNET",
            SupportedChain::PolygonMumbai => "POLYGON_MUMBAI",
            SupportedChain::Optimism => "OPTIMISM",
            SupportedChain::Arbitrum => "ARBITRUM",
        }
    }
}

impl fmt::Display for SupportedChain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SupportedChain {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ETH_MAINNET" => Ok(SupportedChain::EthMainnet),
            "ETH_GOERLI" => Ok(SupportedChain::EthGoerli),
            "POLYGON_MAINNET" => Ok(SupportedChain::PolygonMainnet),
            "POLYGON_MUMBAI" => Ok(SupportedChain::PolygonMumbai),
            "OPTIMISM" => Ok(SupportedChain::Optimism),
            "ARBITRUM" => Ok(SupportedChain::Arbitrum),
            other => Err(anyhow!("Unsupported chain: {}", other)),
        }
    }
}

/// Concrete token metadata for the active chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub address: Address,
    pub decimals: u8,
    pub symbol: String,
    pub name: String,
}

/// Resolve a configured token symbol against chain data.
pub fn resolve_token(data: &ChainData, chain_name: &str, symbol: &str) -> Result<TokenInfo> {
    let chain = data
        .chain(chain_name)
        .ok_or_else(|| anyhow!("Chain {} not present in chain data", chain_name))?;

    let entry = chain
        .tokens
        .get(symbol)
        .ok_or_else(|| anyhow!("Token {} not present in chain data for {}", symbol, chain_name))?;

    let address = Address::from_str(&entry.contract)
        .with_context(|| format!("Invalid contract address for {}", symbol))?;

    Ok(TokenInfo {
        address,
        decimals: entry.decimals,
        symbol: entry.symbol.clone(),
        name: entry.name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_names_round_trip() {
        for chain in [
            SupportedChain::EthMainnet,
            SupportedChain::EthGoerli,
            SupportedChain::PolygonMainnet,
            SupportedChain::PolygonMumbai,
            SupportedChain::Optimism,
            SupportedChain::Arbitrum,
        ] {
            assert_eq!(chain.as_str().parse::<SupportedChain>().unwrap(), chain);
        }
        assert!("BASE_MAINNET".parse::<SupportedChain>().is_err());
    }

    #[test]
    fn explorer_and_coin_ids_line_up() {
        assert_eq!(
            SupportedChain::PolygonMainnet.explorer_api(),
            "https://api.polygonscan.com"
        );
        assert_eq!(SupportedChain::PolygonMainnet.coingecko_id(), "matic-network");
        assert_eq!(SupportedChain::Arbitrum.api_key_env(), "ARBISCAN_KEY");
    }

    #[test]
    fn resolve_token_reads_chain_data() {
        let data = ChainData::default();

        let usdc = resolve_token(&data, "POLYGON_MAINNET", "USDC").unwrap();
        assert_eq!(usdc.decimals, 6);
        assert_eq!(usdc.symbol, "USDC");

        assert!(resolve_token(&data, "POLYGON_MAINNET", "DOGE").is_err());
        assert!(resolve_token(&data, "UNKNOWN_CHAIN", "USDC").is_err());
    }
}
