//! Balance reads for the trading account.
//!
//! ERC20 balances come straight from the chain via RPC; the native-currency
//! balance goes through the chain's explorer API (keyed per chain), matching
//! the gas gate's data source.

use crate::chains::{SupportedChain, TokenInfo};
use crate::contracts::{to_units, wei_to_native, IERC20};
use alloy::primitives::Address;
use alloy::providers::DynProvider;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Normalized balance reads, mockable for executor tests.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Current holdings of `token`, in token units.
    async fn token_balance(&self, token: &TokenInfo) -> Result<Decimal>;
    /// Current native-currency balance, in native units.
    async fn native_balance(&self) -> Result<Decimal>;
}

/// Balance reads against the live chain.
pub struct LiveBalances {
    provider: DynProvider,
    wallet: Address,
    chain: SupportedChain,
    http: reqwest::Client,
}

impl LiveBalances {
    pub fn new(provider: DynProvider, wallet: Address, chain: SupportedChain) -> Self {
        Self {
            provider,
            wallet,
            chain,
            http: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExplorerBalanceResponse {
    #[serde(default)]
    result: Option<String>,
}

fn native_balance_url(chain: SupportedChain, address: Address) -> String {
    format!(
        "{}/api?module=account&action=balance&address={}&tag=latest&apikey={}",
        chain.explorer_api(),
        address,
        chain.api_key()
    )
}

#[async_trait]
impl BalanceSource for LiveBalances {
    async fn token_balance(&self, token: &TokenInfo) -> Result<Decimal> {
        let erc20 = IERC20::new(token.address, self.provider.clone());
        let raw = erc20
            .balanceOf(self.wallet)
            .call()
            .await
            .with_context(|| format!("Failed to read {} balance", token.symbol))?;

        Ok(to_units(raw, token.decimals))
    }

    async fn native_balance(&self) -> Result<Decimal> {
        let url = native_balance_url(self.chain, self.wallet);

        let response: ExplorerBalanceResponse = self
            .http
            .get(&url)
            .send()
            .await
            .context("Explorer balance request failed")?
            .json()
            .await
            .context("Explorer balance response was not JSON")?;

        let result = response
            .result
            .ok_or_else(|| anyhow!("Explorer balance response missing result"))?;

        let wei: u128 = result
            .parse()
            .map_err(|_| anyhow!("Explorer balance was not numeric: {}", result))?;

        Ok(wei_to_native(wei))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn native_balance_url_targets_the_chain_explorer() {
        let address =
            Address::from_str("0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174").unwrap();

        let url = native_balance_url(SupportedChain::PolygonMainnet, address);
        assert!(url.starts_with("https://api.polygonscan.com/api?module=account&action=balance"));
        assert!(url.contains("0x2791"));

        let url = native_balance_url(SupportedChain::Arbitrum, address);
        assert!(url.starts_with("https://api.arbiscan.io/"));
    }

    #[test]
    fn explorer_response_parses_with_and_without_result() {
        let ok: ExplorerBalanceResponse =
            serde_json::from_str(r#"{"status":"1","message":"OK","result":"1500000000000000000"}"#)
                .unwrap();
        assert_eq!(ok.result.as_deref(), Some("1500000000000000000"));

        let missing: ExplorerBalanceResponse = serde_json::from_str(r#"{"status":"0"}"#).unwrap();
        assert!(missing.result.is_none());
    }
}
