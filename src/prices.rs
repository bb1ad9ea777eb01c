//! Token price lookups.
//!
//! Spot prices come from CoinGecko. The historical native-token price used
//! for gas accounting is resolved through the chain explorer's proxy
//! endpoints (transaction -> block -> timestamp) and CoinGecko's
//! day-granularity history endpoint. Sub-day price granularity is a
//! deliberate approximation.

use crate::chains::SupportedChain;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Price lookups, mockable for P&L tests.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Spot USD price for a CoinGecko coin id.
    async fn spot_price(&self, coin_id: &str) -> Result<Decimal>;

    /// USD price of the chain's native token around the time `tx_hash`
    /// landed on chain.
    async fn price_at_tx_time(&self, chain: SupportedChain, tx_hash: &str) -> Result<Decimal>;
}

#[derive(Debug, Deserialize)]
struct ProxyResponse<T> {
    #[serde(default)]
    result: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxResult {
    block_number: String,
}

#[derive(Debug, Default, Deserialize)]
struct BlockResult {
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    market_data: Option<MarketData>,
}

#[derive(Debug, Deserialize)]
struct MarketData {
    current_price: HashMap<String, Decimal>,
}

fn parse_hex_u64(raw: &str) -> Result<u64> {
    u64::from_str_radix(raw.trim_start_matches("0x"), 16)
        .with_context(|| format!("Invalid hex quantity: {}", raw))
}

/// CoinGecko's history endpoint buckets by dd-mm-yyyy date.
fn history_date(secs: u64) -> Result<String> {
    let datetime = DateTime::from_timestamp(secs as i64, 0)
        .ok_or_else(|| anyhow!("Block timestamp out of range: {}", secs))?;
    Ok(datetime.format("%d-%m-%Y").to_string())
}

/// CoinGecko-backed price feed.
pub struct GeckoPrices {
    http: reqwest::Client,
    base_url: String,
}

impl GeckoPrices {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Default for GeckoPrices {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceFeed for GeckoPrices {
    async fn spot_price(&self, coin_id: &str) -> Result<Decimal> {
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.base_url, coin_id
        );

        let data: HashMap<String, HashMap<String, Decimal>> = self
            .http
            .get(&url)
            .send()
            .await
            .context("CoinGecko price request failed")?
            .json()
            .await
            .context("CoinGecko price response was not JSON")?;

        data.get(coin_id)
            .and_then(|prices| prices.get("usd"))
            .copied()
            .ok_or_else(|| anyhow!("No USD price for {}", coin_id))
    }

    async fn price_at_tx_time(&self, chain: SupportedChain, tx_hash: &str) -> Result<Decimal> {
        let api = chain.explorer_api();
        let key = chain.api_key();

        let tx_url = format!(
            "{}/api?module=proxy&action=eth_getTransactionByHash&txhash={}&apikey={}",
            api, tx_hash, key
        );
        let tx: ProxyResponse<TxResult> = self
            .http
            .get(&tx_url)
            .send()
            .await
            .context("Explorer transaction lookup failed")?
            .json()
            .await
            .context("Explorer transaction response was not JSON")?;
        let block_tag = tx
            .result
            .ok_or_else(|| anyhow!("Transaction {} not found", tx_hash))?
            .block_number;

        let block_url = format!(
            "{}/api?module=proxy&action=eth_getBlockByNumber&tag={}&boolean=false&apikey={}",
            api, block_tag, key
        );
        let block: ProxyResponse<BlockResult> = self
            .http
            .get(&block_url)
            .send()
            .await
            .context("Explorer block lookup failed")?
            .json()
            .await
            .context("Explorer block response was not JSON")?;
        let timestamp = block
            .result
            .ok_or_else(|| anyhow!("Block {} not found", block_tag))?
            .timestamp;

        let date = history_date(parse_hex_u64(&timestamp)?)?;

        let history_url = format!(
            "{}/coins/{}/history?date={}",
            self.base_url,
            chain.coingecko_id(),
            date
        );
        let history: HistoryResponse = self
            .http
            .get(&history_url)
            .send()
            .await
            .context("CoinGecko history request failed")?
            .json()
            .await
            .context("CoinGecko history response was not JSON")?;

        history
            .market_data
            .and_then(|data| data.current_price.get("usd").copied())
            .ok_or_else(|| {
                anyhow!(
                    "No historical USD price for {} on {}",
                    chain.coingecko_id(),
                    date
                )
            })
    }
}
