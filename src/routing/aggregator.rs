//! Aggregator-backed route engine.
//!
//! Quotes come from an external DEX aggregator HTTP API that returns a
//! pre-encoded transaction payload; execution submits that payload through
//! the signing provider and waits for the receipt under an explicit timeout.

use super::{Executed, Route, RouteEngine, RouteError};
use crate::chains::TokenInfo;
use crate::contracts::{from_units, to_units, wei_to_native, IERC20};
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_BASE_URL: &str = "https://li.quest/v1";

/// Ceiling on the receipt wait. A transaction still pending after this is
/// reported as a timeout failure; the swap itself may still land later.
const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    estimate: QuoteEstimate,
    transaction_request: QuotePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEstimate {
    to_amount: String,
    #[serde(default)]
    approval_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuotePayload {
    to: String,
    data: String,
    #[serde(default)]
    value: Option<String>,
}

/// Route engine backed by an external aggregator.
pub struct AggregatorRouter {
    http: reqwest::Client,
    base_url: String,
    provider: DynProvider,
    wallet: Address,
    chain_id: u64,
    /// Slippage tolerance as a fraction (0.005 = 0.5%).
    slippage: Decimal,
    confirm_timeout: Duration,
}

impl AggregatorRouter {
    /// Build a router for the active chain. `slippage_percent` comes from
    /// the strategy config and is converted to the fraction the API expects.
    pub fn new(
        provider: DynProvider,
        wallet: Address,
        chain_id: u64,
        slippage_percent: Decimal,
    ) -> Self {
        let base_url =
            std::env::var("ROUTER_API").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Self {
            http: reqwest::Client::new(),
            base_url,
            provider,
            wallet,
            chain_id,
            slippage: slippage_percent / Decimal::from(100),
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
        }
    }

    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = timeout;
        self
    }

    /// Make sure the spender may move `needed` of `token`, approving the
    /// maximum once when it may not.
    async fn ensure_allowance(
        &self,
        token: &TokenInfo,
        spender: Address,
        needed: U256,
    ) -> Result<(), RouteError> {
        let erc20 = IERC20::new(token.address, self.provider.clone());

        let allowance = erc20
            .allowance(self.wallet, spender)
            .call()
            .await
            .map_err(|e| RouteError::Approval(e.to_string()))?;

        if allowance >= needed {
            debug!("Sufficient {} allowance for {}", token.symbol, spender);
            return Ok(());
        }

        info!("Approving {} for router {}", token.symbol, spender);
        let pending = erc20
            .approve(spender, U256::MAX)
            .send()
            .await
            .map_err(|e| RouteError::Approval(e.to_string()))?;

        let receipt = match tokio::time::timeout(self.confirm_timeout, pending.get_receipt()).await
        {
            Err(_) => {
                return Err(RouteError::Approval(
                    "approval confirmation timed out".to_string(),
                ))
            }
            Ok(Err(e)) => return Err(RouteError::Approval(e.to_string())),
            Ok(Ok(receipt)) => receipt,
        };

        if !receipt.status() {
            return Err(RouteError::Approval(format!(
                "approval transaction {:#x} reverted",
                receipt.transaction_hash
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl RouteEngine for AggregatorRouter {
    async fn generate_route(
        &self,
        from: &TokenInfo,
        to: &TokenInfo,
        amount: Decimal,
    ) -> Result<Route, RouteError> {
        let from_amount = from_units(amount, from.decimals);
        if from_amount == U256::ZERO {
            return Err(RouteError::NoRoute);
        }

        let response = self
            .http
            .get(format!("{}/quote", self.base_url))
            .query(&[
                ("fromChain", self.chain_id.to_string()),
                ("toChain", self.chain_id.to_string()),
                ("fromToken", from.address.to_string()),
                ("toToken", to.address.to_string()),
                ("fromAmount", from_amount.to_string()),
                ("fromAddress", self.wallet.to_string()),
                ("slippage", self.slippage.to_string()),
            ])
            .send()
            .await
            .map_err(|e| RouteError::Quote(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RouteError::NoRoute);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RouteError::Quote(format!("{}: {}", status, body)));
        }

        let quote: QuoteResponse = response
            .json()
            .await
            .map_err(|e| RouteError::Quote(e.to_string()))?;

        let router = Address::from_str(&quote.transaction_request.to)
            .map_err(|e| RouteError::Quote(format!("bad router address: {}", e)))?;
        let data = Bytes::from_str(&quote.transaction_request.data)
            .map_err(|e| RouteError::Quote(format!("bad calldata: {}", e)))?;
        let value = match quote.transaction_request.value.as_deref() {
            Some(v) => U256::from_str(v)
                .map_err(|e| RouteError::Quote(format!("bad call value: {}", e)))?,
            None => U256::ZERO,
        };
        let approval_address = match quote.estimate.approval_address.as_deref() {
            Some(a) => Some(
                Address::from_str(a)
                    .map_err(|e| RouteError::Quote(format!("bad approval address: {}", e)))?,
            ),
            None => None,
        };
        let estimated_out = U256::from_str(&quote.estimate.to_amount)
            .map(|raw| to_units(raw, to.decimals))
            .unwrap_or(Decimal::ZERO);

        debug!(
            "Route quoted: {} {} -> ~{} {}",
            amount, from.symbol, estimated_out, to.symbol
        );

        Ok(Route {
            from_token: from.clone(),
            to_token: to.clone(),
            amount,
            to: router,
            data,
            value,
            approval_address,
            estimated_out,
        })
    }

    async fn execute_route(&self, route: &Route) -> Result<Executed, RouteError> {
        if let Some(spender) = route.approval_address {
            let needed = from_units(route.amount, route.from_token.decimals);
            self.ensure_allowance(&route.from_token, spender, needed)
                .await?;
        }

        let tx = TransactionRequest::default()
            .with_from(self.wallet)
            .with_to(route.to)
            .with_input(route.data.clone())
            .with_value(route.value);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| RouteError::Submit(e.to_string()))?;

        let tx_hash = format!("{:#x}", pending.tx_hash());
        info!(
            "Swap submitted: {} ({} -> {})",
            tx_hash, route.from_token.symbol, route.to_token.symbol
        );

        let receipt = match tokio::time::timeout(self.confirm_timeout, pending.get_receipt()).await
        {
            Err(_) => {
                return Err(RouteError::ConfirmationTimeout {
                    tx_hash,
                    seconds: self.confirm_timeout.as_secs(),
                })
            }
            Ok(Err(e)) => return Err(RouteError::Confirmation(e.to_string())),
            Ok(Ok(receipt)) => receipt,
        };

        if !receipt.status() {
            return Err(RouteError::Reverted(tx_hash));
        }

        let gas_wei =
            (receipt.gas_used as u128).saturating_mul(receipt.effective_gas_price as u128);

        Ok(Executed {
            tx_hash,
            block_number: receipt.block_number.unwrap_or_default(),
            gas_used: wei_to_native(gas_wei),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_response_parses_aggregator_payload() {
        let raw = r#"{
            "estimate": {
                "toAmount": "135000000000000000",
                "approvalAddress": "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE"
            },
            "transactionRequest": {
                "to": "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE",
                "data": "0xdeadbeef",
                "value": "0x0",
                "gasLimit": "0x7a120"
            }
        }"#;

        let quote: QuoteResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(quote.estimate.to_amount, "135000000000000000");
        assert!(quote.estimate.approval_address.is_some());
        assert_eq!(quote.transaction_request.data, "0xdeadbeef");

        assert_eq!(
            U256::from_str(quote.transaction_request.value.as_deref().unwrap()).unwrap(),
            U256::ZERO
        );
    }

    #[test]
    fn quote_response_tolerates_missing_optionals() {
        let raw = r#"{
            "estimate": { "toAmount": "250000000" },
            "transactionRequest": { "to": "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE", "data": "0x" }
        }"#;

        let quote: QuoteResponse = serde_json::from_str(raw).unwrap();
        assert!(quote.estimate.approval_address.is_none());
        assert!(quote.transaction_request.value.is_none());
    }

    #[test]
    fn timeout_error_names_the_transaction() {
        let err = RouteError::ConfirmationTimeout {
            tx_hash: "0xabc".to_string(),
            seconds: 120,
        };
        assert_eq!(
            err.to_string(),
            "transaction 0xabc not confirmed within 120s"
        );
    }
}
