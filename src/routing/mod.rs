//! Route generation and execution seam.
//!
//! The bot consumes exactly two operations from the swap router: quote a
//! route between two tokens and execute it. Everything behind those calls
//! (path finding, pool selection, calldata encoding) belongs to the external
//! aggregator.

pub mod aggregator;

pub use aggregator::AggregatorRouter;

use crate::chains::TokenInfo;
use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// An executable swap plan between two tokens for a given amount.
#[derive(Debug, Clone)]
pub struct Route {
    pub from_token: TokenInfo,
    pub to_token: TokenInfo,
    /// Amount of `from_token` being swapped, in token units.
    pub amount: Decimal,
    /// Router contract receiving the swap call.
    pub to: Address,
    /// Pre-encoded swap calldata from the aggregator.
    pub data: Bytes,
    pub value: U256,
    /// Contract that must be allowed to spend `from_token`, when required.
    pub approval_address: Option<Address>,
    /// Aggregator's estimate of the destination amount, in `to_token` units.
    pub estimated_out: Decimal,
}

/// Outcome of a confirmed route execution.
#[derive(Debug, Clone)]
pub struct Executed {
    pub tx_hash: String,
    pub block_number: u64,
    /// Total gas paid, in native-currency units.
    pub gas_used: Decimal,
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("no route available for the requested swap")]
    NoRoute,
    #[error("route quote failed: {0}")]
    Quote(String),
    #[error("token approval failed: {0}")]
    Approval(String),
    #[error("transaction submission failed: {0}")]
    Submit(String),
    #[error("transaction confirmation failed: {0}")]
    Confirmation(String),
    #[error("transaction {tx_hash} not confirmed within {seconds}s")]
    ConfirmationTimeout { tx_hash: String, seconds: u64 },
    #[error("transaction {0} reverted")]
    Reverted(String),
}

/// The two router operations the order executor consumes.
#[async_trait]
pub trait RouteEngine: Send + Sync {
    async fn generate_route(
        &self,
        from: &TokenInfo,
        to: &TokenInfo,
        amount: Decimal,
    ) -> Result<Route, RouteError>;

    /// Submit the route and wait (bounded) for its receipt. Irreversible:
    /// once submitted there is no cancellation path.
    async fn execute_route(&self, route: &Route) -> Result<Executed, RouteError>;
}
