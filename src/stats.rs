//! Dashboard statistics aggregators.
//!
//! Single-pass summaries over the trade history and the error log. The
//! error-log buckets are reconstructed at read time from tags and message
//! contents; the taxonomy shown on the dashboard is derived, not
//! authoritative.

use crate::types::{ErrorEntry, Trade};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// Message fragments that mark an underlying network failure, regardless of
/// which order phase surfaced it.
const NETWORK_MARKERS: &[&str] = &[
    "could not detect network",
    "error sending request",
    "connection refused",
    "timed out",
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeStats {
    pub most_frequent_chain: Option<String>,
    pub total_profit: Decimal,
    pub average_profit: Decimal,
}

/// Summarize the trade history in one pass.
///
/// Ties on chain frequency go to the chain that reached the maximum first.
/// Profit aggregates cover only trades with a defined, nonzero profit;
/// the average defaults to zero when none qualify.
pub fn trade_stats(trades: &[Trade]) -> TradeStats {
    let mut chain_counts: HashMap<&str, u64> = HashMap::new();
    let mut max_count = 0u64;
    let mut most_frequent_chain: Option<String> = None;
    let mut total_profit = Decimal::ZERO;
    let mut counted = 0u64;

    for trade in trades {
        if let Some(chain) = trade.chain.as_deref() {
            let count = chain_counts.entry(chain).or_insert(0);
            *count += 1;
            if *count > max_count {
                max_count = *count;
                most_frequent_chain = Some(chain.to_string());
            }
        }

        if let Some(profit) = trade.profit {
            if !profit.is_zero() {
                total_profit += profit;
                counted += 1;
            }
        }
    }

    let average_profit = if counted > 0 {
        total_profit / Decimal::from(counted)
    } else {
        Decimal::ZERO
    };

    TradeStats {
        most_frequent_chain,
        total_profit,
        average_profit,
    }
}

/// Per-category counts over the error log, plus the derived `NETWORK`
/// bucket for entries whose message carries a known network-error marker.
pub fn log_stats(entries: &[ErrorEntry]) -> HashMap<String, u64> {
    let mut counts: HashMap<String, u64> = HashMap::new();

    for entry in entries {
        *counts.entry(entry.kind.as_str().to_string()).or_insert(0) += 1;

        let message = entry.message.to_lowercase();
        if NETWORK_MARKERS.iter().any(|marker| message.contains(marker)) {
            *counts.entry("NETWORK".to_string()).or_insert(0) += 1;
        }
    }

    counts
}

/// Cumulative realized P&L: the sum of every defined trade profit. The
/// single source of truth for "Total P&L" wherever it is displayed.
pub fn total_pnl(trades: &[Trade]) -> Decimal {
    trades.iter().filter_map(|trade| trade.profit).sum()
}
