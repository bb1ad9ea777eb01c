//! Core data structures shared across the bot.
//!
//! Everything that crosses a module boundary lives here: the inbound signal,
//! the durable position snapshot, trade records, and error-log entries.
//! All monetary amounts are `rust_decimal::Decimal`, normalized to token
//! units (never raw wei).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Direction of an inbound trading signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    Buy,
    Sell,
}

/// An external buy/sell instruction, as posted to the signal intake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    #[serde(rename = "type")]
    pub kind: SignalKind,
    /// Price quoted by the signal source, carried through verbatim for
    /// trade summaries and alerts.
    pub price: String,
}

/// Side of a completed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeKind {
    Buy,
    Sell,
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TradeKind::Buy => write!(f, "Buy"),
            TradeKind::Sell => write!(f, "Sell"),
        }
    }
}

/// Durable snapshot of the single trading position.
///
/// `position_open` is advisory state used for precondition checks: it
/// reflects the balances observed after the most recent trade, not a
/// real-time mirror of the chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    pub position_open: bool,
    pub stablecoin_balance: Decimal,
    pub token_balance: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_trade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_trade_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_trade_price: Option<String>,
    /// Key of the Buy trade that opened the current position. Cleared when
    /// the position closes; profit computation resolves this instead of
    /// assuming the previous history entry is the opening Buy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_trade_key: Option<String>,
}

/// A completed trade, immutable once appended to the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: TradeKind,
    pub price: String,
    pub date: DateTime<Utc>,
    /// Human-readable amount + symbol received.
    #[serde(rename = "in")]
    pub in_amount: String,
    /// Human-readable amount + symbol spent.
    #[serde(rename = "out")]
    pub out_amount: String,
    /// Numeric value of the spent side, in its own token units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_out: Option<Decimal>,
    /// Gas consumed by the swap, in native-currency units.
    #[serde(default)]
    pub gas_used: Decimal,
    /// Buy side only: trade amount plus gas expressed in quote terms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_basis: Option<Decimal>,
    /// Sell side only: realized profit. `None` means "not computable",
    /// never zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit: Option<Decimal>,
    /// Explorer URL of the executed transaction.
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
}

impl Trade {
    /// Collision-resistant key for a new trade record.
    pub fn new_key() -> String {
        Uuid::new_v4().to_string()
    }
}

/// Category tag on an error-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Position state disagrees with the requested action.
    OrderConflict,
    /// Exception during buy execution, carries the raw error message.
    Buy,
    /// Exception during sell execution.
    Sell,
    /// Route generation failed or returned no route.
    Routing,
    /// Confirmation wait expired before a receipt was observed.
    Timeout,
    /// Informational start/stop audit entry, not a failure.
    BotStatus,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::OrderConflict => "ORDER_CONFLICT",
            ErrorKind::Buy => "BUY",
            ErrorKind::Sell => "SELL",
            ErrorKind::Routing => "ROUTING",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::BotStatus => "BOT_STATUS",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An operational event or failure, immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    pub time: DateTime<Utc>,
}

impl ErrorEntry {
    /// Build an entry stamped with a fresh key and the current time.
    pub fn new(kind: ErrorKind, message: impl Into<String>, chain: Option<String>) -> Self {
        Self {
            key: Uuid::new_v4().to_string(),
            kind,
            message: message.into(),
            chain,
            time: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn error_kind_tags_match_dashboard_keys() {
        assert_eq!(ErrorKind::OrderConflict.as_str(), "ORDER_CONFLICT");
        assert_eq!(ErrorKind::BotStatus.as_str(), "BOT_STATUS");
        let json = serde_json::to_string(&ErrorKind::Timeout).unwrap();
        assert_eq!(json, "\"TIMEOUT\"");
        let back: ErrorKind = serde_json::from_str("\"ORDER_CONFLICT\"").unwrap();
        assert_eq!(back, ErrorKind::OrderConflict);
    }

    #[test]
    fn trade_serializes_with_reserved_field_names() {
        let trade = Trade {
            key: Trade::new_key(),
            kind: TradeKind::Buy,
            price: "1850.00".to_string(),
            date: Utc::now(),
            in_amount: "0.135 WETH".to_string(),
            out_amount: "250 USDC".to_string(),
            amount_out: Some(dec!(250)),
            gas_used: dec!(0.002),
            cost_basis: Some(dec!(253.70)),
            profit: None,
            link: "https://polygonscan.com/tx/0xabc".to_string(),
            chain: Some("Polygon".to_string()),
        };

        let json = serde_json::to_value(&trade).unwrap();
        assert_eq!(json["type"], "Buy");
        assert_eq!(json["in"], "0.135 WETH");
        assert_eq!(json["out"], "250 USDC");
        // Undefined profit is omitted entirely, not serialized as null
        assert!(json.get("profit").is_none());

        let back: Trade = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind, TradeKind::Buy);
        assert_eq!(back.cost_basis, Some(dec!(253.70)));
    }

    #[test]
    fn position_deserializes_from_empty_document() {
        let position: Position = serde_json::from_str("{}").unwrap();
        assert!(!position.position_open);
        assert_eq!(position.stablecoin_balance, Decimal::ZERO);
        assert!(position.open_trade_key.is_none());
    }
}
