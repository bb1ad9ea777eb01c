//! Cost-basis and realized-profit computation.
//!
//! Gas is converted into quote-currency terms using the native token's USD
//! price at the time the transaction landed, then folded into the cost basis
//! (buys) or subtracted from proceeds (sells).

use crate::chains::SupportedChain;
use crate::prices::PriceFeed;
use crate::types::{Trade, TradeKind};
use anyhow::Result;
use rust_decimal::Decimal;

/// Total quote-currency cost of opening a position: the stablecoin spent
/// plus gas converted at the historical native price.
pub async fn cost_basis(
    prices: &dyn PriceFeed,
    chain: SupportedChain,
    tx_hash: &str,
    gas_used: Decimal,
    buy_amount: Decimal,
) -> Result<Decimal> {
    let native_price = prices.price_at_tx_time(chain, tx_hash).await?;
    Ok(gas_used * native_price + buy_amount)
}

/// Realized profit of a sell against the trade that opened the position.
///
/// Defined only when the opening trade is a Buy with a recorded cost basis;
/// `None` means "not computable", which callers must never collapse to zero.
pub async fn realized_profit(
    prices: &dyn PriceFeed,
    chain: SupportedChain,
    tx_hash: &str,
    gas_used: Decimal,
    amount_in: Decimal,
    open_trade: Option<&Trade>,
) -> Result<Option<Decimal>> {
    let open = match open_trade {
        Some(trade) if trade.kind == TradeKind::Buy => trade,
        _ => return Ok(None),
    };

    let basis = match open.cost_basis {
        Some(basis) => basis,
        None => return Ok(None),
    };

    let native_price = prices.price_at_tx_time(chain, tx_hash).await?;
    let fee = gas_used * native_price;

    Ok(Some(amount_in - basis - fee))
}
