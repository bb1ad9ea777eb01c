//! Contract Definitions & Unit Conversions
//!
//! The Solidity interfaces the bot talks to directly, defined with alloy's
//! `sol!` macro, plus the conversions between raw on-chain integer amounts
//! and the `Decimal` token units used everywhere else.
//!
//! The swap payload itself comes pre-encoded from the route aggregator, so
//! the only interface needed here is ERC20 (balances and router allowances).

use alloy::primitives::U256;
use alloy::sol;
use rust_decimal::Decimal;
use std::str::FromStr;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

/// Convert a raw on-chain amount into token units.
///
/// Falls back to whole-unit precision when the full-precision value does not
/// fit a `Decimal` mantissa (96 bits).
pub fn to_units(raw: U256, decimals: u8) -> Decimal {
    let value = u128::try_from(raw).unwrap_or(u128::MAX);
    let clamped = value.min(i128::MAX as u128) as i128;

    match Decimal::try_from_i128_with_scale(clamped, decimals as u32) {
        Ok(d) => d.normalize(),
        Err(_) => {
            let whole = raw / U256::from(10u64).pow(U256::from(decimals));
            Decimal::from_str(&whole.to_string()).unwrap_or(Decimal::MAX)
        }
    }
}

/// Convert a token-unit amount into the raw integer the chain expects.
///
/// Amounts are truncated to the token's precision; negative amounts map to
/// zero (there is no such thing as a negative transfer).
pub fn from_units(amount: Decimal, decimals: u8) -> U256 {
    if amount <= Decimal::ZERO {
        return U256::ZERO;
    }

    let mut scaled = amount.trunc_with_scale(decimals as u32);
    scaled.rescale(decimals as u32);

    let mantissa = scaled.mantissa();
    if mantissa <= 0 {
        U256::ZERO
    } else {
        U256::from(mantissa as u128)
    }
}

/// Convert a wei amount into native-currency units (18 decimals).
pub fn wei_to_native(wei: u128) -> Decimal {
    let clamped = wei.min(i128::MAX as u128) as i128;
    Decimal::try_from_i128_with_scale(clamped, 18)
        .map(|d| d.normalize())
        .unwrap_or(Decimal::MAX)
}
