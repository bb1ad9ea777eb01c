//! Order Executor
//!
//! The reconciliation core: takes a gated buy/sell signal, checks
//! preconditions against the position ledger, executes an irreversible swap
//! through the route engine, and updates position, history, and error log so
//! accounting never diverges from what actually landed on chain.
//!
//! Never propagates errors to its caller: every failure is converted into a
//! durable error-log entry plus a best-effort alert, and a failed order
//! leaves position and history untouched.

use crate::alerts::AlertSink;
use crate::balances::BalanceSource;
use crate::chains::{SupportedChain, TokenInfo};
use crate::config::AppConfig;
use crate::pnl;
use crate::prices::PriceFeed;
use crate::routing::{RouteEngine, RouteError};
use crate::stats;
use crate::store::{ErrorLog, PositionStore, TradeHistory};
use crate::types::{ErrorKind, Position, Trade, TradeKind};
use anyhow::Result;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

/// Everything resolved from config at the start of an order attempt.
/// Rebuilt per signal, so operator edits apply to the next order.
pub struct OrderContext {
    pub config: AppConfig,
    pub chain: SupportedChain,
    pub stablecoin: TokenInfo,
    pub token: TokenInfo,
}

/// Orchestrates a single buy or sell against the ledger and the chain.
pub struct OrderExecutor<'a> {
    ctx: OrderContext,
    balances: &'a dyn BalanceSource,
    router: &'a dyn RouteEngine,
    prices: &'a dyn PriceFeed,
    alerts: &'a dyn AlertSink,
    position: &'a PositionStore,
    trades: &'a TradeHistory,
    errors: &'a ErrorLog,
}

impl<'a> OrderExecutor<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ctx: OrderContext,
        balances: &'a dyn BalanceSource,
        router: &'a dyn RouteEngine,
        prices: &'a dyn PriceFeed,
        alerts: &'a dyn AlertSink,
        position: &'a PositionStore,
        trades: &'a TradeHistory,
        errors: &'a ErrorLog,
    ) -> Self {
        Self {
            ctx,
            balances,
            router,
            prices,
            alerts,
            position,
            trades,
            errors,
        }
    }

    /// Open a position: swap a configured fraction of the stablecoin
    /// balance into the speculative token.
    pub async fn buy(&self, price: &str) {
        let position = self.position.load();
        if position.position_open {
            warn!("Position already open, skipping buy order");
            self.track(
                ErrorKind::OrderConflict,
                "Buy order received while a position is already open",
            );
            return;
        }

        let stable_balance = match self.balances.token_balance(&self.ctx.stablecoin).await {
            Ok(balance) => balance,
            Err(e) => {
                return self
                    .fail(ErrorKind::Buy, "Buy order failed", &format!("{:#}", e))
                    .await
            }
        };

        if stable_balance <= self.ctx.config.strategy.min {
            warn!(
                "Insufficient {} balance, trade cancelled",
                self.ctx.stablecoin.symbol
            );
            return;
        }

        let trade_amount = (stable_balance * self.ctx.config.strategy.size)
            .trunc_with_scale(self.ctx.stablecoin.decimals as u32)
            .normalize();

        let route = match self
            .router
            .generate_route(&self.ctx.stablecoin, &self.ctx.token, trade_amount)
            .await
        {
            Ok(route) => route,
            Err(e) => {
                error!("Route generation failed: {}", e);
                self.track(ErrorKind::Routing, e.to_string());
                return;
            }
        };

        info!(
            "Processing buy order: {} {} -> {}",
            trade_amount, self.ctx.stablecoin.symbol, self.ctx.token.symbol
        );

        let executed = match self.router.execute_route(&route).await {
            Ok(executed) => executed,
            Err(e) => {
                return self
                    .fail(
                        Self::failure_kind(&e, ErrorKind::Buy),
                        "Buy order failed",
                        &e.to_string(),
                    )
                    .await
            }
        };

        let (stable_after, token_after) = match self.token_balances().await {
            Ok(balances) => balances,
            Err(e) => {
                return self
                    .fail(ErrorKind::Buy, "Buy order failed", &format!("{:#}", e))
                    .await
            }
        };

        let trade_key = Trade::new_key();
        let now = Utc::now();

        let updated = Position {
            position_open: token_after > Decimal::ZERO,
            stablecoin_balance: stable_after,
            token_balance: token_after,
            last_trade: Some(format!("Position opened at {}", price)),
            last_trade_time: Some(format!("[{}]", now.format("%Y-%m-%d %H:%M:%S"))),
            last_trade_price: Some(price.to_string()),
            open_trade_key: Some(trade_key.clone()),
        };
        if let Err(e) = self.position.save(&updated) {
            error!("Error saving position: {:#}", e);
        }

        self.alerts
            .send(&format!(
                "Position opened at {} ({} {})",
                price, token_after, self.ctx.token.symbol
            ))
            .await;

        // Best effort: a failed historical price lookup leaves the basis
        // unset rather than unwinding a position that already exists on
        // chain. The eventual sell then reports an undefined profit.
        let basis = match pnl::cost_basis(
            self.prices,
            self.ctx.chain,
            &executed.tx_hash,
            executed.gas_used,
            trade_amount,
        )
        .await
        {
            Ok(basis) => Some(basis),
            Err(e) => {
                warn!("Error computing cost basis: {:#}", e);
                None
            }
        };

        let trade = Trade {
            key: trade_key,
            kind: TradeKind::Buy,
            price: price.to_string(),
            date: now,
            in_amount: format!("{} {}", token_after, self.ctx.token.symbol),
            out_amount: format!("{} {}", trade_amount, self.ctx.stablecoin.symbol),
            amount_out: Some(trade_amount),
            gas_used: executed.gas_used,
            cost_basis: basis,
            profit: None,
            link: self.explorer_link(&executed.tx_hash),
            chain: Some(self.ctx.config.active_chain.display_name.clone()),
        };
        if let Err(e) = self.trades.append(trade) {
            error!("Error saving trade: {:#}", e);
        }

        info!("Buy order executed");
    }

    /// Close the position: swap the entire token balance back into the
    /// stablecoin (full liquidation, never partial).
    pub async fn sell(&self, price: &str) {
        let position = self.position.load();
        if !position.position_open {
            warn!("No position currently open, skipping sell order");
            self.track(
                ErrorKind::OrderConflict,
                "Sell order received, but no position is currently open",
            );
            return;
        }

        // Both balances are needed up front: proceeds are measured as the
        // stablecoin delta across the swap.
        let (stable_before, token_before) = match self.token_balances().await {
            Ok(balances) => balances,
            Err(e) => {
                return self
                    .fail(ErrorKind::Sell, "Sell order failed", &format!("{:#}", e))
                    .await
            }
        };

        if token_before <= Decimal::ZERO {
            warn!(
                "Insufficient {} balance, trade cancelled",
                self.ctx.token.symbol
            );
            return;
        }

        let route = match self
            .router
            .generate_route(&self.ctx.token, &self.ctx.stablecoin, token_before)
            .await
        {
            Ok(route) => route,
            Err(e) => {
                error!("Route generation failed: {}", e);
                self.track(ErrorKind::Routing, e.to_string());
                return;
            }
        };

        info!(
            "Processing sell order: {} {} -> {}",
            token_before, self.ctx.token.symbol, self.ctx.stablecoin.symbol
        );

        let executed = match self.router.execute_route(&route).await {
            Ok(executed) => executed,
            Err(e) => {
                return self
                    .fail(
                        Self::failure_kind(&e, ErrorKind::Sell),
                        "Sell order failed",
                        &e.to_string(),
                    )
                    .await
            }
        };

        let (stable_after, token_after) = match self.token_balances().await {
            Ok(balances) => balances,
            Err(e) => {
                return self
                    .fail(ErrorKind::Sell, "Sell order failed", &format!("{:#}", e))
                    .await
            }
        };

        let amount_in = stable_after - stable_before;
        let open_trade = position
            .open_trade_key
            .as_deref()
            .and_then(|key| self.trades.find(key));

        let now = Utc::now();
        let still_open = token_after > Decimal::ZERO;

        let updated = Position {
            position_open: still_open,
            stablecoin_balance: stable_after,
            token_balance: token_after,
            last_trade: Some(format!("Position closed at {}", price)),
            last_trade_time: Some(format!("[{}]", now.format("%Y-%m-%d %H:%M:%S"))),
            last_trade_price: Some(price.to_string()),
            open_trade_key: if still_open {
                position.open_trade_key.clone()
            } else {
                None
            },
        };
        if let Err(e) = self.position.save(&updated) {
            error!("Error saving position: {:#}", e);
        }

        let profit = match pnl::realized_profit(
            self.prices,
            self.ctx.chain,
            &executed.tx_hash,
            executed.gas_used,
            amount_in,
            open_trade.as_ref(),
        )
        .await
        {
            Ok(profit) => profit,
            Err(e) => {
                warn!("Error calculating profit: {:#}", e);
                None
            }
        };

        let trade = Trade {
            key: Trade::new_key(),
            kind: TradeKind::Sell,
            price: price.to_string(),
            date: now,
            in_amount: format!("{} {}", amount_in, self.ctx.stablecoin.symbol),
            out_amount: format!("{} {}", token_before, self.ctx.token.symbol),
            amount_out: Some(token_before),
            gas_used: executed.gas_used,
            cost_basis: None,
            profit,
            link: self.explorer_link(&executed.tx_hash),
            chain: Some(self.ctx.config.active_chain.display_name.clone()),
        };
        if let Err(e) = self.trades.append(trade) {
            error!("Error saving trade: {:#}", e);
        }

        let total = stats::total_pnl(&self.trades.load());
        match profit {
            Some(profit) if profit > Decimal::ZERO => {
                let message = format!(
                    "Position closed at {} for a gain of ${} - Total P&L: ${}",
                    price,
                    profit.round_dp(2),
                    total.round_dp(2)
                );
                info!("{}", message);
                self.alerts.send(&message).await;
            }
            Some(profit) => {
                let message = format!(
                    "Position closed at {} for a loss of ${} - Total P&L: ${}",
                    price,
                    profit.abs().round_dp(2),
                    total.round_dp(2)
                );
                warn!("{}", message);
                self.alerts.send(&message).await;
            }
            None => {
                let message = format!("Position closed at {}", price);
                info!("{}", message);
                self.alerts.send(&message).await;
            }
        }
    }

    async fn token_balances(&self) -> Result<(Decimal, Decimal)> {
        let (stable, token) = futures::try_join!(
            self.balances.token_balance(&self.ctx.stablecoin),
            self.balances.token_balance(&self.ctx.token),
        )?;
        Ok((stable, token))
    }

    /// Convert an execution failure into alert + durable entry.
    async fn fail(&self, kind: ErrorKind, alert: &str, message: &str) {
        error!("{}: {}", alert, message);
        self.alerts.send(alert).await;
        self.track(kind, message);
    }

    fn track(&self, kind: ErrorKind, message: impl Into<String>) {
        let chain = Some(self.ctx.config.active_chain.display_name.clone());
        if let Err(e) = self.errors.track(kind, message, chain) {
            error!("Error appending to error log: {:#}", e);
        }
    }

    /// Timeouts get their own category; everything else keeps the side tag.
    fn failure_kind(error: &RouteError, side: ErrorKind) -> ErrorKind {
        match error {
            RouteError::ConfirmationTimeout { .. } => ErrorKind::Timeout,
            _ => side,
        }
    }

    fn explorer_link(&self, tx_hash: &str) -> String {
        let explorer = &self.ctx.config.active_chain.explorer;
        if explorer.ends_with('/') {
            format!("{}tx/{}", explorer, tx_hash)
        } else {
            format!("{}/tx/{}", explorer, tx_hash)
        }
    }
}
