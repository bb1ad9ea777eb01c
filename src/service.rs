//! Trading service.
//!
//! The single owning component: holds the stores, the price feed, and the
//! order mutex, and exposes every control surface as a method. No ambient
//! globals; state flows into the order executor from here, per call.

use crate::alerts::{AlertSink, TelegramAlerter};
use crate::balances::{BalanceSource, LiveBalances};
use crate::chains::{resolve_token, SupportedChain, TokenInfo};
use crate::config::{AppConfig, ConfigStore};
use crate::executor::{OrderContext, OrderExecutor};
use crate::prices::{GeckoPrices, PriceFeed};
use crate::routing::AggregatorRouter;
use crate::stats::{log_stats, trade_stats, TradeStats};
use crate::store::{ErrorLog, PositionStore, TradeHistory};
use crate::types::{ErrorEntry, ErrorKind, Signal, SignalKind, Trade};
use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Native-currency floor below which no order is attempted.
fn min_gas_floor() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

/// Structured audit event attached to a config write.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigEvent {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
}

/// One row of the assets overview for the active chain.
#[derive(Debug, Clone, Serialize)]
pub struct Asset {
    pub name: String,
    pub symbol: String,
    pub chain: String,
    pub balance: Decimal,
    pub price: Decimal,
}

/// Everything chain-facing resolved from config for one order attempt.
struct OrderSetup {
    chain: SupportedChain,
    wallet: Address,
    provider: DynProvider,
    stablecoin: TokenInfo,
    token: TokenInfo,
}

pub struct TradingService {
    config: ConfigStore,
    position: PositionStore,
    trades: TradeHistory,
    errors: ErrorLog,
    prices: GeckoPrices,
    /// Serializes entire order attempts: precondition check through
    /// post-execution persistence. Closes the double-buy race two
    /// concurrent signals would otherwise win together.
    order_lock: Mutex<()>,
}

fn wallet_signer() -> Result<PrivateKeySigner> {
    let key = std::env::var("PRIVATE_KEY").context("PRIVATE_KEY not set")?;
    key.parse::<PrivateKeySigner>()
        .context("PRIVATE_KEY is not a valid private key")
}

fn build_provider(rpc: &str, signer: PrivateKeySigner) -> Result<DynProvider> {
    let wallet = EthereumWallet::from(signer);
    let url = rpc.parse().context("Invalid RPC URL")?;
    Ok(ProviderBuilder::new().wallet(wallet).connect_http(url).erased())
}

/// CoinGecko id for a traded token symbol; unknown symbols fall back to
/// the chain's native coin.
fn token_coin_id(symbol: &str, chain: SupportedChain) -> &'static str {
    let symbol = symbol.trim_start_matches('g');
    if symbol.eq_ignore_ascii_case("WETH") || symbol.eq_ignore_ascii_case("ETH") {
        "ethereum"
    } else if symbol.eq_ignore_ascii_case("WMATIC") || symbol.eq_ignore_ascii_case("MATIC") {
        "matic-network"
    } else if symbol.eq_ignore_ascii_case("WBTC") {
        "wrapped-bitcoin"
    } else {
        chain.coingecko_id()
    }
}

impl TradingService {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            config: ConfigStore::new(&data_dir),
            position: PositionStore::new(&data_dir),
            trades: TradeHistory::new(&data_dir),
            errors: ErrorLog::new(&data_dir),
            prices: GeckoPrices::new(),
            order_lock: Mutex::new(()),
        }
    }

    /// Accept a signal and return immediately; the order proceeds on its
    /// own task. The caller learns the outcome from trade history and the
    /// error log, never from this call.
    pub fn handle_signal(self: Arc<Self>, signal: Signal) {
        tokio::spawn(async move {
            self.process_signal(signal).await;
        });
    }

    async fn process_signal(&self, signal: Signal) {
        let _guard = self.order_lock.lock().await;

        let config = self.config.load();
        let alerter = TelegramAlerter::from_env(config.logs.telegram);
        let side = match signal.kind {
            SignalKind::Buy => ErrorKind::Buy,
            SignalKind::Sell => ErrorKind::Sell,
        };

        let setup = match self.prepare_order(&config) {
            Ok(setup) => setup,
            Err(e) => {
                error!("Order setup failed: {:#}", e);
                if let Err(e) = self.errors.track(
                    side,
                    format!("{:#}", e),
                    Some(config.active_chain.display_name.clone()),
                ) {
                    error!("Error appending to error log: {:#}", e);
                }
                return;
            }
        };

        let balances = LiveBalances::new(setup.provider.clone(), setup.wallet, setup.chain);

        if !self.has_gas_money(&balances).await {
            warn!("Insufficient gas funds");
            alerter.send("Insufficient gas funds").await;
            return;
        }

        // Enabled gate: the signal was acknowledged, now silently dropped.
        if !config.status {
            debug!("Bot disabled, dropping {:?} signal", signal.kind);
            return;
        }

        let router = AggregatorRouter::new(
            setup.provider,
            setup.wallet,
            config.active_chain.id,
            config.strategy.slippage,
        );
        let ctx = OrderContext {
            config,
            chain: setup.chain,
            stablecoin: setup.stablecoin,
            token: setup.token,
        };
        let executor = OrderExecutor::new(
            ctx,
            &balances,
            &router,
            &self.prices,
            &alerter,
            &self.position,
            &self.trades,
            &self.errors,
        );

        match signal.kind {
            SignalKind::Buy => {
                info!("Processing buy order...");
                executor.buy(&signal.price).await;
            }
            SignalKind::Sell => {
                info!("Processing sell order...");
                executor.sell(&signal.price).await;
            }
        }
    }

    fn prepare_order(&self, config: &AppConfig) -> Result<OrderSetup> {
        let chain: SupportedChain = config.active_chain.name.parse()?;
        let signer = wallet_signer()?;
        let wallet = signer.address();
        let provider = build_provider(&config.active_chain.rpc, signer)?;

        let chain_data = self.config.chain_data();
        let stablecoin = resolve_token(
            &chain_data,
            &config.active_chain.name,
            &config.tokens.stablecoin,
        )?;
        let token = resolve_token(&chain_data, &config.active_chain.name, &config.tokens.token)?;

        Ok(OrderSetup {
            chain,
            wallet,
            provider,
            stablecoin,
            token,
        })
    }

    /// Gas gate: the native balance must clear a fixed floor before any
    /// order. A failed balance read counts as insufficient.
    async fn has_gas_money(&self, balances: &dyn BalanceSource) -> bool {
        match balances.native_balance().await {
            Ok(balance) => balance >= min_gas_floor(),
            Err(e) => {
                warn!("Error fetching native balance: {:#}", e);
                false
            }
        }
    }

    // ── Control surfaces ─────────────────────────────────────────────

    pub fn config(&self) -> AppConfig {
        self.config.load()
    }

    /// Replace the config document; an optional structured event audits
    /// the change in the error log.
    pub fn update_config(&self, config: AppConfig, event: Option<ConfigEvent>) -> Result<AppConfig> {
        self.config.save(&config)?;

        if let Some(event) = event {
            self.errors.track(
                event.kind,
                event.message,
                Some(config.active_chain.display_name.clone()),
            )?;
        }

        Ok(config)
    }

    pub fn status(&self) -> bool {
        self.config.status()
    }

    /// Flip the enabled flag and audit the change.
    pub fn set_status(&self, status: bool) -> Result<bool> {
        let config = self.config.set_status(status)?;

        let message = if status {
            "Bot started via control panel"
        } else {
            "Bot stopped via control panel"
        };
        self.errors.track(
            ErrorKind::BotStatus,
            message,
            Some(config.active_chain.display_name),
        )?;

        if status {
            info!("{}", message);
        } else {
            warn!("{}", message);
        }

        Ok(status)
    }

    pub fn trades(&self) -> (Vec<Trade>, TradeStats) {
        let trades = self.trades.load();
        let stats = trade_stats(&trades);
        (trades, stats)
    }

    pub fn logs(&self) -> (Vec<ErrorEntry>, HashMap<String, u64>) {
        let entries = self.errors.load();
        let stats = log_stats(&entries);
        (entries, stats)
    }

    pub fn clear_logs(&self) -> Result<()> {
        self.errors.clear()
    }

    /// Balances and spot prices for the active chain's native currency,
    /// stablecoin, and traded token.
    pub async fn assets(&self) -> Result<Vec<Asset>> {
        let config = self.config.load();
        let setup = self.prepare_order(&config)?;
        let balances = LiveBalances::new(setup.provider.clone(), setup.wallet, setup.chain);

        let (native_balance, stable_balance, token_balance) = futures::try_join!(
            balances.native_balance(),
            balances.token_balance(&setup.stablecoin),
            balances.token_balance(&setup.token),
        )?;

        let native_price = self
            .prices
            .spot_price(setup.chain.coingecko_id())
            .await
            .unwrap_or(Decimal::ZERO);
        let token_price = self
            .prices
            .spot_price(token_coin_id(&setup.token.symbol, setup.chain))
            .await
            .unwrap_or(Decimal::ZERO);

        let chain_name = config.active_chain.display_name.clone();
        Ok(vec![
            Asset {
                name: config.active_chain.currency.clone(),
                symbol: config.active_chain.currency.clone(),
                chain: chain_name.clone(),
                balance: native_balance,
                price: native_price,
            },
            Asset {
                name: setup.stablecoin.name.clone(),
                symbol: setup.stablecoin.symbol.clone(),
                chain: chain_name.clone(),
                balance: stable_balance,
                price: Decimal::ONE,
            },
            Asset {
                name: setup.token.name.clone(),
                symbol: setup.token.symbol.clone(),
                chain: chain_name,
                balance: token_balance,
                price: token_price,
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> (tempfile::TempDir, TradingService) {
        let dir = tempfile::tempdir().unwrap();
        let service = TradingService::new(dir.path().to_path_buf());
        (dir, service)
    }

    #[test]
    fn set_status_audits_start_and_stop() {
        let (_dir, service) = service();

        service.set_status(true).unwrap();
        assert!(service.status());

        service.set_status(false).unwrap();
        assert!(!service.status());

        let (entries, stats) = service.logs();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.kind == ErrorKind::BotStatus));
        assert!(entries[0].message.contains("stopped"));
        assert!(entries[1].message.contains("started"));
        assert_eq!(stats["BOT_STATUS"], 2);
    }

    #[test]
    fn update_config_appends_optional_audit_event() {
        let (_dir, service) = service();

        let mut config = service.config();
        config.strategy.min = Decimal::from(25);

        service
            .update_config(
                config,
                Some(ConfigEvent {
                    kind: ErrorKind::BotStatus,
                    message: "Chain switched via control panel".to_string(),
                }),
            )
            .unwrap();

        assert_eq!(service.config().strategy.min, Decimal::from(25));

        let (entries, _) = service.logs();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].message.contains("Chain switched"));
    }

    #[test]
    fn update_config_without_event_stays_silent() {
        let (_dir, service) = service();

        service.update_config(service.config(), None).unwrap();
        assert!(service.logs().0.is_empty());
    }

    #[test]
    fn clear_logs_is_destructive() {
        let (_dir, service) = service();

        service.set_status(true).unwrap();
        assert!(!service.logs().0.is_empty());

        service.clear_logs().unwrap();
        assert!(service.logs().0.is_empty());
    }

    #[test]
    fn trades_surface_returns_history_with_stats() {
        let (_dir, service) = service();

        let (trades, stats) = service.trades();
        assert!(trades.is_empty());
        assert_eq!(stats.total_profit, Decimal::ZERO);
        assert!(stats.most_frequent_chain.is_none());
    }

    #[test]
    fn token_coin_ids_map_wrapped_assets() {
        assert_eq!(token_coin_id("WETH", SupportedChain::PolygonMainnet), "ethereum");
        assert_eq!(token_coin_id("gWETH", SupportedChain::EthGoerli), "ethereum");
        assert_eq!(token_coin_id("WMATIC", SupportedChain::PolygonMainnet), "matic-network");
        assert_eq!(token_coin_id("WBTC", SupportedChain::EthMainnet), "wrapped-bitcoin");
        assert_eq!(
            token_coin_id("UNKNOWN", SupportedChain::PolygonMainnet),
            "matic-network"
        );
    }
}
