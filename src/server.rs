//! HTTP control surface.
//!
//! Thin routing layer over [`TradingService`]: every handler is a one-line
//! delegation. The trade intake acknowledges as soon as the signal is
//! accepted; execution continues on its own task and outcomes surface
//! through the trades/logs endpoints.

use crate::config::AppConfig;
use crate::service::{Asset, ConfigEvent, TradingService};
use crate::stats::TradeStats;
use crate::types::{ErrorEntry, Signal, Trade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Serialize)]
struct Ack {
    success: bool,
}

#[derive(Serialize)]
struct ConfigResponse {
    success: bool,
    config: AppConfig,
}

#[derive(Serialize)]
struct StatusResponse {
    success: bool,
    status: bool,
}

#[derive(Serialize)]
struct TradesResponse {
    trades: Vec<Trade>,
    stats: TradeStats,
}

#[derive(Serialize)]
struct LogsResponse {
    logs: Vec<ErrorEntry>,
    stats: HashMap<String, u64>,
}

#[derive(Serialize)]
struct AssetsResponse {
    assets: Vec<Asset>,
}

#[derive(Deserialize)]
struct ConfigUpdateRequest {
    config: AppConfig,
    #[serde(default)]
    event: Option<ConfigEvent>,
}

#[derive(Deserialize)]
struct StatusUpdateRequest {
    status: bool,
}

/// Build the complete router.
pub fn router(service: Arc<TradingService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/trade", post(post_trade))
        .route("/api/config", get(get_config).post(update_config))
        .route("/api/status", get(get_status).post(update_status))
        .route("/api/trades", get(get_trades))
        .route("/api/logs", get(get_logs).delete(clear_logs))
        .route("/api/assets", get(get_assets))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// POST /api/trade - accept a signal, acknowledge immediately.
async fn post_trade(
    State(service): State<Arc<TradingService>>,
    Json(signal): Json<Signal>,
) -> Json<Ack> {
    info!("Received trade signal: {:?} at {}", signal.kind, signal.price);
    service.handle_signal(signal);
    Json(Ack { success: true })
}

async fn get_config(State(service): State<Arc<TradingService>>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        success: true,
        config: service.config(),
    })
}

async fn update_config(
    State(service): State<Arc<TradingService>>,
    Json(request): Json<ConfigUpdateRequest>,
) -> Result<Json<ConfigResponse>, (StatusCode, String)> {
    let config = service
        .update_config(request.config, request.event)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(ConfigResponse {
        success: true,
        config,
    }))
}

async fn get_status(State(service): State<Arc<TradingService>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        success: true,
        status: service.status(),
    })
}

async fn update_status(
    State(service): State<Arc<TradingService>>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<StatusResponse>, (StatusCode, String)> {
    let status = service
        .set_status(request.status)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(StatusResponse {
        success: true,
        status,
    }))
}

async fn get_trades(State(service): State<Arc<TradingService>>) -> Json<TradesResponse> {
    let (trades, stats) = service.trades();
    Json(TradesResponse { trades, stats })
}

async fn get_logs(State(service): State<Arc<TradingService>>) -> Json<LogsResponse> {
    let (logs, stats) = service.logs();
    Json(LogsResponse { logs, stats })
}

async fn clear_logs(
    State(service): State<Arc<TradingService>>,
) -> Result<Json<Ack>, (StatusCode, String)> {
    service
        .clear_logs()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(Ack { success: true }))
}

async fn get_assets(
    State(service): State<Arc<TradingService>>,
) -> Result<Json<AssetsResponse>, (StatusCode, String)> {
    let assets = service
        .assets()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(AssetsResponse { assets }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_builds_with_all_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(TradingService::new(dir.path().to_path_buf()));
        let _router = router(service);
    }
}
