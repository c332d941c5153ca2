//! HTTP surface consumed by the dashboard.
//!
//! | Method | Path                       | Description                               |
//! |--------|----------------------------|-------------------------------------------|
//! | GET    | `/`                        | Banner                                    |
//! | GET    | `/api/transactions`        | Count and total output of the latest block |
//! | GET    | `/api/whale-transactions`  | Whale transactions, `?threshold=` in BTC  |

use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, SecondsFormat};
use serde::Deserialize;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::analyzer::{analyze, Threshold};
use crate::config::Config;
use crate::error::{AnalysisError, ApiError};
use crate::models::{Block, TransactionsSummary, WhaleReport};
use crate::rpc::BlockSource;

const BANNER: &str = "Bitcoin Blockchain Analyzer Backend is running. \
Use /api/transactions and /api/whale-transactions endpoints.";

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn BlockSource>,
}

#[derive(Deserialize)]
pub struct WhaleQuery {
    pub threshold: Option<String>, // BTC, defaults to 100
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { BANNER }))
        .route("/api/transactions", get(transactions))
        .route("/api/whale-transactions", get(whale_transactions))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn serve(cfg: Config, source: Arc<dyn BlockSource>) -> eyre::Result<()> {
    let app = router(AppState { source });

    let addr = SocketAddr::new(cfg.bind_addr, cfg.port);
    info!("API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

async fn transactions(State(state): State<AppState>) -> Result<Json<TransactionsSummary>, ApiError> {
    let block = state.source.latest_block().await?;
    let analysis = analyze(&block, Threshold::default().value())?;

    Ok(Json(TransactionsSummary {
        message: "Aggregated transactions data from the latest block:".to_string(),
        block_time: iso_block_time(&block)?,
        block_hash: block.hash,
        number_of_transactions: analysis.transaction_count,
        total_output_btc: analysis.total_output_value,
    }))
}

async fn whale_transactions(
    State(state): State<AppState>,
    Query(q): Query<WhaleQuery>,
) -> Result<Json<WhaleReport>, ApiError> {
    // reject bad input before touching the upstream
    let threshold = Threshold::from_query(q.threshold.as_deref())?;

    let block = state.source.latest_block().await?;
    let analysis = analyze(&block, threshold.value())?;
    info!(
        "🐋 {} whale txs ≥ {} BTC in block {}",
        analysis.whale_transactions.len(),
        threshold.value(),
        block.hash
    );

    Ok(Json(WhaleReport {
        message: format!(
            "Whale transactions over {} BTC in the latest block:",
            threshold.value().normalize()
        ),
        block_time: iso_block_time(&block)?,
        block_hash: block.hash,
        whale_transactions_count: analysis.whale_transactions.len(),
        whale_transactions: analysis.whale_transactions,
    }))
}

/// UTC, millisecond precision, `Z` suffix (`2024-01-01T00:00:00.000Z`)
fn iso_block_time(block: &Block) -> Result<String, AnalysisError> {
    DateTime::from_timestamp(block.time, 0)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or(AnalysisError::InvalidBlockTime { time: block.time })
}
