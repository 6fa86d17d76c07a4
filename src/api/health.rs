//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::fanout::FanoutStatsSnapshot;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub store_backend: String,
    pub notifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postgres: Option<PostgresHealthResponse>,
}

#[derive(Debug, Serialize)]
pub struct PostgresHealthResponse {
    pub status: String,
    pub url: String,
    pub connected: bool,
    pub pool_size: u32,
    pub idle_connections: u32,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub fanout: FanoutStatsSnapshot,
    pub concurrency: usize,
    pub dispatch_timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages_stored: Option<u64>,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let postgres = match &state.postgres {
        Some(pool) => {
            let connected = sqlx::query("SELECT 1").execute(pool.pool()).await.is_ok();
            let (size, idle) = pool.usage();
            Some(PostgresHealthResponse {
                status: if connected { "healthy" } else { "unhealthy" }.to_string(),
                url: pool.database_url_masked().to_string(),
                connected,
                pool_size: size,
                idle_connections: idle,
            })
        }
        None => None,
    };

    let status = match &postgres {
        Some(pg) if !pg.connected => "degraded",
        _ => "healthy",
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        store_backend: state.messages.backend_type().to_string(),
        notifier: state.notifier_name.to_string(),
        postgres,
    })
}

/// GET /stats
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let messages_stored = match state.messages.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to count stored messages");
            None
        }
    };

    let config = state.fanout.config();
    Json(StatsResponse {
        fanout: state.fanout.stats(),
        concurrency: config.concurrency,
        dispatch_timeout_ms: config.dispatch_timeout_ms,
        messages_stored,
    })
}
