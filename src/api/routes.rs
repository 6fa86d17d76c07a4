use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::health::{health, stats};
use super::metrics::prometheus_metrics;
use super::news::{notify, render_full, render_teaser};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health, stats & metrics
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        // Render surface
        .route("/news/{id}", get(render_full))
        .route("/news/{id}/teaser", get(render_teaser))
        // Explicit fan-out trigger
        .nest(
            "/api/v1",
            Router::new().route("/news/{id}/notify", post(notify)),
        )
}
