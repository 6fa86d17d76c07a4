//! Prometheus scrape endpoint.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use prometheus::{Encoder, TextEncoder};

use crate::metrics;

/// GET /metrics
pub async fn prometheus_metrics() -> Response {
    let content_type = TextEncoder::new().format_type().to_string();

    metrics::encode_metrics()
        .map(|body| ([(header::CONTENT_TYPE, content_type)], body).into_response())
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Metrics encoding failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable").into_response()
        })
}
