//! News rendering and fan-out endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::content::ContentItem;
use crate::error::{AppError, Result};
use crate::fanout::FanoutReport;
use crate::render::RenderTree;
use crate::server::AppState;

async fn load(state: &AppState, id: &str) -> Result<ContentItem> {
    state
        .content
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("news item {}", id)))
}

/// GET /news/{id} - full view; announces the item in the background
pub async fn render_full(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RenderTree>> {
    let item = load(&state, &id).await?;
    Ok(Json(state.view_builder.render_full(Arc::new(item))))
}

/// GET /news/{id}/teaser - compact card view
pub async fn render_teaser(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RenderTree>> {
    let item = load(&state, &id).await?;
    Ok(Json(state.view_builder.render_teaser(&item)))
}

/// POST /api/v1/news/{id}/notify - run a fan-out and wait for its report
pub async fn notify(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FanoutReport>> {
    let item = load(&state, &id).await?;
    let report = state.fanout.notify_all(Arc::new(item)).await?;
    Ok(Json(report))
}
