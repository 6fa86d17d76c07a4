use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::content::StoreError;
use crate::fanout::FanoutError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Fan-out error: {0}")]
    Fanout(#[from] FanoutError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

/// Hide internal detail from clients when running in production.
fn masked(log_message: &str, public: &str) -> String {
    if is_production() {
        public.to_string()
    } else {
        log_message.to_string()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let log_message = self.to_string();
        let (status, code, client_message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Store(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORAGE_ERROR",
                masked(&log_message, "Service temporarily unavailable"),
            ),
            AppError::Fanout(FanoutError::TemplateNotFound(key)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "TEMPLATE_NOT_FOUND",
                masked(&format!("Template not registered: {}", key), "Internal server error"),
            ),
            AppError::Fanout(_) => (
                StatusCode::BAD_GATEWAY,
                "FANOUT_ERROR",
                masked(&log_message, "Notification fan-out failed"),
            ),
        };

        // Always log the detailed error server-side
        tracing::error!(
            code = %code,
            status = %status.as_u16(),
            message = %log_message,
            "API error"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
