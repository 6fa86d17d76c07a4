//! API layer - HTTP endpoint handlers.

mod health;
mod metrics;
mod news;
mod routes;

pub use health::{health, stats, HealthResponse, StatsResponse};
pub use metrics::prometheus_metrics;
pub use news::{notify, render_full, render_teaser};
pub use routes::api_routes;
