//! Prometheus metrics for the fan-out service.
//!
//! This module provides metrics for monitoring notification fan-out:
//! - Fan-out runs and their terminal outcome
//! - Canonical message persistence
//! - Per-recipient dispatch outcomes and latency
//! - Page renders by display mode

mod helpers;

pub use helpers::{encode_metrics, FanoutMetrics, RenderMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "news";

lazy_static! {
    // ============================================================================
    // Fan-out Metrics
    // ============================================================================

    /// Fan-out runs by outcome (completed, cancelled, persist_failed, recipients_failed)
    pub static ref FANOUT_RUNS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_fanout_runs_total", METRIC_PREFIX),
        "Total notification fan-out runs",
        &["outcome"]
    ).unwrap();

    /// Canonical messages persisted
    pub static ref CANONICAL_PERSISTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_canonical_persisted_total", METRIC_PREFIX),
        "Total canonical notification records persisted"
    ).unwrap();

    /// Active recipients seen while streaming the recipient set
    pub static ref RECIPIENTS_SEEN_TOTAL: IntCounter = register_int_counter!(
        format!("{}_recipients_seen_total", METRIC_PREFIX),
        "Total active recipients drawn from the recipient source"
    ).unwrap();

    // ============================================================================
    // Dispatch Metrics
    // ============================================================================

    /// Dispatch attempts by outcome (sent, failed, timeout)
    pub static ref DISPATCH_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_dispatch_total", METRIC_PREFIX),
        "Total per-recipient dispatch attempts",
        &["channel", "outcome"]
    ).unwrap();

    /// Latency of a single notifier send
    pub static ref DISPATCH_LATENCY: Histogram = register_histogram!(
        format!("{}_dispatch_latency_seconds", METRIC_PREFIX),
        "Per-recipient dispatch latency in seconds",
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0]
    ).unwrap();

    // ============================================================================
    // Render Metrics
    // ============================================================================

    /// Page renders by view mode (full, teaser)
    pub static ref RENDERS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_renders_total", METRIC_PREFIX),
        "Total news item renders",
        &["view_mode"]
    ).unwrap();
}
