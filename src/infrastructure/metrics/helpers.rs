//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{
    CANONICAL_PERSISTED_TOTAL, DISPATCH_LATENCY, DISPATCH_TOTAL, FANOUT_RUNS_TOTAL,
    RECIPIENTS_SEEN_TOTAL, RENDERS_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording fan-out metrics
pub struct FanoutMetrics;

impl FanoutMetrics {
    /// Record the terminal outcome of a fan-out run
    pub fn record_run(outcome: &str) {
        FANOUT_RUNS_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record a persisted canonical record
    pub fn record_persisted() {
        CANONICAL_PERSISTED_TOTAL.inc();
    }

    /// Record an active recipient drawn from the source
    pub fn record_recipient() {
        RECIPIENTS_SEEN_TOTAL.inc();
    }

    /// Record a successful send
    pub fn record_sent(channel: &str, elapsed: Duration) {
        DISPATCH_TOTAL.with_label_values(&[channel, "sent"]).inc();
        DISPATCH_LATENCY.observe(elapsed.as_secs_f64());
    }

    /// Record a resolution or transport failure
    pub fn record_failed(channel: &str) {
        DISPATCH_TOTAL.with_label_values(&[channel, "failed"]).inc();
    }

    /// Record a send that exceeded the dispatch timeout
    pub fn record_timeout(channel: &str) {
        DISPATCH_TOTAL.with_label_values(&[channel, "timeout"]).inc();
    }
}

/// Helper struct for recording render metrics
pub struct RenderMetrics;

impl RenderMetrics {
    pub fn record_full() {
        RENDERS_TOTAL.with_label_values(&["full"]).inc();
    }

    pub fn record_teaser() {
        RENDERS_TOTAL.with_label_values(&["teaser"]).inc();
    }
}
