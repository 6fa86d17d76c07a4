use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use uuid::Uuid;

/// Outcome of a single fan-out run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FanoutReport {
    /// ID of the persisted canonical message
    pub message_id: Uuid,
    /// Active recipients drawn from the source
    pub recipients: usize,
    /// Duplicates handed to the notifier successfully
    pub dispatched: usize,
    /// Duplicates whose resolution or send failed
    pub failed: usize,
    /// Duplicates whose send exceeded the dispatch timeout
    pub timed_out: usize,
    /// Whether the run stopped drawing recipients because it was cancelled
    pub cancelled: bool,
}

impl FanoutReport {
    pub(crate) fn new(message_id: Uuid) -> Self {
        Self {
            message_id,
            recipients: 0,
            dispatched: 0,
            failed: 0,
            timed_out: 0,
            cancelled: false,
        }
    }

    pub(crate) fn record(&mut self, outcome: DispatchOutcome) {
        match outcome {
            DispatchOutcome::Sent => self.dispatched += 1,
            DispatchOutcome::Failed => self.failed += 1,
            DispatchOutcome::TimedOut => self.timed_out += 1,
        }
    }
}

/// Result of one per-recipient dispatch task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DispatchOutcome {
    Sent,
    Failed,
    TimedOut,
}

/// Statistics for the fan-out service
#[derive(Debug, Default)]
pub struct FanoutStats {
    /// Fan-out runs started
    pub runs: AtomicU64,
    /// Canonical messages persisted
    pub persisted: AtomicU64,
    /// Runs aborted because the canonical message could not be saved
    pub persist_failures: AtomicU64,
    /// Runs aborted because the recipient source failed
    pub recipient_failures: AtomicU64,
    /// Runs that stopped early on cancellation
    pub cancelled_runs: AtomicU64,
    /// Total recipients drawn
    pub recipients: AtomicU64,
    /// Total successful dispatches
    pub dispatched: AtomicU64,
    /// Total failed dispatches
    pub failed: AtomicU64,
    /// Total dispatches that timed out
    pub timed_out: AtomicU64,
}

impl FanoutStats {
    pub(crate) fn record_outcome(&self, outcome: DispatchOutcome) {
        let counter = match outcome {
            DispatchOutcome::Sent => &self.dispatched,
            DispatchOutcome::Failed => &self.failed,
            DispatchOutcome::TimedOut => &self.timed_out,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FanoutStatsSnapshot {
        FanoutStatsSnapshot {
            runs: self.runs.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            recipient_failures: self.recipient_failures.load(Ordering::Relaxed),
            cancelled_runs: self.cancelled_runs.load(Ordering::Relaxed),
            recipients: self.recipients.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of fan-out statistics
#[derive(Debug, Clone, Serialize)]
pub struct FanoutStatsSnapshot {
    pub runs: u64,
    pub persisted: u64,
    pub persist_failures: u64,
    pub recipient_failures: u64,
    pub cancelled_runs: u64,
    pub recipients: u64,
    pub dispatched: u64,
    pub failed: u64,
    pub timed_out: u64,
}
