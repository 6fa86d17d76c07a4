//! Per-recipient notification fan-out.

mod service;
mod stats;

pub use service::{FanoutError, NotificationFanoutService};
pub use stats::{FanoutReport, FanoutStats, FanoutStatsSnapshot};
