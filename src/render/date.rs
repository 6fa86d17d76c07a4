use std::fmt::Write;

use chrono::{DateTime, Utc};

/// Map a named pattern to its chrono format string.
///
/// Anything other than "long", "medium" or "short" is treated as a chrono
/// format string.
pub fn pattern_format(pattern: &str) -> &str {
    match pattern {
        "long" => "%B %-d, %Y",
        "medium" => "%b %-d, %Y",
        "short" => "%Y-%m-%d",
        other => other,
    }
}

/// Format a timestamp with a named or literal pattern.
///
/// An invalid literal pattern falls back to the "long" pattern.
pub fn format_pattern(timestamp: DateTime<Utc>, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", timestamp.format(pattern_format(pattern))).is_err() {
        tracing::warn!(pattern = %pattern, "Invalid date pattern, using long format");
        return timestamp.format(pattern_format("long")).to_string();
    }
    out
}
