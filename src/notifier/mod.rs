//! Notifier transports.
//!
//! A notifier renders a bound message and hands it to a delivery channel.
//! Delivery is fire-and-forget from the caller's point of view: the
//! transport owns any retry or acknowledgement semantics.
//!
//! - `LogNotifier`: renders and logs the message (default)
//! - `SmtpNotifier`: renders and sends over SMTP with lettre

mod log;
mod smtp;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::NotifierConfig;
use crate::message::{NotificationInstance, RenderError};

pub use self::log::LogNotifier;
pub use smtp::SmtpNotifier;

/// Channel used for email delivery
pub const EMAIL_CHANNEL: &str = "email";

/// Errors raised while sending a message
#[derive(Debug, Error)]
pub enum NotifierError {
    /// Placeholder resolution failed at render time
    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    /// The message has no deliverable address
    #[error("No delivery address for recipient: {0}")]
    NoAddress(String),

    /// This notifier cannot deliver on the requested channel
    #[error("Unsupported channel: {0}")]
    UnsupportedChannel(String),

    /// The underlying transport rejected or failed the send
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Per-send options passed through to the transport
#[derive(Debug, Clone, Default, Serialize)]
pub struct SendOptions {
    /// Overrides the recipient's own address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,
    /// Correlation ID for tracing (the canonical message ID during fan-out)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

/// Delivers a rendered message on a channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Notifier type identifier
    fn name(&self) -> &'static str;

    /// Render `message` and deliver it on `channel`
    async fn send(
        &self,
        message: &NotificationInstance,
        options: &SendOptions,
        channel: &str,
    ) -> Result<(), NotifierError>;
}

/// Create a notifier based on configuration.
///
/// - `"smtp"`: Returns an `SmtpNotifier`
/// - `"log"` (default): Returns a `LogNotifier`
pub fn create_notifier(settings: &NotifierConfig) -> Arc<dyn Notifier> {
    match settings.backend.as_str() {
        "smtp" => {
            tracing::info!(
                host = %settings.smtp_host,
                port = settings.smtp_port,
                "Using SMTP notifier"
            );
            Arc::new(SmtpNotifier::new(
                &settings.smtp_host,
                settings.smtp_port,
                settings.from_address.clone(),
            ))
        }
        _ => {
            tracing::info!("Using log notifier");
            Arc::new(LogNotifier)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_notifier_is_log() {
        assert_eq!(create_notifier(&NotifierConfig::default()).name(), "log");
    }

    #[tokio::test]
    async fn test_smtp_notifier_selected() {
        let settings = NotifierConfig {
            backend: "smtp".to_string(),
            ..NotifierConfig::default()
        };
        assert_eq!(create_notifier(&settings).name(), "smtp");
    }
}
