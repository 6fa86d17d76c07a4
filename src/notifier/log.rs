//! Notifier that renders messages and writes them to the log only.

use async_trait::async_trait;

use crate::message::NotificationInstance;

use super::{Notifier, NotifierError, SendOptions};

/// Log-only notifier
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(
        &self,
        message: &NotificationInstance,
        options: &SendOptions,
        channel: &str,
    ) -> Result<(), NotifierError> {
        let rendered = message.render()?;

        tracing::info!(
            message_id = %message.id(),
            channel = %channel,
            recipient_id = ?message.owner().map(|o| o.id.as_str()),
            correlation_id = ?options.correlation_id,
            subject = %rendered.subject,
            "Log: message delivery skipped"
        );
        Ok(())
    }
}
