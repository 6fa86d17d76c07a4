//! SMTP notifier.
//!
//! Wraps lettre's `AsyncSmtpTransport` and sends the rendered message as a
//! plain-text email to the bound recipient.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::message::NotificationInstance;

use super::{Notifier, NotifierError, SendOptions, EMAIL_CHANNEL};

/// SMTP notifier
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotifier {
    /// Plain SMTP without TLS, for local relays such as Mailpit
    pub fn new(host: &str, port: u16, from_address: String) -> Self {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();

        Self {
            transport,
            from_address,
        }
    }
}

/// Address the message should go to: the override, else the owner's email.
fn delivery_address(
    message: &NotificationInstance,
    options: &SendOptions,
) -> Result<String, NotifierError> {
    if let Some(mail) = &options.mail {
        return Ok(mail.clone());
    }

    let owner = message
        .owner()
        .ok_or_else(|| NotifierError::NoAddress(format!("message {} has no owner", message.id())))?;

    owner
        .email
        .clone()
        .ok_or_else(|| NotifierError::NoAddress(owner.id.clone()))
}

#[async_trait]
impl Notifier for SmtpNotifier {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(
        &self,
        message: &NotificationInstance,
        options: &SendOptions,
        channel: &str,
    ) -> Result<(), NotifierError> {
        if channel != EMAIL_CHANNEL {
            return Err(NotifierError::UnsupportedChannel(channel.to_string()));
        }

        let to = delivery_address(message, options)?;
        let rendered = message.render()?;

        let from: Mailbox = self
            .from_address
            .parse()
            .map_err(|e| NotifierError::Transport(format!("invalid from address: {e}")))?;
        let to: Mailbox = to
            .parse()
            .map_err(|e| NotifierError::NoAddress(format!("invalid address {to}: {e}")))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(rendered.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(rendered.body)
            .map_err(|e| NotifierError::Transport(format!("failed to build message: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifierError::Transport(format!("SMTP send failed: {e}")))?;

        tracing::debug!(
            message_id = %message.id(),
            correlation_id = ?options.correlation_id,
            "Email sent"
        );
        Ok(())
    }
}
