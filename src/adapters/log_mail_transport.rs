use crate::ports::mail_transport::{MailMessage, MailTransport, Result};
use async_trait::async_trait;

/// MailTransport that writes each message to the log instead of sending it
///
/// Used when no real mail relay is configured.
#[derive(Debug, Default)]
pub struct LogMailTransport;

impl LogMailTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MailTransport for LogMailTransport {
    async fn send(&self, message: MailMessage) -> Result<()> {
        tracing::info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            "Mail accepted for delivery"
        );
        tracing::debug!(body = %message.body, "Mail body");
        Ok(())
    }
}
