use crate::ports::mail_transport::{MailMessage, MailTransport as MailTransportTrait, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// Mock implementation of MailTransport
///
/// Records every message it accepts. Can be switched to reject all messages.
pub struct MailTransport {
    sent: Mutex<Vec<MailMessage>>,
    failing: Mutex<bool>,
}

impl MailTransport {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: Mutex::new(false),
        }
    }

    /// Make every subsequent send fail
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// Messages accepted so far
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for MailTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailTransportTrait for MailTransport {
    async fn send(&self, message: MailMessage) -> Result<()> {
        if *self.failing.lock().unwrap() {
            return Err("mock mail transport rejected the message".into());
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}
