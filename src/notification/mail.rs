use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("failed to send mail to {recipient}: {message}")]
    Delivery { recipient: String, message: String },
}

/// Delivers one email. No retries are expected from callers.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Writes outgoing mail to the log instead of delivering it
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl MailSender for LogMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MailError> {
        info!(recipient, subject, body, "mail sent");
        Ok(())
    }
}
