mod smtp;

pub use smtp::SmtpNotifier;

use crate::components::changes::EmailMessage;
use crate::error::AppResult;
use async_trait::async_trait;
use tracing::{error, info};

/// Delivers one notification email
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> AppResult<()>;
}

/// Logs messages instead of sending them (`--dry-run`)
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        info!("Dry run, not sending '{}'", message.subject);
        Ok(())
    }
}

/// Send every message in order; a failed delivery is logged and skipped.
///
/// Returns how many messages were delivered.
pub async fn send_all(notifier: &dyn Notifier, messages: &[EmailMessage]) -> usize {
    let mut sent = 0;
    for message in messages {
        match notifier.send(message).await {
            Ok(()) => sent += 1,
            Err(e) => error!("Failed to send '{}': {}", message.subject, e),
        }
    }
    sent
}

/// Subjects must stay on one header line
pub fn sanitize_subject(subject: &str) -> String {
    subject.replace(['\n', '\r'], " ")
}
