use super::{sanitize_subject, Notifier};
use crate::components::changes::EmailMessage;
use crate::config::MailConfig;
use crate::error::{email_error, AppResult};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

/// Sends HTML mail through an authenticated STARTTLS relay
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
}

impl SmtpNotifier {
    pub fn new(config: &MailConfig) -> AppResult<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| email_error(&format!("Invalid SMTP relay {}: {}", config.host, e)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        let from = parse_mailbox(&config.from)?;
        let recipients = config
            .recipients
            .iter()
            .map(|r| parse_mailbox(r))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            transport,
            from,
            recipients,
        })
    }

    fn build(&self, message: &EmailMessage) -> AppResult<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(sanitize_subject(&message.subject))
            .header(ContentType::TEXT_HTML);
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }

        builder
            .body(message.html_body.clone())
            .map_err(|e| email_error(&format!("Failed to build message: {}", e)))
    }
}

fn parse_mailbox(address: &str) -> AppResult<Mailbox> {
    address
        .parse::<Mailbox>()
        .map_err(|e| email_error(&format!("Invalid address '{}': {}", address, e)))
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        let email = self.build(message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| email_error(&format!("SMTP delivery failed: {}", e)))?;

        info!(
            "Sent '{}' to {} recipient(s)",
            message.subject,
            self.recipients.len()
        );
        Ok(())
    }
}
