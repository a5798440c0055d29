//! Outbound email for absentee reminders.
//!
//! [`SmtpMailer`] wraps the `lettre` async SMTP transport. When SMTP is not
//! configured the service runs with [`DisabledMailer`], which fails every
//! send so bulk runs still finish and report.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
    message::MultiPart,
    transport::smtp::authentication::Credentials,
};
use uuid::Uuid;

use crate::config::SmtpConfig;
use crate::model::notification::Message;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(String),

    #[error("mailer not configured")]
    NotConfigured,
}

/// Delivery receipt. `message_id` is opaque to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct SendReceipt {
    pub message_id: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &Message) -> Result<SendReceipt, MailError>;
}

pub struct SmtpMailer {
    from_address: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port);

        if let (Some(user), Some(pass)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            from_address: config.from_address.clone(),
            transport: builder.build(),
        })
    }

    fn message_id(&self) -> String {
        let domain = self
            .from_address
            .rsplit_once('@')
            .map(|(_, d)| d.trim_end_matches('>'))
            .unwrap_or("localhost");
        format!("<{}@{}>", Uuid::new_v4(), domain)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &Message) -> Result<SendReceipt, MailError> {
        let message_id = self.message_id();

        let email = lettre::Message::builder()
            .from(self.from_address.parse()?)
            .to(message.to.parse()?)
            .subject(message.subject.clone())
            .message_id(Some(message_id.clone()))
            .multipart(MultiPart::alternative_plain_html(
                message.text_body.clone(),
                message.html_body.clone(),
            ))
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport.send(email).await?;

        tracing::info!(to = %message.to, %message_id, "Notification email sent");
        Ok(SendReceipt {
            message_id: Some(message_id),
        })
    }
}

pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, _message: &Message) -> Result<SendReceipt, MailError> {
        Err(MailError::NotConfigured)
    }
}
