use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{
    config::EmailConfig,
    error::{AppError, Result},
};

/// Outbound plain-text mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        username: String,
        password: String,
        from_address: &str,
    ) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| AppError::Internal(format!("Invalid SMTP relay: {}", e)))?
            .port(port)
            .credentials(Credentials::new(username, password))
            .build();

        let from = from_address
            .parse::<Mailbox>()
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| AppError::Validation(format!("Invalid recipient: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::External(format!("SMTP error: {}", e)))?;

        Ok(())
    }
}

/// Build the SMTP mailer when email is enabled and fully configured.
/// Returns `None` otherwise so callers can report the missing service.
pub fn mailer_from_config(config: &EmailConfig) -> Option<Arc<dyn Mailer>> {
    if !config.enabled {
        return None;
    }

    let (Some(host), Some(username), Some(password), Some(from)) = (
        config.smtp_host.as_deref(),
        config.username.clone(),
        config.password.clone(),
        config.from_address.as_deref(),
    ) else {
        tracing::warn!("Email is enabled but SMTP settings are incomplete; mail is disabled");
        return None;
    };

    match SmtpMailer::new(host, config.smtp_port.unwrap_or(587), username, password, from) {
        Ok(mailer) => Some(Arc::new(mailer)),
        Err(e) => {
            tracing::warn!("Failed to set up SMTP mailer: {}", e);
            None
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use recording::{RecordingMailer, SentMail};

#[cfg(any(test, feature = "test-utils"))]
mod recording {
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::Mailer;
    use crate::error::Result;

    #[derive(Debug, Clone, PartialEq)]
    pub struct SentMail {
        pub to: String,
        pub subject: String,
        pub body: String,
    }

    /// Keeps every message in memory instead of sending it.
    #[derive(Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<SentMail>>,
    }

    impl RecordingMailer {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn sent(&self) -> Vec<SentMail> {
            self.sent.lock().await.clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
            self.sent.lock().await.push(SentMail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
            Ok(())
        }
    }
}
