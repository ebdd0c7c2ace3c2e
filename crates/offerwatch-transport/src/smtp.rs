//! SMTP transport — STARTTLS mail submission via lettre.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use offerwatch_core::config::SmtpConfig;
use offerwatch_core::{OfferwatchError, Result, Transport};

use crate::{build_message, from_mailbox};

/// Sends through an authenticated SMTP relay (STARTTLS submission).
#[derive(Debug)]
pub struct SmtpTransport {
    from: Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    /// Validate the From address and build the relay up front, so a bad
    /// configuration fails at startup instead of on the first candidate.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from = from_mailbox(config.display_name.as_deref(), config.sender())?;
        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| OfferwatchError::Transport(format!("SMTP relay {}: {e}", config.host)))?
            .port(config.port)
            .credentials(creds)
            .build();
        Ok(Self { from, mailer })
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let email = build_message(&self.from, to, subject, body)?;
        self.mailer
            .send(email)
            .await
            .map_err(|e| OfferwatchError::Transport(format!("SMTP send: {e}")))?;
        tracing::info!("📤 Email handed to relay for {to}");
        Ok(())
    }
}
