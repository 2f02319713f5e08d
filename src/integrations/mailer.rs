use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()>;
}

/// Mailer that records outgoing mail in the log instead of talking to SMTP.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()> {
        let preview: String = email.body.chars().take(60).collect();
        info!(
            from = %self.from,
            to = %email.to,
            subject = %email.subject,
            preview = %preview,
            "email dispatched"
        );
        Ok(())
    }
}

/// Sends on a background task; failures are logged, never propagated.
pub fn send_email_async(mailer: Arc<dyn Mailer>, email: OutgoingEmail) {
    tokio::spawn(async move {
        let to = email.to.clone();
        if let Err(err) = mailer.send(email).await {
            warn!(error = %err, %to, "email delivery failed");
        }
    });
}
