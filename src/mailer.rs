use async_trait::async_trait;
use tracing::info;

/// Email collaborator. The platform only ever sends password-reset mail, so
/// the contract stays minimal; deployments plug in a real transport here.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Default transport: writes the mail to the log. Good enough for local
/// development and keeps the reset flow testable without an SMTP server.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        info!(%to, %subject, %body, "outgoing mail");
        Ok(())
    }
}
