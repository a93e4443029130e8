//! # mailflow-adapter-virtual
//!
//! Virtual message delivery for development and testing. Nothing leaves the
//! process: every accepted message is logged and kept in an in-memory outbox.
//!
//! | Knob | Behaviour |
//! |------|-----------|
//! | bounce list | sends to these addresses fail with a delivery error |
//! | latency | every send sleeps this long before completing |
//!
//! ## Dependency rule
//!
//! Depends on `mailflow-app` (port traits) and `mailflow-domain` only.

mod outbox;

use std::collections::HashSet;
use std::time::Duration;

use mailflow_app::ports::MessageSender;
use mailflow_domain::error::DeliveryError;

pub use outbox::{Outbox, SentMessage};

/// Errors raised by the virtual mailer.
#[derive(Debug, thiserror::Error)]
pub enum VirtualMailerError {
    /// The recipient is on the configured bounce list.
    #[error("recipient {0} bounced")]
    Bounced(String),

    /// The recipient address is blank.
    #[error("recipient address is empty")]
    EmptyRecipient,
}

impl From<VirtualMailerError> for DeliveryError {
    fn from(err: VirtualMailerError) -> Self {
        DeliveryError::new(err.to_string())
    }
}

/// [`MessageSender`] that records messages instead of delivering them.
#[derive(Default)]
pub struct VirtualMailer {
    outbox: Outbox,
    bounce: HashSet<String>,
    latency: Option<Duration>,
}

impl VirtualMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every send to one of `addresses`. Comparison ignores case.
    #[must_use]
    pub fn with_bounces(mut self, addresses: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.bounce = addresses
            .into_iter()
            .map(|a| a.as_ref().trim().to_ascii_lowercase())
            .collect();
        self
    }

    /// Delay every send, e.g. to exercise delivery timeouts.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Messages accepted so far.
    #[must_use]
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    fn accept(&self, to: &str, subject: &str, body: &str) -> Result<(), VirtualMailerError> {
        let recipient = to.trim();
        if recipient.is_empty() {
            return Err(VirtualMailerError::EmptyRecipient);
        }
        if self.bounce.contains(&recipient.to_ascii_lowercase()) {
            return Err(VirtualMailerError::Bounced(recipient.to_string()));
        }
        self.outbox.push(SentMessage::new(recipient, subject, body));
        Ok(())
    }
}

impl MessageSender for VirtualMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.accept(to, subject, body) {
            Ok(()) => {
                tracing::info!(%to, %subject, "virtual message delivered");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%to, %subject, error = %err, "virtual message rejected");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_record_delivered_message() {
        let mailer = VirtualMailer::new();

        mailer
            .send("ada@example.com", "Welcome", "<p>Hi</p>")
            .await
            .unwrap();

        let sent = mailer.outbox().messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ada@example.com");
        assert_eq!(sent[0].subject, "Welcome");
        assert_eq!(sent[0].body, "<p>Hi</p>");
    }

    #[tokio::test]
    async fn should_bounce_listed_address_ignoring_case() {
        let mailer = VirtualMailer::new().with_bounces(["Bounce@Example.com"]);

        let err = mailer
            .send("bounce@example.com", "Welcome", "")
            .await
            .unwrap_err();

        assert!(err.reason.contains("bounced"));
        assert!(mailer.outbox().is_empty());
    }

    #[tokio::test]
    async fn should_reject_blank_recipient() {
        let mailer = VirtualMailer::new();
        let result = mailer.send("  ", "Welcome", "").await;
        assert!(result.is_err());
        assert!(mailer.outbox().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_wait_for_configured_latency() {
        let mailer = VirtualMailer::new().with_latency(Duration::from_secs(5));
        let started = tokio::time::Instant::now();

        mailer.send("ada@example.com", "Slow", "").await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
