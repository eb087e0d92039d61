//! Outgoing mail for the contact form.

use async_trait::async_trait;
use log::info;
use serde::Serialize;
use thiserror::Error;

/// A single message handed to a relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    pub to: String,
    pub from: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub body: String,
}

/// Errors raised by mail relays.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail relay unavailable: {0}")]
    Unavailable(String),
}

/// Delivery backend for contact form mail.
#[async_trait]
pub trait MailRelay: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Relay that writes each message to the log instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailRelay;

#[async_trait]
impl MailRelay for LogMailRelay {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        info!(
            "mail relayed (to={}, from={}, subject={})",
            mail.to, mail.from, mail.subject
        );
        Ok(())
    }
}
