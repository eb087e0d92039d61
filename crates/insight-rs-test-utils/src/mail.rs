use async_trait::async_trait;
use insight_rs_server::{MailError, MailRelay, OutgoingMail};
use parking_lot::Mutex;

/// Mail relay that records outgoing mail, or refuses it.
#[derive(Debug, Default)]
pub struct StubMailRelay {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
}

impl StubMailRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relay whose every send fails.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl MailRelay for StubMailRelay {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Unavailable("stub relay refused".to_string()));
        }
        self.sent.lock().push(mail);
        Ok(())
    }
}
