use crate::services::smtp_mailer::{MailError, Mailer, OutgoingMail};
use async_trait::async_trait;
use std::sync::Mutex;

/// A mock mailer that records sent emails for testing purposes.
#[derive(Debug, Default)]
pub struct MockMailer {
    pub sent: Mutex<Vec<OutgoingMail>>,
    pub fail_send: bool,
}

impl MockMailer {
    pub fn failing() -> Self {
        Self {
            fail_send: true,
            ..Self::default()
        }
    }

    pub fn sent_mails(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_html(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::SendError("mock failure".into()));
        }
        self.sent
            .lock()
            .map_err(|_| MailError::Other("mock mailer lock poisoned".into()))?
            .push(mail.clone());
        Ok(())
    }
}
