use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use tracing::debug;

use crate::services::smtp_mailer::{Mailer, OutgoingMail, Sender};

use super::MailError;

#[derive(Clone)]
pub struct SmtpMailer {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpMailer {
    pub fn new() -> Result<Self, anyhow::Error> {
        let host = std::env::var("SMTP_HOST")?;
        let port: u16 = std::env::var("SMTP_PORT")?.parse()?;

        let disabled_tls = std::env::var("SMTP_TLS_DISABLED")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            == "true";

        let mailer = if disabled_tls {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&host)
                .port(port)
                .build()
        } else {
            let username = std::env::var("SMTP_USERNAME")?;
            let password = std::env::var("SMTP_PASSWORD")?;
            let creds = Credentials::new(username, password);
            let tls = TlsParameters::new(host.clone())?;

            AsyncSmtpTransport::<Tokio1Executor>::relay(&host)?
                .port(port)
                .tls(Tls::Required(tls))
                .credentials(creds)
                .build()
        };

        Ok(Self {
            transport: Arc::new(mailer),
        })
    }
}

fn sender_mailbox(sender: &Sender) -> Result<Mailbox, MailError> {
    let address: Address = sender.address.parse()?;
    Ok(Mailbox::new(sender.name.clone(), address))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_html(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let to: Mailbox = mail.to.parse()?;
        let email = Message::builder()
            .from(sender_mailbox(&mail.from)?)
            .to(to)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(mail.body_html.clone())?;

        self.transport.send(email).await.map(|response| {
            debug!(code = %response.code(), "smtp accepted message");
        })?;
        Ok(())
    }
}
