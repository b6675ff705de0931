use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::MultiPart;
use lettre::transport::smtp::authentication::Credentials;
use lettre::AsyncSmtpTransport;
use lettre::AsyncTransport;
use lettre::Message;
use lettre::Tokio1Executor;

use crate::config::MailConfig;
use crate::domain::notification::errors::MailError;
use crate::domain::notification::ports::MailSender;

/// Mail transport over an authenticated STARTTLS SMTP relay.
pub struct SmtpMailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailSender {
    /// Build the relay transport. No connection is opened until the first send.
    ///
    /// # Arguments
    /// * `config` - SMTP host, port and credentials
    pub fn new(config: &MailConfig) -> Result<Self, anyhow::Error> {
        tracing::info!(
            host = %config.smtp_host,
            port = config.smtp_port,
            "Initializing SMTP transport"
        );

        let credentials =
            Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self { transport })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| MailError::InvalidAddress(format!("{}: {}", address, e)))
}

/// Plain-text alternative of an HTML body: tags dropped, blank lines collapsed.
fn plain_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl MailSender for SmtpMailSender {
    async fn send(
        &self,
        from: &str,
        to: &[String],
        subject: &str,
        html_body: &str,
    ) -> Result<(), MailError> {
        if to.is_empty() {
            return Err(MailError::InvalidAddress("no recipients".to_string()));
        }

        let mut builder = Message::builder()
            .from(parse_mailbox(from)?)
            .subject(subject);
        for recipient in to {
            builder = builder.to(parse_mailbox(recipient)?);
        }

        let message = builder
            .multipart(MultiPart::alternative_plain_html(
                plain_text(html_body),
                html_body.to_string(),
            ))
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map(|response| {
                tracing::debug!(code = %response.code(), recipients = to.len(), "Mail accepted");
            })
            .map_err(|e| MailError::Transport(e.to_string()))
    }
}
