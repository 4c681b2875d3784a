use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::debug;

use crate::config::Config;
use crate::errors::{WatcherError, WatcherResult};
use crate::notifier::traits::Notifier;

/// Port that speaks TLS from the first byte; every other port upgrades with STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

pub struct SmtpNotifier {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &Config) -> WatcherResult<Self> {
        let smtp = &config.smtp;

        let builder = if smtp.port == IMPLICIT_TLS_PORT {
            SmtpTransport::relay(&smtp.host)
        } else {
            SmtpTransport::starttls_relay(&smtp.host)
        }
        .map_err(|e| WatcherError::Config(format!("SMTP_HOST '{}': {}", smtp.host, e)))?;

        let transport = builder
            .port(smtp.port)
            .credentials(Credentials::new(
                smtp.username.clone(),
                smtp.password.clone(),
            ))
            .build();

        let from = config
            .email_from
            .parse::<Mailbox>()
            .map_err(|e| WatcherError::Config(format!("EMAIL_FROM: {}", e)))?;

        Ok(Self { transport, from })
    }

    fn build_message(&self, subject: &str, body: &str, recipients: &[String]) -> WatcherResult<Message> {
        build_message(self.from.clone(), subject, body, recipients)
    }
}

fn parse_mailbox(address: &str) -> WatcherResult<Mailbox> {
    address
        .parse::<Mailbox>()
        .map_err(|e| WatcherError::Notification(format!("invalid address '{}': {}", address, e)))
}

fn build_message(
    from: Mailbox,
    subject: &str,
    body: &str,
    recipients: &[String],
) -> WatcherResult<Message> {
    if recipients.is_empty() {
        return Err(WatcherError::Notification("no recipients".to_string()));
    }

    let mut builder = Message::builder().from(from).subject(subject);
    for recipient in recipients {
        builder = builder.to(parse_mailbox(recipient)?);
    }

    Ok(builder
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())?)
}

impl Notifier for SmtpNotifier {
    fn send(&self, subject: &str, body: &str, recipients: &[String]) -> WatcherResult<()> {
        let message = self.build_message(subject, body, recipients)?;
        self.transport.send(&message)?;
        debug!(recipients = recipients.len(), subject, "email sent");
        Ok(())
    }
}
