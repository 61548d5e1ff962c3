use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;
use triplicity_core::notify::{Email, Notifier};
use triplicity_core::BoxError;
use triplicity_shared::pii::redact_email;

use crate::app_config::MailConfig;

/// Delivers plain-text mail through an SMTP relay.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &MailConfig) -> Result<Self, BoxError> {
        let host = config
            .host
            .as_deref()
            .ok_or("mail.host is required for the smtp transport")?;

        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };
        builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose().clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from.parse()?,
        })
    }

    pub fn build_message(&self, email: &Email) -> Result<Message, BoxError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.recipient().parse()?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())?;
        Ok(message)
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, email: &Email) -> Result<(), BoxError> {
        let message = self.build_message(email)?;
        self.transport.send(message).await?;
        debug!("SMTP accepted '{}' for {}", email.subject, redact_email(email.recipient()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::MailTransport;

    fn config() -> MailConfig {
        MailConfig {
            transport: MailTransport::Smtp,
            host: Some("localhost".to_string()),
            port: 2525,
            starttls: false,
            username: None,
            password: None,
            from: "Triplicity <no-reply@triplicity.test>".to_string(),
        }
    }

    // The pooled transport spawns its idle reaper on the tokio runtime
    #[tokio::test]
    async fn test_build_message() {
        let notifier = SmtpNotifier::new(&config()).unwrap();
        let message = notifier
            .build_message(&Email::new(
                "anita@example.com",
                "Your Triplicity Booking #42 is Confirmed!",
                "Dear Anita Desai,",
            ))
            .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: anita@example.com"));
        assert!(raw.contains("Subject: Your Triplicity Booking #42 is Confirmed!"));
        assert!(raw.contains("Content-Type: text/plain"));
    }

    #[tokio::test]
    async fn test_requires_host_and_valid_addresses() {
        let mut missing_host = config();
        missing_host.host = None;
        assert!(SmtpNotifier::new(&missing_host).is_err());

        let notifier = SmtpNotifier::new(&config()).unwrap();
        assert!(notifier
            .build_message(&Email::new("not an address", "Hi", "Body"))
            .is_err());
    }
}
