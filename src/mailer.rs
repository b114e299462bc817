use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP authentication failed. Check email credentials.")]
    Authentication,
    #[error("SMTP connection failed. Check network or SMTP settings.")]
    Connection,
    #[error("Invalid email address: {0}")]
    Address(String),
    #[error("Email sending failed: {0}")]
    Send(String),
}

/// Outbound SMTP mail for verification codes.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| MailError::Send(e.to_string()))?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        let from = config
            .from_address
            .parse()
            .map_err(|_| MailError::Address(config.from_address.clone()))?;

        Ok(Mailer { transport, from })
    }

    pub async fn send_otp(&self, to: &str, otp: &str) -> Result<(), MailError> {
        let recipient: Mailbox = to
            .parse()
            .map_err(|_| MailError::Address(to.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject("Your OTP for Planit Email Verification")
            .body(format!(
                "Your OTP is: {}\nThis OTP is valid for 5 minutes.",
                otp
            ))
            .map_err(|e| MailError::Send(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| classify_smtp_error(&e.to_string()))
    }
}

/// Splits SMTP failures into the two cases callers report differently:
/// bad credentials versus an unreachable server.
fn classify_smtp_error(text: &str) -> MailError {
    let lower = text.to_lowercase();
    if lower.contains("auth") {
        MailError::Authentication
    } else if lower.contains("connection") || lower.contains("connect") || lower.contains("timed out")
    {
        MailError::Connection
    } else {
        MailError::Send(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_map_to_authentication() {
        assert!(matches!(
            classify_smtp_error("535 5.7.8 Authentication credentials invalid"),
            MailError::Authentication
        ));
    }

    #[test]
    fn network_failures_map_to_connection() {
        assert!(matches!(
            classify_smtp_error("Connection refused (os error 111)"),
            MailError::Connection
        ));
        assert!(matches!(
            classify_smtp_error("connect timed out"),
            MailError::Connection
        ));
    }

    #[test]
    fn other_failures_keep_the_message() {
        match classify_smtp_error("550 mailbox unavailable") {
            MailError::Send(msg) => assert_eq!(msg, "550 mailbox unavailable"),
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
