use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;

pub const APPROVAL_SUBJECT: &str = "Your Account Has Been Approved!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: Mailbox,
    skip_send: bool,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let transport = if config.username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .build()
        } else {
            let creds = Credentials::new(config.username.clone(), config.password.clone());
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
                .port(config.port)
                .credentials(creds)
                .build()
        };

        Ok(Self {
            transport,
            from_address: config.from_address.parse()?,
            skip_send: config.skip_send,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        if self.skip_send {
            tracing::debug!(to = %email.to, subject = %email.subject, "SMTP_SKIP_SEND set, not sending");
            return Ok(());
        }

        let message = Message::builder()
            .from(self.from_address.clone())
            .to(email.to.parse()?)
            .subject(email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html_body)?;

        self.transport.send(message).await?;
        Ok(())
    }
}

/// Builds the account-approval notice for a newly approved resident.
pub fn approval_email(to_email: &str, user_name: &str) -> OutgoingEmail {
    let html_body = format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <style>
    body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
    .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
    .header {{ background-color: #0A4D68; color: white; padding: 30px; text-align: center; border-radius: 8px 8px 0 0; }}
    .content {{ background-color: #f9f9f9; padding: 30px; border-radius: 0 0 8px 8px; }}
  </style>
</head>
<body>
  <div class="container">
    <div class="header">
      <h1>Account Approved!</h1>
    </div>
    <div class="content">
      <p>Hi <strong>{}</strong>,</p>
      <p>Your account has been approved by our admin team.</p>
      <p>You can now log in and start using our services.</p>
      <p>Best regards,<br><strong>The Team</strong></p>
    </div>
  </div>
</body>
</html>
"#,
        escape_html(user_name)
    );

    OutgoingEmail {
        to: to_email.to_string(),
        subject: APPROVAL_SUBJECT.to_string(),
        html_body,
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp_config(skip_send: bool) -> SmtpConfig {
        SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            username: String::new(),
            password: String::new(),
            from_address: "Barangay Reports <noreply@example.com>".to_string(),
            skip_send,
        }
    }

    #[test]
    fn approval_email_greets_the_user_by_name() {
        let email = approval_email("juan@example.com", "Juan dela Cruz");
        assert_eq!(email.to, "juan@example.com");
        assert_eq!(email.subject, APPROVAL_SUBJECT);
        assert!(email
            .html_body
            .contains("<p>Hi <strong>Juan dela Cruz</strong>,</p>"));
    }

    #[test]
    fn approval_email_escapes_markup_in_names() {
        let email = approval_email("x@example.com", "<script>alert('x')</script>");
        assert!(!email.html_body.contains("<script>"));
        assert!(email.html_body.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn smtp_mailer_rejects_invalid_sender() {
        let mut config = smtp_config(true);
        config.from_address = "not an address".to_string();
        assert!(matches!(SmtpMailer::new(&config), Err(MailError::Address(_))));
    }

    #[tokio::test]
    async fn smtp_mailer_skip_send_short_circuits() {
        let mailer = SmtpMailer::new(&smtp_config(true)).expect("mailer");
        mailer
            .send(approval_email("juan@example.com", "Juan"))
            .await
            .expect("skipped send succeeds");
    }
}
