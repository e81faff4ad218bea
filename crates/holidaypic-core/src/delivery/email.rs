//! Email delivery via SMTP.
//!
//! [`SmtpMailer`] wraps the `lettre` async SMTP transport to send the picture
//! inline in an HTML message. Credentials come from the `[email]` config
//! section, which by default points at `SENDER_EMAIL`, `RECEIVER_EMAIL` and
//! `SENDER_PASSWORD`.

use crate::config::{resolve_env_var, EmailConfig};
use crate::holiday::HolidayRecord;
use async_trait::async_trait;
use lettre::message::header::{ContentDisposition, ContentId, ContentType};
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::Message;

/// Content-ID the HTML body uses to reference the inline picture.
pub const IMAGE_CONTENT_ID: &str = "holiday_image";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// Sender, recipient or password is not configured.
    #[error("Email credential not set: {0}")]
    MissingCredential(&'static str),
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// The daily picture email, before addressing.
#[derive(Debug, Clone)]
pub struct HolidayEmail {
    pub subject: String,
    pub html: String,
    pub image: Vec<u8>,
    pub filename: String,
}

impl HolidayEmail {
    pub fn new(holiday: &HolidayRecord, image: Vec<u8>, filename: &str) -> Self {
        Self {
            subject: holiday.subject(),
            html: holiday_html(&holiday.description),
            image,
            filename: filename.to_string(),
        }
    }

    /// Assemble a `multipart/related` message with the picture inline under
    /// its file name.
    pub fn to_message(&self, from: Mailbox, to: Mailbox) -> Result<Message, EmailError> {
        let image_type =
            ContentType::parse("image/jpeg").map_err(|e| EmailError::Build(e.to_string()))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(self.subject.clone())
            .multipart(
                MultiPart::related()
                    .singlepart(SinglePart::html(self.html.clone()))
                    .singlepart(
                        SinglePart::builder()
                            .header(image_type)
                            .header(ContentDisposition::inline_with_name(&self.filename))
                            .header(ContentId::from(format!("<{IMAGE_CONTENT_ID}>")))
                            .body(self.image.clone()),
                    ),
            )
            .map_err(|e| EmailError::Build(e.to_string()))
    }
}

/// HTML body: the description as a heading above the inline picture.
pub fn holiday_html(description: &str) -> String {
    format!(
        r#"<html>
  <body>
    <h2 style="font-family: sans-serif; font-size: 18px; font-weight: bold; color: #333;">{}</h2>
    <img src="cid:{IMAGE_CONTENT_ID}" alt="Holiday Image" style="max-width: 100%;">
  </body>
</html>
"#,
        html_escape::encode_quoted_attribute(description)
    )
}

// ---------------------------------------------------------------------------
// Mailer
// ---------------------------------------------------------------------------

/// Something that can deliver the daily email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &HolidayEmail) -> Result<(), EmailError>;
}

/// Sends over SMTP with STARTTLS and password authentication.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    host: String,
    port: u16,
    sender: Option<String>,
    receiver: Option<String>,
    password: Option<String>,
}

impl SmtpMailer {
    /// Resolve addresses and password from config. Missing values are
    /// reported when sending, not here.
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            sender: resolve_env_var(&config.sender_email),
            receiver: resolve_env_var(&config.receiver_email),
            password: resolve_env_var(&config.sender_password),
        }
    }

    fn addresses(&self) -> Result<(Mailbox, Mailbox), EmailError> {
        let sender = self
            .sender
            .as_deref()
            .ok_or(EmailError::MissingCredential("sender email"))?;
        let receiver = self
            .receiver
            .as_deref()
            .ok_or(EmailError::MissingCredential("receiver email"))?;
        Ok((sender.parse()?, receiver.parse()?))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &HolidayEmail) -> Result<(), EmailError> {
        use lettre::{
            transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport,
            Tokio1Executor,
        };

        let (from, to) = self.addresses()?;
        let password = self
            .password
            .clone()
            .ok_or(EmailError::MissingCredential("sender password"))?;
        let message = email.to_message(from.clone(), to.clone())?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)?
            .port(self.port)
            .credentials(Credentials::new(from.email.to_string(), password))
            .build();
        mailer.send(message).await?;

        tracing::info!(to = %to, subject = %email.subject, "Holiday email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
