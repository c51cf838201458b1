//! Email service for sending one-time verification codes.
//!
//! Uses SMTP via lettre for delivery with Askama HTML templates.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rand::Rng;
use secrecy::ExposeSecret;
use thiserror::Error;

use clothaura_core::{Email, OtpCode, OtpError};

use crate::config::EmailConfig;

/// Subject line of the verification email.
pub const OTP_SUBJECT: &str = "ClothAura - Email Verification OTP";

/// HTML template for verification code email.
#[derive(Template)]
#[template(path = "email/otp.html")]
struct OtpEmailHtml<'a> {
    code: &'a str,
    valid_minutes: i64,
}

/// Plain text template for verification code email.
#[derive(Template)]
#[template(path = "email/otp.txt")]
struct OtpEmailText<'a> {
    code: &'a str,
    valid_minutes: i64,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Delivers verification codes to shoppers.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `code` to `to`. Resolves only once the message is accepted for
    /// delivery.
    async fn send_otp(&self, to: &Email, code: OtpCode) -> Result<(), EmailError>;
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    valid_minutes: i64,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// `valid_minutes` is quoted in the message body.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, valid_minutes: i64) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            valid_minutes,
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailService {
    async fn send_otp(&self, to: &Email, code: OtpCode) -> Result<(), EmailError> {
        let (html, text) = render_otp(code, self.valid_minutes)?;
        self.send_multipart_email(to.as_str(), OTP_SUBJECT, &text, &html)
            .await
    }
}

/// Render the HTML and plain text bodies of a verification email.
fn render_otp(code: OtpCode, valid_minutes: i64) -> Result<(String, String), EmailError> {
    let code = code.to_string();
    let html = OtpEmailHtml {
        code: &code,
        valid_minutes,
    }
    .render()?;
    let text = OtpEmailText {
        code: &code,
        valid_minutes,
    }
    .render()?;
    Ok((html, text))
}

/// Generate a 6-digit verification code, uniform over `100000..=999999`.
///
/// # Errors
///
/// Never fails in practice; the range is exactly the valid code range.
pub fn generate_verification_code() -> Result<OtpCode, OtpError> {
    let n: u32 = rand::rng().random_range(OtpCode::MIN..=OtpCode::MAX);
    OtpCode::from_number(n)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_verification_code() {
        for _ in 0..200 {
            let code = generate_verification_code().unwrap();
            assert!((OtpCode::MIN..=OtpCode::MAX).contains(&code.as_u32()));
            assert_eq!(code.to_string().len(), 6);
        }
    }

    #[test]
    fn test_rendered_bodies_contain_code() {
        let code = OtpCode::from_number(482_913).unwrap();
        let (html, text) = render_otp(code, 10).unwrap();
        assert!(html.contains("482913"));
        assert!(html.contains("10 minutes"));
        assert!(text.contains("482913"));
    }
}
