//! Digest delivery.
//!
//! The pipeline hands a finished digest to a `Notifier`; delivery failure is
//! reported to the caller, which logs it and keeps the run successful —
//! postings were already persisted by the time anything is sent.

use crate::config::MailConfig;
use crate::digest::{self, Digest};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

pub const SMTP_USERNAME_ENV: &str = "SMTP_USERNAME";
pub const SMTP_PASSWORD_ENV: &str = "SMTP_PASSWORD";

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Mail configuration error: {0}")]
    Config(String),

    #[error("Mail transport error: {0}")]
    Transport(String),
}

pub trait Notifier: Send + Sync {
    /// Deliver the digest; returns a transport confirmation for logging.
    fn send(&self, digest: &Digest) -> Result<String, DeliveryError>;
}

/// Sends the digest as an HTML email over SMTP (STARTTLS).
/// Credentials come from `SMTP_USERNAME`/`SMTP_PASSWORD`; host, port and
/// addresses from the mail config. Nothing is ever hard-coded here.
pub struct SmtpNotifier {
    config: MailConfig,
}

impl SmtpNotifier {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, digest: &Digest) -> Result<String, DeliveryError> {
        let html = digest::render_html(digest);

        let message = Message::builder()
            .from(
                self.config
                    .from
                    .parse()
                    .map_err(|e| DeliveryError::Config(format!("bad from address: {e}")))?,
            )
            .to(self
                .config
                .to
                .parse()
                .map_err(|e| DeliveryError::Config(format!("bad to address: {e}")))?)
            .subject(&self.config.subject)
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|e| DeliveryError::Config(e.to_string()))?;

        let mut mailer = SmtpTransport::starttls_relay(&self.config.smtp_host)
            .map_err(|e| DeliveryError::Config(e.to_string()))?
            .port(self.config.smtp_port);

        match (
            std::env::var(SMTP_USERNAME_ENV),
            std::env::var(SMTP_PASSWORD_ENV),
        ) {
            (Ok(username), Ok(password)) => {
                mailer = mailer.credentials(Credentials::new(username, password));
            }
            _ => {
                log::warn!(
                    "{SMTP_USERNAME_ENV}/{SMTP_PASSWORD_ENV} not set, sending unauthenticated"
                );
            }
        }

        let response = mailer
            .build()
            .send(&message)
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        Ok(response.message().collect::<Vec<_>>().join(" "))
    }
}

/// Prints the digest instead of emailing it (`evaluate --dry-run`).
pub struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn send(&self, digest: &Digest) -> Result<String, DeliveryError> {
        for entry in &digest.entries {
            let posting = &entry.posting;
            println!("## {} — {} ({})", posting.title, posting.company, posting.location);
            println!("{}", posting.url);
            if !entry.feedback.is_empty() {
                println!("feedback: {}", entry.feedback);
            }
            println!();
        }

        Ok(format!("printed {} postings", digest.len()))
    }
}
