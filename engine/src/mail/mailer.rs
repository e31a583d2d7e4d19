//! Mailer trait and SMTP implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message as WireMessage, Tokio1Executor};
use serde::Deserialize;

use super::{DeliverError, MailerError, Message};

/// Async delivery trait.
///
/// Implement this trait to provide alternative transport backends, or a
/// recording fake for tests. A failure delivering to one recipient must not
/// poison the mailer for subsequent recipients: the caller decides whether to
/// continue, so every call returns its own `Result`.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    /// Deliver `message` to a single recipient, binding `recipient` into the
    /// `To:` field.
    async fn deliver(&self, message: &Message, recipient: &str) -> Result<(), DeliverError>;
}

/// Configuration for the SMTP mailer.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    /// SMTP server hostname.
    #[serde(rename = "smtp_host")]
    pub host: String,

    /// SMTP server port (default: 587).
    #[serde(rename = "smtp_port", default = "default_port")]
    pub port: u16,

    /// SMTP username for authentication.
    #[serde(rename = "smtp_username")]
    pub username: Option<String>,

    /// SMTP password for authentication. Never logged.
    #[serde(rename = "smtp_password")]
    pub password: Option<String>,

    /// Sender address, bound into `From:` on every delivery.
    #[serde(rename = "smtp_from")]
    pub from: String,

    /// TLS mode: "starttls" (default), "tls", or "none".
    #[serde(rename = "smtp_tls", default = "default_tls")]
    pub tls: String,

    /// Connect/send timeout in seconds (default: 10). Bounds how long one
    /// slow delivery can hold up the rest of the run.
    #[serde(rename = "smtp_timeout", default = "default_timeout")]
    pub timeout: u64,
}

fn default_port() -> u16 {
    587
}

fn default_tls() -> String {
    "starttls".to_string()
}

fn default_timeout() -> u64 {
    10
}

/// SMTP-based mailer using lettre.
///
/// Holds one shared transport with pooled connections for the lifetime of the
/// process instead of a full connect/auth/quit cycle per recipient. Failure
/// isolation is unchanged: each [`deliver`](Mailer::deliver) returns its own
/// `Result`. Callers that want a connect failure to fail a whole run up front
/// call [`probe`](SmtpMailer::probe) first.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create a mailer from environment variables.
    ///
    /// Reads `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`,
    /// `SMTP_FROM`, `SMTP_TLS`, `SMTP_TIMEOUT`.
    pub fn from_env() -> Result<Self, MailerError> {
        dotenvy::dotenv().ok();

        let config: SmtpConfig =
            serde_env::from_env().map_err(|e| MailerError::MissingConfig(e.to_string()))?;

        Self::from_config(config)
    }

    /// Create a mailer from explicit configuration.
    pub fn from_config(config: SmtpConfig) -> Result<Self, MailerError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|_| MailerError::InvalidAddress(config.from.clone()))?;

        let mut builder = match config.tls.as_str() {
            "none" => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
            "tls" => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailerError::Smtp(e.to_string()))?,
            _ => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailerError::Smtp(e.to_string()))?,
        };

        builder = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout)));

        if let (Some(username), Some(password)) = (config.username, config.password) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        let transport = builder.build();

        Ok(Self {
            transport: Arc::new(transport),
            from,
        })
    }

    /// Check that the server is reachable and accepts a session.
    ///
    /// With a shared transport there is no per-recipient connect step, so a
    /// dead endpoint would otherwise surface as one failure per recipient.
    /// Run this before the first delivery of a run and treat a failure as
    /// fatal to the whole run.
    pub async fn probe(&self) -> Result<(), DeliverError> {
        let reachable = self.transport.test_connection().await?;
        if !reachable {
            return Err(DeliverError::Connect(
                "server did not accept a session".to_string(),
            ));
        }
        Ok(())
    }

    /// Serialize headers, body part, and attachment parts for one recipient.
    fn build_wire(&self, message: &Message, recipient: &str) -> Result<WireMessage, DeliverError> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|_| DeliverError::InvalidAddress(recipient.to_string()))?;

        let builder = WireMessage::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone());

        let wire = if message.attachments.is_empty() {
            builder.body(message.body.clone())
        } else {
            let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(message.body.clone()));
            for attachment in &message.attachments {
                parts = parts.singlepart(
                    Attachment::new(attachment.filename.clone())
                        .body(attachment.content.clone(), content_type(&attachment.subtype)),
                );
            }
            builder.multipart(parts)
        };

        wire.map_err(|e| DeliverError::Assemble(e.to_string()))
    }
}

/// `application/<subtype>` from the raw extension, falling back to
/// octet-stream when the extension is absent or not a legal MIME token.
fn content_type(subtype: &str) -> ContentType {
    ContentType::parse(&format!("application/{subtype}"))
        .unwrap_or_else(|_| ContentType::parse("application/octet-stream").expect("static mime"))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn deliver(&self, message: &Message, recipient: &str) -> Result<(), DeliverError> {
        let wire = self.build_wire(message, recipient)?;

        self.transport.send(wire).await?;

        Ok(())
    }
}
