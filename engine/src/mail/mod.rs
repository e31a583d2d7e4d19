//! Message assembly and SMTP delivery.
//!
//! This module provides a thin abstraction over [lettre](https://lettre.rs) with
//! environment-based configuration: build one [`Message`] from subject, body, and
//! attachment paths, then deliver it to each recipient of a run through a
//! [`Mailer`].
//!
//! # Quick Start
//!
//! ```ignore
//! // 1. Initialize mailer from environment
//! let mailer = SmtpMailer::from_env()?;
//!
//! // 2. Build the message once
//! let message = Message::builder()
//!     .subject("Quarterly report")
//!     .body("Please find the report attached.")
//!     .attach("report.pdf")
//!     .build()?;
//!
//! // 3. Deliver it to every recipient
//! let summary = DispatchRun::new(&mailer, &message)
//!     .execute(&recipients)
//!     .await;
//! println!("{summary}");
//! ```
//!
//! # Environment Variables
//!
//! The [`SmtpMailer::from_env`] method reads:
//!
//! | Variable | Required | Description |
//! |----------|----------|-------------|
//! | `SMTP_HOST` | Yes | SMTP server hostname |
//! | `SMTP_PORT` | No | Port (default: 587) |
//! | `SMTP_USERNAME` | No | Username for authentication |
//! | `SMTP_PASSWORD` | No | Password for authentication |
//! | `SMTP_FROM` | Yes | Sender address |
//! | `SMTP_TLS` | No | `starttls` (default), `tls`, or `none` |
//! | `SMTP_TIMEOUT` | No | Connect/send timeout in seconds (default: 10) |
//!
//! # Failure model
//!
//! A failed delivery is reported once and never retried, neither within a run
//! nor carried over to the next scheduled firing. Failed addresses are simply
//! attempted again as part of the next full run, if one fires.

mod dispatch;
mod mailer;
mod message;

pub use dispatch::{DeliveryOutcome, DispatchRun, RunSummary};
pub use mailer::{Mailer, SmtpConfig, SmtpMailer};
pub use message::{Attachment, Message, MessageBuilder};

use thiserror::Error;

/// Message assembly failure.
///
/// A missing attachment file is *not* a build error: it is skipped with a
/// logged warning so the remaining attachments still go out. Only I/O failures
/// other than missing-file (permission denial, truncated reads) abort the
/// build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to read attachment {path}: {source}")]
    Attachment {
        path: String,
        source: std::io::Error,
    },
}

/// Mailer construction failure.
#[derive(Debug, Error)]
pub enum MailerError {
    #[error("missing required config: {0}")]
    MissingConfig(String),

    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// Per-delivery failure.
///
/// Every variant is recovered at the per-recipient level by [`DispatchRun`]:
/// the failure is tallied and the run continues. The exception is a
/// [`DeliverError::Connect`] returned by [`SmtpMailer::probe`] before the
/// first delivery, which fails the whole run since no recipient can be
/// reached.
#[derive(Debug, Error)]
pub enum DeliverError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("connection to mail server failed: {0}")]
    Connect(String),

    #[error("message rejected by server: {0}")]
    Rejected(String),

    #[error("failed to assemble message: {0}")]
    Assemble(String),
}

impl From<lettre::transport::smtp::Error> for DeliverError {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        // A permanent or transient code means the server answered; anything
        // else never got a usable session (TCP, TLS, or auth handshake).
        if e.is_permanent() || e.is_transient() {
            Self::Rejected(e.to_string())
        } else {
            Self::Connect(e.to_string())
        }
    }
}
