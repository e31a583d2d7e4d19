//! Bulk-mail dispatch engine.
//!
//! Given a recipient list, a message body, and optional attachments, deliver
//! an identical message to every recipient over an authenticated SMTP
//! session, immediately or daily at a configured local time, while tracking
//! the per-recipient outcome.
//!
//! ```ignore
//! let recipients = mailfan::read_recipients(Path::new("list.csv"))?;
//! let message = Message::builder()
//!     .subject("Maintenance window")
//!     .body("We will be offline Saturday 02:00-04:00 UTC.")
//!     .attach("calendar.ics")
//!     .build()?;
//! let mailer = SmtpMailer::from_env()?;
//!
//! let run = DispatchRun::new(&mailer, &message);
//! let summary = run.execute(&recipients).await;
//! println!("{summary}");
//! ```
//!
//! Delivery performs no retries; see the [`mail`] module docs for the
//! failure model, and [`schedule`] for the recurring-daily mode.

pub mod mail;
pub mod schedule;
pub mod source;

pub use mail::{
    Attachment, BuildError, DeliverError, DeliveryOutcome, DispatchRun, Mailer, MailerError,
    Message, MessageBuilder, RunSummary, SmtpConfig, SmtpMailer,
};
pub use schedule::{
    run_once, Clock, ScheduleError, ScheduleSpec, Scheduler, StopHandle, SystemClock,
};
pub use source::{read_recipients, SourceError};
