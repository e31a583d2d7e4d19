//! Message types and builder.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::BuildError;

/// A file attached to a [`Message`].
///
/// The content is read fully into memory once, at build time. The MIME
/// subtype is the lowercased file extension taken verbatim (a `.pdf` file is
/// sent as `application/pdf`, a `.xyz` file as `application/xyz`); no
/// canonical MIME table is consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Display filename, the base name of the source path.
    pub filename: String,
    /// MIME subtype derived from the file extension; empty when the file has
    /// no extension.
    pub subtype: String,
    /// Raw file content.
    pub content: Vec<u8>,
}

impl Attachment {
    /// Read an attachment from disk.
    ///
    /// Returns `Ok(None)` when the file does not exist; the caller skips it
    /// and keeps building. Any other read failure aborts the build.
    fn from_path(path: &Path) -> Result<Option<Self>, BuildError> {
        match fs::read(path) {
            Ok(content) => {
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "attachment".to_string());
                let subtype = path
                    .extension()
                    .map(|e| e.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                Ok(Some(Self {
                    filename,
                    subtype,
                    content,
                }))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "attachment missing, skipping");
                Ok(None)
            }
            Err(source) => Err(BuildError::Attachment {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

/// The immutable unit of content sent to every recipient in one run.
///
/// Subject, body, and attachments are identical across all recipients; only
/// the `To:` header varies, bound per send by the [`Mailer`](super::Mailer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Subject line; may be empty.
    pub subject: String,
    /// Plain-text body; may be empty.
    pub body: String,
    /// Attachments, in the order they were added.
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Create a new message builder.
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }
}

/// Builder for constructing [`Message`] instances.
///
/// Unlike most mail builders, an empty subject and an empty body are both
/// accepted; bulk notifications are sometimes attachment-only.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    subject: String,
    body: String,
    attachment_paths: Vec<PathBuf>,
}

impl MessageBuilder {
    /// Set the subject line.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Set the plain-text body.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Add an attachment path.
    pub fn attach(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachment_paths.push(path.into());
        self
    }

    /// Add multiple attachment paths.
    pub fn attach_all(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.attachment_paths
            .extend(paths.into_iter().map(Into::into));
        self
    }

    /// Build the message, reading every attachment into memory.
    ///
    /// Missing attachment files are skipped with a warning rather than
    /// failing the build, so partial delivery wins over total failure. The
    /// result is deterministic for identical inputs and filesystem state.
    pub fn build(self) -> Result<Message, BuildError> {
        let mut attachments = Vec::with_capacity(self.attachment_paths.len());
        for path in &self.attachment_paths {
            if let Some(attachment) = Attachment::from_path(path)? {
                attachments.push(attachment);
            }
        }

        Ok(Message {
            subject: self.subject,
            body: self.body,
            attachments,
        })
    }
}
