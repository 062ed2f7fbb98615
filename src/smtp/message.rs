//! Outgoing message and envelope composition

use crate::smtp::error::{Result, SubmitError};

use chrono::NaiveDateTime;
use std::path::PathBuf;

/// Format of the `Date:` header value
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A message to hand to the relay.
///
/// Owned by the caller and only borrowed for the duration of a send.
#[derive(Debug, Clone, Default)]
pub struct EmailMessage {
    /// The sender's email address
    pub sender: String,

    /// The primary recipient's email address
    pub recipient: String,

    /// Carbon-copy addresses, in the order they are declared to the relay
    pub cc: Vec<String>,

    pub subject: String,

    pub body: String,

    /// Files to attach. See [`crate::AttachmentMode`] for how these are handled.
    pub attachments: Vec<PathBuf>,
}

impl EmailMessage {
    /// Create a message with a sender and a primary recipient
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            ..Self::default()
        }
    }

    pub fn with_cc<I, T>(mut self, cc: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.cc = cc.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_attachments<I, T>(mut self, attachments: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<PathBuf>,
    {
        self.attachments = attachments.into_iter().map(Into::into).collect();
        self
    }

    /// Check the sender and the recipient are present and that no address
    /// or header value spans more than one line
    pub fn validate(&self) -> Result<()> {
        if self.sender.trim().is_empty() {
            return Err(SubmitError::Configuration(
                "Sender address cannot be empty".to_string(),
            ));
        }
        if self.recipient.trim().is_empty() {
            return Err(SubmitError::Configuration(
                "Recipient address cannot be empty".to_string(),
            ));
        }

        single_line("Sender address", &self.sender)?;
        single_line("Recipient address", &self.recipient)?;
        for address in &self.cc {
            single_line("CC address", address)?;
        }
        single_line("Subject", &self.subject)
    }

    /// Build the DATA block: headers, a blank line, the body and the
    /// terminator line.
    ///
    /// Body lines are dot-stuffed so the body can never end the block early.
    pub fn envelope_lines(&self, cc_header: &str, date: NaiveDateTime) -> Vec<String> {
        let mut lines = vec![
            format!("From: {}", self.sender.trim()),
            format!("To: {}", self.recipient.trim()),
            format!("Cc: {cc_header}"),
            format!("Date: {}", date.format(DATE_FORMAT)),
            format!("Subject: {}", self.subject),
            String::new(),
        ];

        lines.extend(self.body.lines().map(|line| {
            if line.starts_with('.') {
                format!(".{line}")
            } else {
                line.to_owned()
            }
        }));

        lines.push(".".to_owned());
        lines
    }
}

/// Reject values that would break out of their command or header line
pub(crate) fn single_line(field: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(SubmitError::Configuration(format!(
            "{field} cannot contain line breaks"
        )));
    }
    Ok(())
}
