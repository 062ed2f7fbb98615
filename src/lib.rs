//! # MogiSend
//!
//! MogiSend is a minimal, blocking SMTP submission client.
//!
//! It opens one connection to a relay, walks through a single mail
//! transaction and closes the connection again.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mogisend::{EmailMessage, SmtpConfig, SubmitError, send_email};
//!
//! let config = SmtpConfig::new("127.0.0.1", 25);
//! let message = EmailMessage::new("sender@example.com", "recipient@example.com")
//!     .with_cc(mogisend::parse_cc_list("a@example.com, b@example.com"))
//!     .with_subject("Hi")
//!     .with_body("Hello");
//!
//! match send_email(&config, &message) {
//!     Ok(()) => println!("sent"),
//!     Err(SubmitError::InvalidAddress(address)) => eprintln!("rejected: {address}"),
//!     Err(e) => eprintln!("{}", e.user_message()),
//! }
//! ```
//!
//! ## Conversation
//!
//! 1. Read the greeting (`220` expected)
//! 2. `HELO <host>` (`250` expected)
//! 3. `MAIL FROM:<sender>` (`250` expected)
//! 4. `RCPT TO:<recipient>`, then one `RCPT TO` per CC (`250` expected each)
//! 5. `DATA` and the envelope, terminated by a lone `.` (`250` expected)
//! 6. `QUIT` (reply logged, never checked)
//!
//! The first unexpected reply aborts the send. The connection is released on
//! every path, success or failure.
//!
//! ## Errors
//!
//! Every failure is a [`SubmitError`] variant, so callers can `match` on the
//! kind directly:
//!
//! - `Connection` - relay unreachable, or greeting/HELO refused or cut off
//! - `InvalidAddress` - the relay refused the sender, recipient or a CC
//! - `Delivery` - the relay refused the message itself
//! - `MalformedResponse` - a reply line did not start with a numeric code
//! - `Configuration` - bad input detected before connecting, such as a
//!   line break in an address or the subject
//!
//! ## Notes
//!
//! - No authentication and no TLS.
//! - Attachments are not MIME encoded. By default they are skipped; see
//!   [`AttachmentMode`].
//! - Reads block without a deadline unless [`SmtpConfig::with_read_timeout`]
//!   is used.

mod smtp;

pub use smtp::attachment::{AttachmentMode, stream_file};
pub use smtp::input::{parse_cc_list, parse_port};
pub use smtp::{
    Channel, EmailMessage, ReplyCode, ResponseLine, Result, SmtpConfig, SmtpSession, SmtpState,
    SubmitError, Transport, parse_code, send_email,
};
