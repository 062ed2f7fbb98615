//! SMTP submission client

pub mod attachment;
pub mod command;
pub mod error;
pub mod input;
pub mod message;
pub mod response;
pub mod session;
pub mod transport;

pub use attachment::AttachmentMode;
pub use error::{ReplyCode, Result, SubmitError};
pub use message::EmailMessage;
pub use response::{ResponseLine, parse_code};
pub use session::{SmtpConfig, SmtpSession, SmtpState, send_email};
pub use transport::{Channel, Transport};
