//! Error types for the SMTP client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Could not establish connection: {0}")]
    Connection(String),

    #[error("Invalid email address '{0}'")]
    InvalidAddress(String),

    #[error("Message was not accepted: {0}")]
    Delivery(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = SubmitError> = std::result::Result<T, E>;

/// Reply codes the client checks for
pub struct ReplyCode;

impl ReplyCode {
    /// Service ready greeting
    pub const READY: u16 = 220;

    /// Service closing transmission channel
    pub const CLOSING: u16 = 221;

    /// Requested action completed
    pub const OK: u16 = 250;

    /// Start mail input
    pub const START_MAIL_INPUT: u16 = 354;
}

/// Maps client errors to the messages shown to the person sending
impl SubmitError {
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Connection(_) => "Could not connect to server, consider fixing the \
                hostname or make sure the server is running"
                .to_string(),
            SubmitError::InvalidAddress(address) => {
                format!("The email '{address}' is invalid")
            }
            SubmitError::Delivery(_) => "Was unable to send email, you can retry".to_string(),
            SubmitError::MalformedResponse(line) => {
                format!("The server sent a response that could not be understood: {line}")
            }
            SubmitError::Configuration(msg) => msg.clone(),
            SubmitError::ConnectionClosed => "The server closed the connection".to_string(),
            SubmitError::Io(e) => format!("A network error occurred: {e}"),
        }
    }
}
