//! SMTP reply handling

use crate::smtp::error::{Result, SubmitError};

/// A single reply line read from the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLine {
    /// The numeric reply code (e.g. 220, 250, 550)
    pub code: u16,
    /// The full line as received, without the line terminator
    pub text: String,
}

impl ResponseLine {
    /// Parse a reply line, extracting its leading code
    pub fn parse(line: &str) -> Result<Self> {
        let text = line.trim_end_matches(['\r', '\n']);
        Ok(Self {
            code: parse_code(text)?,
            text: text.to_owned(),
        })
    }

    /// Check if the reply carries the expected code
    pub fn is(&self, code: u16) -> bool {
        self.code == code
    }
}

/// Extract the leading status code from a reply line.
///
/// The token before the first whitespace must be a base-10 integer,
/// otherwise the line is reported as [`SubmitError::MalformedResponse`].
pub fn parse_code(line: &str) -> Result<u16> {
    let token = line.split(char::is_whitespace).next().unwrap_or_default();
    token
        .parse::<u16>()
        .map_err(|_| SubmitError::MalformedResponse(line.to_owned()))
}
