//! Helpers for turning raw form input into values the client accepts

use crate::smtp::error::{Result, SubmitError};

/// Parse a raw port string. Fails before any network activity.
pub fn parse_port(raw: &str) -> Result<u16> {
    raw.trim().parse::<u16>().map_err(|_| {
        SubmitError::Configuration(format!("Port number needs to be a integer, got '{raw}'"))
    })
}

/// Split a comma-separated CC field into trimmed, non-empty addresses
pub fn parse_cc_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_owned)
        .collect()
}
