//! Command/reply lock-step over a transport

use crate::smtp::error::Result;
use crate::smtp::response::ResponseLine;
use crate::smtp::transport::{Channel, Transport};

use tracing::debug;

/// Send one command line and block for exactly one reply line.
///
/// The command is flushed before the read is attempted.
pub fn send_command<S: Channel>(transport: &mut Transport<S>, command: &str) -> Result<ResponseLine> {
    debug!(">>> {command}");
    transport.write_line(command)?;
    transport.flush()?;
    transport.read_response()
}

/// Send one command and let `on_response` classify the reply
pub fn send_command_with<S, T, F>(transport: &mut Transport<S>, command: &str, on_response: F) -> Result<T>
where
    S: Channel,
    F: FnOnce(ResponseLine) -> Result<T>,
{
    let response = send_command(transport, command)?;
    on_response(response)
}

/// Write several lines back to back, flush once, then read a single reply.
///
/// Only the reply following the last line is handed to `on_response`; no
/// acknowledgement is expected for the lines before it.
pub fn send_lines<S, T, F, I>(transport: &mut Transport<S>, lines: I, on_response: F) -> Result<T>
where
    S: Channel,
    F: FnOnce(ResponseLine) -> Result<T>,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut count = 0usize;
    for line in lines {
        let line = line.as_ref();
        debug!(">>> {line}");
        transport.write_line(line)?;
        count += 1;
    }
    transport.flush()?;
    debug!(lines = count, "batch written");

    let response = transport.read_response()?;
    on_response(response)
}
