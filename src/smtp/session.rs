//! SMTP session driving a single submission from greeting to QUIT

use crate::smtp::attachment::{self, AttachmentMode};
use crate::smtp::command::{send_command, send_command_with, send_lines};
use crate::smtp::error::{ReplyCode, Result, SubmitError};
use crate::smtp::message::{EmailMessage, single_line};
use crate::smtp::response::ResponseLine;
use crate::smtp::transport::{Channel, Transport};

use chrono::{Local, NaiveDateTime};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

/// Progress of a session. States only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpState {
    /// No connection yet
    Disconnected,
    /// TCP connection established, greeting not yet read
    Connected,
    /// Greeting read and HELO accepted
    Greeted,
    /// MAIL FROM accepted
    SenderAccepted,
    /// Primary recipient and every CC accepted
    RecipientsAccepted,
    /// DATA sent, envelope being written
    DataPhase,
    /// Relay accepted the message
    MessageAccepted,
    /// Resources released
    Closed,
}

/// Where and how to submit
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// Relay hostname or IP address
    pub host: String,
    pub port: u16,
    /// Argument to HELO. Defaults to the relay host.
    pub helo_domain: Option<String>,
    /// Give up connecting after this long. `None` leaves it to the OS.
    pub connect_timeout: Option<Duration>,
    /// Give up waiting for a reply after this long. `None` waits forever.
    pub read_timeout: Option<Duration>,
    pub attachment_mode: AttachmentMode,
}

impl SmtpConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            helo_domain: None,
            connect_timeout: None,
            read_timeout: None,
            attachment_mode: AttachmentMode::default(),
        }
    }

    pub fn with_helo_domain(mut self, domain: impl Into<String>) -> Self {
        self.helo_domain = Some(domain.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_attachment_mode(mut self, mode: AttachmentMode) -> Self {
        self.attachment_mode = mode;
        self
    }

    /// The domain announced in HELO
    pub fn helo_domain(&self) -> &str {
        self.helo_domain.as_deref().unwrap_or(&self.host)
    }

    /// Reject settings the socket layer would only refuse after connecting
    pub fn validate(&self) -> Result<()> {
        for (name, timeout) in [
            ("Connect timeout", self.connect_timeout),
            ("Read timeout", self.read_timeout),
        ] {
            if timeout.is_some_and(|t| t.is_zero()) {
                return Err(SubmitError::Configuration(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        single_line("HELO domain", self.helo_domain())
    }
}

/// A live conversation with one relay.
///
/// Owns its transport exclusively; one session serves exactly one send.
#[derive(Debug)]
pub struct SmtpSession<S: Channel = TcpStream> {
    transport: Transport<S>,
    state: SmtpState,
    helo_domain: String,
}

impl SmtpSession<TcpStream> {
    /// Open a connection to the relay described by `config`
    pub fn connect(config: &SmtpConfig) -> Result<Self> {
        let transport = Transport::open(
            &config.host,
            config.port,
            config.connect_timeout,
            config.read_timeout,
        )?;
        info!(host = %config.host, port = config.port, "connected to relay");
        Ok(Self::new(transport, config.helo_domain()))
    }
}

impl<S: Channel> SmtpSession<S> {
    /// Wrap an already connected transport
    pub fn new(transport: Transport<S>, helo_domain: &str) -> Self {
        Self {
            transport,
            state: SmtpState::Connected,
            helo_domain: helo_domain.to_owned(),
        }
    }

    pub fn state(&self) -> SmtpState {
        self.state
    }

    fn advance(&mut self, state: SmtpState) {
        debug!(from = ?self.state, to = ?state, "session state");
        self.state = state;
    }

    /// Read the relay's greeting and introduce ourselves.
    ///
    /// A relay that hangs up or stays silent here counts as unreachable.
    pub fn greet(&mut self) -> Result<()> {
        let greeting = self
            .transport
            .read_response()
            .map_err(|e| lost_during("greeting", e))?;
        expect(greeting, ReplyCode::READY, |reply| {
            SubmitError::Connection(format!("unexpected greeting: {}", reply.text))
        })?;

        let helo = format!("HELO {}", self.helo_domain);
        send_command_with(&mut self.transport, &helo, |reply| {
            expect(reply, ReplyCode::OK, |reply| {
                SubmitError::Connection(format!("HELO rejected: {}", reply.text))
            })
        })
        .map_err(|e| lost_during("HELO", e))?;

        self.advance(SmtpState::Greeted);
        Ok(())
    }

    /// Send MAIL FROM for `sender`
    pub fn declare_sender(&mut self, sender: &str) -> Result<()> {
        let sender = sender.trim();
        self.declare_address(&format!("MAIL FROM:<{sender}>"), sender)?;
        self.advance(SmtpState::SenderAccepted);
        Ok(())
    }

    /// Send RCPT TO for the primary recipient and then each CC in order.
    ///
    /// Stops at the first rejected address. Returns the CC addresses joined
    /// for the `Cc:` header.
    pub fn declare_recipients(&mut self, recipient: &str, cc: &[String]) -> Result<String> {
        let recipient = recipient.trim();
        self.declare_address(&format!("RCPT TO:<{recipient}>"), recipient)?;

        let mut cc_header = Vec::with_capacity(cc.len());
        for address in cc {
            let address = address.trim();
            self.declare_address(&format!("RCPT TO:<{address}>"), address)?;
            cc_header.push(address);
        }

        self.advance(SmtpState::RecipientsAccepted);
        Ok(cc_header.join(", "))
    }

    fn declare_address(&mut self, command: &str, address: &str) -> Result<()> {
        send_command_with(&mut self.transport, command, |reply| {
            expect(reply, ReplyCode::OK, |reply| {
                debug!(address, reply = %reply.text, "address rejected");
                SubmitError::InvalidAddress(address.to_owned())
            })
        })?;
        Ok(())
    }

    /// Send DATA followed by the envelope block and check the final reply.
    ///
    /// A 354 reply to DATA is consumed before the final reply is read.
    pub fn transmit(
        &mut self,
        message: &EmailMessage,
        cc_header: &str,
        date: NaiveDateTime,
    ) -> Result<()> {
        self.advance(SmtpState::DataPhase);

        let lines =
            std::iter::once("DATA".to_owned()).chain(message.envelope_lines(cc_header, date));
        let mut reply = send_lines(&mut self.transport, lines, Ok)?;

        if reply.is(ReplyCode::START_MAIL_INPUT) {
            debug!(reply = %reply.text, "data phase started");
            reply = self.transport.read_response()?;
        }

        expect(reply, ReplyCode::OK, |reply| {
            SubmitError::Delivery(reply.text.clone())
        })?;

        self.advance(SmtpState::MessageAccepted);
        Ok(())
    }

    /// Stream each file verbatim in its own DATA cycle.
    ///
    /// The message has already been accepted at this point, so nothing here
    /// fails the send. An unreadable file is skipped before its DATA is sent;
    /// a broken stream stops the remaining files.
    pub fn stream_attachments(&mut self, files: &[PathBuf]) {
        for path in files {
            if let Err(e) = attachment::check_readable(path) {
                warn!(error = %e, "skipping attachment");
                continue;
            }
            if let Err(e) = self.stream_attachment(path) {
                warn!(path = %path.display(), error = %e, "attachment streaming aborted");
                break;
            }
        }
    }

    fn stream_attachment(&mut self, path: &Path) -> Result<()> {
        let reply = send_command(&mut self.transport, "DATA")?;
        debug!(path = %path.display(), reply = %reply.text, "attachment data phase");

        let bytes = attachment::stream_file(self.transport.writer()?, path)?;
        self.transport.write_line("")?;
        self.transport.write_line(".")?;
        self.transport.flush()?;

        let reply = self.transport.read_response()?;
        info!(path = %path.display(), bytes, reply = %reply.text, "attachment streamed");
        Ok(())
    }

    /// Send QUIT. The outcome is logged and never fails the send.
    pub fn quit(&mut self) {
        match send_command(&mut self.transport, "QUIT") {
            Ok(reply) if reply.is(ReplyCode::CLOSING) => {
                debug!(reply = %reply.text, "relay said goodbye");
            }
            Ok(reply) => warn!(reply = %reply.text, "unexpected reply to QUIT"),
            Err(e) => warn!(error = %e, "QUIT failed"),
        }
    }

    /// Run every step from greeting to QUIT for `message`.
    ///
    /// The first failing step aborts the rest; QUIT is only sent once the
    /// message has been accepted.
    pub fn deliver(&mut self, message: &EmailMessage, attachment_mode: AttachmentMode) -> Result<()> {
        self.greet()?;
        self.declare_sender(&message.sender)?;
        let cc_header = self.declare_recipients(&message.recipient, &message.cc)?;
        self.transmit(message, &cc_header, Local::now().naive_local())?;

        if !message.attachments.is_empty() {
            match attachment_mode {
                AttachmentMode::Skip => warn!(
                    count = message.attachments.len(),
                    "attachments are not transmitted"
                ),
                AttachmentMode::RawStream => self.stream_attachments(&message.attachments),
            }
        }

        self.quit();
        Ok(())
    }

    /// Release the transport. Safe to call more than once.
    pub fn close(&mut self) {
        self.transport.close();
        if self.state != SmtpState::Closed {
            self.advance(SmtpState::Closed);
        }
    }
}

/// Report a relay that dropped or stalled the connection as a connection failure
fn lost_during(step: &str, error: SubmitError) -> SubmitError {
    match error {
        SubmitError::ConnectionClosed => {
            SubmitError::Connection(format!("relay hung up during {step}"))
        }
        SubmitError::Io(e) => SubmitError::Connection(format!("{step} failed: {e}")),
        other => other,
    }
}

/// Pass `reply` through if it carries `code`, otherwise build the error
fn expect<F>(reply: ResponseLine, code: u16, on_mismatch: F) -> Result<ResponseLine>
where
    F: FnOnce(&ResponseLine) -> SubmitError,
{
    if reply.is(code) {
        Ok(reply)
    } else {
        Err(on_mismatch(&reply))
    }
}

/// Submit `message` to the relay described by `config`.
///
/// Checks the input, opens a fresh connection, runs the whole conversation
/// and always releases the connection before returning.
pub fn send_email(config: &SmtpConfig, message: &EmailMessage) -> Result<()> {
    config.validate()?;
    message.validate()?;
    if config.attachment_mode == AttachmentMode::RawStream {
        for path in &message.attachments {
            attachment::check_readable(path)?;
        }
    }

    let mut session = SmtpSession::connect(config)?;
    let result = session.deliver(message, config.attachment_mode);
    session.close();

    match &result {
        Ok(()) => info!(
            sender = %message.sender.trim(),
            recipient = %message.recipient.trim(),
            cc = message.cc.len(),
            "message accepted by relay"
        ),
        Err(e) => warn!(error = %e, "send failed"),
    }
    result
}
