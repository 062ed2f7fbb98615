//! Connection to the relay and deterministic teardown

use crate::smtp::error::{Result, SubmitError};
use crate::smtp::response::ResponseLine;

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, warn};

/// Line terminator used for everything written to the relay
pub const CRLF: &str = "\r\n";

/// A byte stream that can be split into independent read and write halves
pub trait Channel: Read + Write + Sized {
    /// Create another handle to the same underlying connection
    fn try_clone(&self) -> io::Result<Self>;

    /// Shut down both directions of the connection
    fn shutdown(&self) -> io::Result<()>;
}

impl Channel for TcpStream {
    fn try_clone(&self) -> io::Result<Self> {
        TcpStream::try_clone(self)
    }

    fn shutdown(&self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

/// Owns the socket and the line reader/writer layered over it.
///
/// Resources are released in reverse acquisition order (writer, reader,
/// socket) by [`Transport::close`], which also runs on drop.
#[derive(Debug)]
pub struct Transport<S: Channel = TcpStream> {
    writer: Option<BufWriter<S>>,
    reader: Option<BufReader<S>>,
    socket: Option<S>,
}

impl Transport<TcpStream> {
    /// Connect to the relay at `host:port`
    pub fn open(
        host: &str,
        port: u16,
        connect_timeout: Option<Duration>,
        read_timeout: Option<Duration>,
    ) -> Result<Self> {
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| SubmitError::Connection(format!("cannot resolve {host}: {e}")))?;

        let mut last_error = None;
        for addr in addrs {
            let attempt = match connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    stream.set_read_timeout(read_timeout)?;
                    return Self::from_channel(stream);
                }
                Err(e) => {
                    debug!(%addr, error = %e, "connection attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(SubmitError::Connection(match last_error {
            Some(e) => format!("{host}:{port}: {e}"),
            None => format!("{host} did not resolve to any address"),
        }))
    }
}

impl<S: Channel> Transport<S> {
    /// Layer a reader and a writer over an already connected channel
    pub fn from_channel(socket: S) -> Result<Self> {
        let reader = BufReader::new(socket.try_clone()?);
        let writer = BufWriter::new(socket.try_clone()?);
        Ok(Self {
            writer: Some(writer),
            reader: Some(reader),
            socket: Some(socket),
        })
    }

    /// Whether any of the underlying resources is still held
    pub fn is_open(&self) -> bool {
        self.writer.is_some() || self.reader.is_some() || self.socket.is_some()
    }

    /// Access the raw output channel
    pub fn writer(&mut self) -> Result<&mut BufWriter<S>> {
        self.writer.as_mut().ok_or(SubmitError::ConnectionClosed)
    }

    /// Write a line followed by CRLF. Nothing is flushed.
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        let writer = self.writer()?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(CRLF.as_bytes())?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer()?.flush()?;
        Ok(())
    }

    /// Block until one full line is available and return it without its terminator
    pub fn read_line(&mut self) -> Result<String> {
        let reader = self.reader.as_mut().ok_or(SubmitError::ConnectionClosed)?;

        let mut buffer = Vec::new();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            return Err(SubmitError::ConnectionClosed);
        }

        let line = String::from_utf8_lossy(&buffer);
        Ok(line.trim_end_matches(['\r', '\n']).to_owned())
    }

    /// Read and parse one reply line
    pub fn read_response(&mut self) -> Result<ResponseLine> {
        let line = self.read_line()?;
        debug!("<<< {line}");
        ResponseLine::parse(&line)
    }

    /// Release the writer, then the reader, then the socket.
    ///
    /// Each release is attempted independently; faults are logged and never
    /// returned. Calling this more than once is a no-op.
    pub fn close(&mut self) {
        if !self.is_open() {
            return;
        }

        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                warn!(error = %e, "failed to flush output stream during close");
            }
            // Discard anything left buffered so dropping does not retry the flush
            drop(writer.into_parts());
        }

        drop(self.reader.take());

        if let Some(socket) = self.socket.take() {
            match socket.shutdown() {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotConnected => {
                    debug!("socket already disconnected");
                }
                Err(e) => warn!(error = %e, "failed to shut down socket during close"),
            }
            drop(socket);
        }

        debug!("transport closed");
    }
}

impl<S: Channel> Drop for Transport<S> {
    fn drop(&mut self) {
        self.close();
    }
}
