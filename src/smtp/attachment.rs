//! Raw attachment streaming

use crate::smtp::error::{Result, SubmitError};

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Size of each chunk copied from the file to the channel
pub const CHUNK_SIZE: usize = 1024;

/// How attachment references on a message are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachmentMode {
    /// Accept the references but transmit nothing
    #[default]
    Skip,
    /// After the message, open one extra DATA cycle per file and stream its
    /// bytes verbatim. Not MIME encoded.
    RawStream,
}

/// Copy `reader` onto `out` in fixed-size chunks until end of input,
/// flushing after the final chunk. Returns the number of bytes copied.
pub fn stream_to<R: Read, W: Write>(reader: &mut R, out: &mut W) -> io::Result<u64> {
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        out.write_all(&buffer[..n])?;
        total += n as u64;
    }

    out.flush()?;
    Ok(total)
}

/// Stream the file at `path` verbatim onto `out`
pub fn stream_file<W: Write>(out: &mut W, path: &Path) -> io::Result<u64> {
    let mut file = File::open(path)?;
    stream_to(&mut file, out)
}

/// Make sure the file at `path` can be opened for streaming
pub fn check_readable(path: &Path) -> Result<()> {
    File::open(path).map(drop).map_err(|e| {
        SubmitError::Configuration(format!(
            "Cannot read attachment '{}': {e}",
            path.display()
        ))
    })
}
