//! Stream primitives: bounded line reads and exact-length binary copies.
//!
//! Both primitives operate on the same buffered reader so bytes buffered
//! during line reading are never lost when the stream switches into a
//! binary frame. Frame lengths are counted, never scanned.

use std::io::{self, BufRead, Read, Write};

use thiserror::Error;

use super::errors::SessionError;

/// Maximum length of a single protocol text line.
pub(crate) const MAX_LINE_BYTES: usize = 64 * 1024;

const COPY_CHUNK: usize = 8 * 1024;

/// Reads one newline-terminated line, stripping the terminator.
///
/// Returns `Ok(None)` on a clean end-of-stream before any byte of a new
/// line. A final unterminated line is returned as-is, matching the
/// behavior of line readers on the peer side. Payloads are decoded
/// lossily: the protocol is UTF-8 and any malformed byte lands in the
/// unknown-verb path rather than killing the session.
pub(crate) fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, SessionError> {
    let mut buffer = Vec::new();
    let mut limited = reader.by_ref().take((MAX_LINE_BYTES as u64) + 1);
    let count = limited
        .read_until(b'\n', &mut buffer)
        .map_err(SessionError::Transport)?;
    if count == 0 {
        return Ok(None);
    }
    if buffer.last() == Some(&b'\n') {
        buffer.pop();
        if buffer.last() == Some(&b'\r') {
            buffer.pop();
        }
    }
    if buffer.len() > MAX_LINE_BYTES {
        return Err(SessionError::LineTooLong {
            max: MAX_LINE_BYTES,
        });
    }
    Ok(Some(String::from_utf8_lossy(&buffer).into_owned()))
}

/// Failures while copying an exact-length binary frame.
#[derive(Debug, Error)]
pub(crate) enum CopyError {
    /// The source ended before the announced length was reached.
    #[error("source ended {remaining} bytes short of the announced {expected}")]
    ShortSource {
        /// Announced frame length.
        expected: u64,
        /// Bytes still owed.
        remaining: u64,
    },
    /// Reading from the source failed.
    #[error("frame read failed: {0}")]
    Read(#[source] io::Error),
    /// Writing to the sink failed; `consumed` bytes were already taken
    /// from the source.
    #[error("frame write failed after {consumed} bytes: {source}")]
    Write {
        /// Bytes consumed from the source so far.
        consumed: u64,
        /// Underlying write failure.
        #[source]
        source: io::Error,
    },
}

/// Copies exactly `expected` bytes from `reader` to `writer`.
pub(crate) fn copy_exact<R, W>(
    reader: &mut R,
    writer: &mut W,
    expected: u64,
) -> Result<u64, CopyError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut remaining = expected;
    let mut chunk = [0u8; COPY_CHUNK];
    while remaining > 0 {
        let want = usize::try_from(remaining.min(COPY_CHUNK as u64)).unwrap_or(COPY_CHUNK);
        let count = match reader.read(&mut chunk[..want]) {
            Ok(0) => {
                return Err(CopyError::ShortSource {
                    expected,
                    remaining,
                });
            }
            Ok(count) => count,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(CopyError::Read(error)),
        };
        if let Err(source) = writer.write_all(&chunk[..count]) {
            return Err(CopyError::Write {
                consumed: expected - remaining + count as u64,
                source,
            });
        }
        remaining -= count as u64;
    }
    Ok(expected)
}

/// Discards exactly `count` bytes from the reader.
///
/// Used to keep the stream framed when a frame's sink fails locally but
/// the peer is still sending the announced payload.
pub(crate) fn drain<R: Read>(reader: &mut R, count: u64) -> io::Result<()> {
    let copied = io::copy(&mut reader.by_ref().take(count), &mut io::sink())?;
    if copied < count {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "stream ended while draining a file frame",
        ));
    }
    Ok(())
}
