//! Receive configuration and shared I/O plumbing
//!
//! The codec itself is stateless; the only tunable is the cap on the total
//! tail length accepted while decoding. It lives on [`ReceiveOptions`] so a
//! caller can scope it per connection, with a process-wide default kept for
//! convenience.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::error::{Error, Result};
use super::DEFAULT_MAX_BODY_LEN;

static MAX_BODY_LEN: AtomicUsize = AtomicUsize::new(DEFAULT_MAX_BODY_LEN);

/// Read the process-wide default tail-length cap.
#[must_use]
pub fn max_body_len() -> usize {
    MAX_BODY_LEN.load(Ordering::Relaxed)
}

/// Change the process-wide default tail-length cap.
///
/// Affects subsequent [`ReceiveOptions::default()`] values; receives already
/// in flight keep the cap they started with.
pub fn set_max_body_len(max: usize) {
    MAX_BODY_LEN.store(max, Ordering::Relaxed);
}

/// Options for the receive path
#[derive(Debug, Clone, Copy)]
pub struct ReceiveOptions {
    /// Maximum accepted total tail length (extras + key + body)
    pub max_body_len: usize,
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self {
            max_body_len: max_body_len(),
        }
    }
}

/// Fill `buf` completely, looping over short reads.
///
/// Returns the number of bytes read. On failure the error carries the bytes
/// consumed so far; a reader that runs dry mid-buffer surfaces as an
/// unexpected-EOF short read.
pub(crate) fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(Error::Io {
                    bytes: filled,
                    source: io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "reader exhausted mid-frame",
                    ),
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                return Err(Error::Io {
                    bytes: filled,
                    source: e,
                });
            }
        }
    }
    Ok(filled)
}

/// Write `buf` in full, counting `already` bytes confirmed by earlier writes.
///
/// Returns the new running total. Any sink failure is terminal for the
/// current transmit.
pub(crate) fn write_full<W: Write>(w: &mut W, buf: &[u8], already: usize) -> Result<usize> {
    match w.write_all(buf) {
        Ok(()) => Ok(already + buf.len()),
        Err(e) => Err(Error::Write {
            bytes: already,
            source: e,
        }),
    }
}

/// Size a caller-supplied scratch header buffer, allocating only when the
/// supplied capacity is insufficient.
pub(crate) fn reserve_header(scratch: &mut Vec<u8>, len: usize) {
    if scratch.capacity() < len {
        *scratch = vec![0; len];
    } else {
        scratch.resize(len, 0);
    }
}
