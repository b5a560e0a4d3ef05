//! Codec error types
//!
//! Errors are a tagged set: I/O failures on either direction, protocol
//! violations found while decoding, and server responses wrapped as errors
//! for caller convenience. Nothing is retried or recovered internally; every
//! variant carries enough context for the caller to decide whether the
//! connection is still usable.

use std::io;

use thiserror::Error;

use super::{Response, Status};

/// Memcached binary codec errors
#[derive(Debug, Error)]
pub enum Error {
    /// The reader failed or ran dry before a full header or tail arrived
    #[error("short read after {bytes} bytes: {source}")]
    Io {
        /// Bytes consumed from the reader before the failure
        bytes: usize,
        /// Underlying I/O failure, surfaced verbatim
        source: io::Error,
    },

    /// The first header byte did not match the expected magic
    #[error("Bad magic: 0x{magic:02x}")]
    BadMagic {
        /// The byte found where the magic belongs
        magic: u8,
        /// Bytes consumed from the reader
        bytes: usize,
    },

    /// The declared tail length exceeds the configured cap
    #[error("{len} is too big (max {max})")]
    BodyTooLarge {
        /// Declared total tail length
        len: u32,
        /// Configured maximum
        max: usize,
        /// Bytes consumed from the reader
        bytes: usize,
    },

    /// The writer failed during transmit
    #[error("write failed after {bytes} bytes: {source}")]
    Write {
        /// Bytes confirmed written before the failure
        bytes: usize,
        /// Underlying sink failure
        source: io::Error,
    },

    /// A decoded response whose status reports a server-side failure
    #[error(
        "Response status={}, opcode={}, opaque={}, msg: {}",
        .0.status(),
        .0.opcode(),
        .0.opaque(),
        String::from_utf8_lossy(.0.body())
    )]
    Server(Response),
}

impl Error {
    /// The server status behind this error, or [`Status::UNKNOWN`] if the
    /// error did not originate from a server response.
    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            Error::Server(res) => res.status(),
            _ => Status::UNKNOWN,
        }
    }

    /// Bytes moved over the wire before this error interrupted I/O, if any.
    #[must_use]
    pub fn bytes_transferred(&self) -> usize {
        match self {
            Error::Io { bytes, .. }
            | Error::BadMagic { bytes, .. }
            | Error::BodyTooLarge { bytes, .. }
            | Error::Write { bytes, .. } => *bytes,
            Error::Server(_) => 0,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// True iff this error is a server response reporting "key not found".
#[must_use]
pub fn is_not_found(err: Option<&Error>) -> bool {
    err.is_some_and(|e| e.status() == Status::KEY_ENOENT)
}

/// False if this error is not believed to be fatal to the connection.
///
/// KEY_ENOENT, KEY_EEXISTS, NOT_STORED, and TMPFAIL are application-level
/// negative results that leave the connection usable. Any other status, and
/// any error that is not a server response at all, is treated as fatal.
#[must_use]
pub fn is_fatal(err: Option<&Error>) -> bool {
    match err {
        None => false,
        Some(e) => !matches!(
            e.status(),
            Status::KEY_ENOENT | Status::KEY_EEXISTS | Status::NOT_STORED | Status::TMPFAIL
        ),
    }
}
