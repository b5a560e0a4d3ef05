//! Server-to-client response frames
//!
//! Mirror image of the request codec: same 24-byte header layout with the
//! status code where requests carry the vbucket id, and no TAP extras
//! expansion. A non-success response can be wrapped as an [`Error`] so
//! callers can thread it through ordinary error handling and classify it
//! with [`is_not_found`](super::is_not_found) / [`is_fatal`](super::is_fatal).

use std::fmt;
use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use super::codec::{ReceiveOptions, read_full, reserve_header, write_full};
use super::error::{Error, Result};
use super::types::{CommandCode, Status};
use super::{HDR_LEN, RES_MAGIC, TRANSMIT_SPLIT_THRESHOLD};

/// A memcached binary protocol response
///
/// Header layout matches [`Request`](super::Request) except that bytes 6..8
/// hold the response status instead of a vbucket id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    opcode: CommandCode,
    data_type: u8,
    status: Status,
    opaque: u32,
    cas: u64,
    key_len: u16,
    extras_len: u8,
    body_len: u32,
    /// Full wire image: header plus tail, one allocation
    wire: Bytes,
}

impl Response {
    /// Build a response from its parts.
    ///
    /// Allocates a single buffer of `24 + extras + key + body` bytes and
    /// serializes the header into it in network byte order. The data-type
    /// byte is written as zero.
    #[must_use]
    pub fn build(
        opcode: CommandCode,
        status: Status,
        opaque: u32,
        cas: u64,
        extras: &[u8],
        key: &[u8],
        body: &[u8],
    ) -> Self {
        assert!(extras.len() <= usize::from(u8::MAX), "extras exceed 8-bit length field");
        assert!(key.len() <= usize::from(u16::MAX), "key exceeds 16-bit length field");

        let extras_len = extras.len() as u8;
        let key_len = key.len() as u16;
        let body_len = (extras.len() + key.len() + body.len()) as u32;

        let mut wire = BytesMut::with_capacity(HDR_LEN + body_len as usize);
        wire.put_u8(RES_MAGIC);
        wire.put_u8(opcode.as_u8());
        wire.put_u16(key_len);
        wire.put_u8(extras_len);
        wire.put_u8(0); // data type
        wire.put_u16(status.as_u16());
        wire.put_u32(body_len);
        wire.put_u32(opaque);
        wire.put_u64(cas);
        wire.put_slice(extras);
        wire.put_slice(key);
        wire.put_slice(body);

        Self {
            opcode,
            data_type: 0,
            status,
            opaque,
            cas,
            key_len,
            extras_len,
            body_len,
            wire: wire.freeze(),
        }
    }

    /// Opcode echoed from the request
    #[must_use]
    pub const fn opcode(&self) -> CommandCode {
        self.opcode
    }

    /// Response status
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Opaque tag echoed from the request
    #[must_use]
    pub const fn opaque(&self) -> u32 {
        self.opaque
    }

    /// CAS token of the affected item
    #[must_use]
    pub const fn cas(&self) -> u64 {
        self.cas
    }

    /// Data-type byte, preserved from the wire but not interpreted
    #[must_use]
    pub const fn data_type(&self) -> u8 {
        self.data_type
    }

    /// Bytes this response occupies on the wire
    #[must_use]
    pub const fn size(&self) -> usize {
        HDR_LEN + self.body_len as usize
    }

    /// The full wire image, aliasing the backing buffer
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.wire
    }

    /// Header plus extras plus key, for scatter writes that append the value
    /// separately
    #[must_use]
    pub fn header_bytes(&self) -> &[u8] {
        let end = HDR_LEN + usize::from(self.extras_len) + usize::from(self.key_len);
        &self.wire[..end.min(self.wire.len())]
    }

    fn tail(&self) -> &[u8] {
        &self.wire[HDR_LEN..]
    }

    /// Opcode-specific extras
    #[must_use]
    pub fn extras(&self) -> &[u8] {
        let tail = self.tail();
        &tail[..usize::from(self.extras_len).min(tail.len())]
    }

    /// The key (non-empty only for key-echoing responses)
    #[must_use]
    pub fn key(&self) -> &[u8] {
        let tail = self.tail();
        let start = usize::from(self.extras_len).min(tail.len());
        let end = (start + usize::from(self.key_len)).min(tail.len());
        &tail[start..end]
    }

    /// The value: everything in the tail after extras and key
    #[must_use]
    pub fn body(&self) -> &[u8] {
        let tail = self.tail();
        let start = (usize::from(self.extras_len) + usize::from(self.key_len)).min(tail.len());
        &tail[start..]
    }

    /// Wrap this response as an error for caller convenience.
    ///
    /// Typically used when the status is non-success; the resulting error
    /// formats as `Response status=<S>, opcode=<O>, opaque=<U>, msg: <body>`.
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::Server(self)
    }

    /// Send this response across a writer.
    ///
    /// Same policy as the request side: one write for small frames, two for
    /// large ones. Returns the total bytes written across both writes.
    pub fn transmit<W: Write>(&self, w: &mut W) -> Result<usize> {
        if self.body_len < TRANSMIT_SPLIT_THRESHOLD {
            write_full(w, self.bytes(), 0)
        } else {
            let n = write_full(w, self.header_bytes(), 0)?;
            write_full(w, self.body(), n)
        }
    }

    /// Read one response frame, allocating the 24-byte header buffer
    /// internally and using the process-wide tail cap.
    pub fn receive<R: Read>(r: &mut R) -> Result<(Self, usize)> {
        let mut scratch = Vec::new();
        Self::receive_with(r, &mut scratch, &ReceiveOptions::default())
    }

    /// Read one response frame.
    ///
    /// `scratch` is reused for the header when its capacity allows; it must
    /// not be shared across concurrent receives. On success returns the frame
    /// and the total bytes consumed; every error also reports bytes consumed
    /// via [`Error::bytes_transferred`].
    pub fn receive_with<R: Read>(
        r: &mut R,
        scratch: &mut Vec<u8>,
        opts: &ReceiveOptions,
    ) -> Result<(Self, usize)> {
        reserve_header(scratch, HDR_LEN);
        let hdr = &mut scratch[..HDR_LEN];
        let mut n = read_full(r, hdr)?;

        if hdr[0] != RES_MAGIC {
            return Err(Error::BadMagic {
                magic: hdr[0],
                bytes: n,
            });
        }

        let body_len = u32::from_be_bytes([hdr[8], hdr[9], hdr[10], hdr[11]]);
        if body_len as usize > opts.max_body_len {
            return Err(Error::BodyTooLarge {
                len: body_len,
                max: opts.max_body_len,
                bytes: n,
            });
        }

        let mut wire = BytesMut::with_capacity(HDR_LEN + body_len as usize);
        wire.extend_from_slice(hdr);
        wire.resize(HDR_LEN + body_len as usize, 0);
        match read_full(r, &mut wire[HDR_LEN..]) {
            Ok(m) => n += m,
            Err(Error::Io { bytes, source }) => {
                return Err(Error::Io {
                    bytes: n + bytes,
                    source,
                });
            }
            Err(e) => return Err(e),
        }

        let res = Self {
            opcode: CommandCode(hdr[1]),
            key_len: u16::from_be_bytes([hdr[2], hdr[3]]),
            extras_len: hdr[4],
            data_type: hdr[5],
            status: Status(u16::from_be_bytes([hdr[6], hdr[7]])),
            body_len,
            opaque: u32::from_be_bytes(hdr[12..16].try_into().unwrap()),
            cas: u64::from_be_bytes(hdr[16..24].try_into().unwrap()),
            wire: wire.freeze(),
        };
        trace!(opcode = %res.opcode, status = %res.status, body_len, "received response frame");
        Ok((res, n))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{Response status={} keylen={}, extralen={}, bodylen={}}}",
            self.status,
            self.key_len,
            self.extras_len,
            self.body().len()
        )
    }
}
