//! Client-to-server request frames
//!
//! A request is a 24-byte header followed by a contiguous tail holding
//! extras, key, and value in that order. The in-memory value keeps plain
//! host-order fields alongside a single owned backing buffer containing the
//! full wire image; accessors are zero-copy views into that buffer.

use std::fmt;
use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use super::codec::{ReceiveOptions, read_full, reserve_header, write_full};
use super::error::{Error, Result};
use super::types::CommandCode;
use super::{HDR_LEN, REQ_MAGIC, TRANSMIT_SPLIT_THRESHOLD};

/// A memcached binary protocol request
///
/// # Wire Format
///
/// ```text
/// Byte/     0       |       1       |       2       |       3       |
///   +---------------+---------------+---------------+---------------+
///  0| Magic (0x80)  | Opcode        | Key length                    |
///   +---------------+---------------+---------------+---------------+
///  4| Extras length | Data type     | vbucket id                    |
///   +---------------+---------------+---------------+---------------+
///  8| Total body length                                             |
///   +---------------+---------------+---------------+---------------+
/// 12| Opaque                                                        |
///   +---------------+---------------+---------------+---------------+
/// 16| CAS                                                           |
///   |                                                               |
///   +---------------+---------------+---------------+---------------+
/// 24| Extras / key / value...                                       |
/// ```
///
/// All multi-byte fields are big-endian on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    opcode: CommandCode,
    data_type: u8,
    vbucket: u16,
    opaque: u32,
    cas: u64,
    key_len: u16,
    extras_len: u8,
    body_len: u32,
    /// Full wire image: header plus tail, one allocation
    wire: Bytes,
}

impl Request {
    /// Build a request from its parts.
    ///
    /// Allocates a single buffer of `24 + extras + key + body` bytes and
    /// serializes the header into it in network byte order. Extras, key, and
    /// body may each independently be empty. The data-type byte is written
    /// as zero.
    ///
    /// Key length must fit in 16 bits and extras length in 8; exceeding the
    /// field widths is a programming error.
    #[must_use]
    pub fn build(
        opcode: CommandCode,
        vbucket: u16,
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
        wire.put_u8(REQ_MAGIC);
        wire.put_u8(opcode.as_u8());
        wire.put_u16(key_len);
        wire.put_u8(extras_len);
        wire.put_u8(0); // data type
        wire.put_u16(vbucket);
        wire.put_u32(body_len);
        wire.put_u32(opaque);
        wire.put_u64(cas);
        wire.put_slice(extras);
        wire.put_slice(key);
        wire.put_slice(body);

        Self {
            opcode,
            data_type: 0,
            vbucket,
            opaque,
            cas,
            key_len,
            extras_len,
            body_len,
            wire: wire.freeze(),
        }
    }

    /// Command code
    #[must_use]
    pub const fn opcode(&self) -> CommandCode {
        self.opcode
    }

    /// Virtual bucket this command belongs to
    #[must_use]
    pub const fn vbucket(&self) -> u16 {
        self.vbucket
    }

    /// Caller-supplied tag, echoed by the server
    #[must_use]
    pub const fn opaque(&self) -> u32 {
        self.opaque
    }

    /// CAS token (0 when unused)
    #[must_use]
    pub const fn cas(&self) -> u64 {
        self.cas
    }

    /// Data-type byte, preserved from the wire but not interpreted
    #[must_use]
    pub const fn data_type(&self) -> u8 {
        self.data_type
    }

    /// Bytes this request occupies on the wire
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
        let end = HDR_LEN + self.effective_extras_len() + usize::from(self.key_len);
        &self.wire[..end.min(self.wire.len())]
    }

    fn tail(&self) -> &[u8] {
        &self.wire[HDR_LEN..]
    }

    /// Extras length including any TAP engine-private data.
    ///
    /// For the TAP stream family the first two bytes of the declared extras
    /// are a big-endian count of engine-private bytes appended after them.
    /// Clamped to the tail so a hostile length cannot reach out of bounds.
    fn effective_extras_len(&self) -> usize {
        let tail = self.tail();
        let mut elen = usize::from(self.extras_len);
        if self.opcode.has_engine_extras() && self.body_len != 0 && tail.len() >= 2 {
            elen += usize::from(u16::from_be_bytes([tail[0], tail[1]]));
        }
        elen.min(tail.len())
    }

    /// Opcode-specific extras, including TAP engine-private data
    #[must_use]
    pub fn extras(&self) -> &[u8] {
        &self.tail()[..self.effective_extras_len()]
    }

    /// The key
    #[must_use]
    pub fn key(&self) -> &[u8] {
        let tail = self.tail();
        let start = self.effective_extras_len();
        let end = (start + usize::from(self.key_len)).min(tail.len());
        &tail[start..end]
    }

    /// The value: everything in the tail after extras and key
    #[must_use]
    pub fn body(&self) -> &[u8] {
        let tail = self.tail();
        let start = (self.effective_extras_len() + usize::from(self.key_len)).min(tail.len());
        &tail[start..]
    }

    /// Send this request across a writer.
    ///
    /// Small frames go out in a single write; frames whose tail reaches the
    /// split threshold are written as header+extras+key, then value, which
    /// spares a contiguous copy the caller already has isolated. Returns the
    /// total bytes written across both writes.
    pub fn transmit<W: Write>(&self, w: &mut W) -> Result<usize> {
        if self.body_len < TRANSMIT_SPLIT_THRESHOLD {
            write_full(w, self.bytes(), 0)
        } else {
            let n = write_full(w, self.header_bytes(), 0)?;
            write_full(w, self.body(), n)
        }
    }

    /// Read one request frame, allocating the 24-byte header buffer
    /// internally and using the process-wide tail cap.
    pub fn receive<R: Read>(r: &mut R) -> Result<(Self, usize)> {
        let mut scratch = Vec::new();
        Self::receive_with(r, &mut scratch, &ReceiveOptions::default())
    }

    /// Read one request frame.
    ///
    /// `scratch` is reused for the header when its capacity allows, letting a
    /// connection loop avoid a 24-byte allocation per frame; it must not be
    /// shared across concurrent receives. On success returns the frame and
    /// the total bytes consumed from the reader; every error also reports
    /// bytes consumed via [`Error::bytes_transferred`].
    pub fn receive_with<R: Read>(
        r: &mut R,
        scratch: &mut Vec<u8>,
        opts: &ReceiveOptions,
    ) -> Result<(Self, usize)> {
        reserve_header(scratch, HDR_LEN);
        let hdr = &mut scratch[..HDR_LEN];
        let mut n = read_full(r, hdr)?;

        if hdr[0] != REQ_MAGIC {
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

        let req = Self {
            opcode: CommandCode(hdr[1]),
            key_len: u16::from_be_bytes([hdr[2], hdr[3]]),
            extras_len: hdr[4],
            data_type: hdr[5],
            vbucket: u16::from_be_bytes([hdr[6], hdr[7]]),
            body_len,
            opaque: u32::from_be_bytes(hdr[12..16].try_into().unwrap()),
            cas: u64::from_be_bytes(hdr[16..24].try_into().unwrap()),
            wire: wire.freeze(),
        };
        trace!(opcode = %req.opcode, body_len, "received request frame");
        Ok((req, n))
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{Request opcode={}, bodylen={}, key='{}'}}",
            self.opcode,
            self.body().len(),
            String::from_utf8_lossy(self.key())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DEFAULT_MAX_BODY_LEN;
    use std::io;

    /// Writer recording the length of every write call.
    struct SplitRecorder {
        writes: Vec<usize>,
        sink: Vec<u8>,
    }

    impl SplitRecorder {
        fn new() -> Self {
            Self {
                writes: Vec::new(),
                sink: Vec::new(),
            }
        }
    }

    impl Write for SplitRecorder {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes.push(buf.len());
            self.sink.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn sample_set() -> Request {
        Request::build(
            CommandCode::SET,
            824,
            7242,
            938_424_885,
            &[],
            b"somekey",
            b"somevalue",
        )
    }

    #[rustfmt::skip]
    const SAMPLE_SET_WIRE: &[u8] = &[
        0x80, 0x01,             // magic, SET
        0x00, 0x07,             // key length
        0x00,                   // extras length
        0x00,                   // data type
        0x03, 0x38,             // vbucket 824
        0x00, 0x00, 0x00, 0x10, // total body length
        0x00, 0x00, 0x1c, 0x4a, // opaque 7242
        0x00, 0x00, 0x00, 0x00, 0x37, 0xef, 0x3a, 0x35, // CAS 938424885
        b's', b'o', b'm', b'e', b'k', b'e', b'y',
        b's', b'o', b'm', b'e', b'v', b'a', b'l', b'u', b'e',
    ];

    #[test]
    fn test_encoding_request() {
        let req = sample_set();
        assert_eq!(req.bytes(), SAMPLE_SET_WIRE);
        assert_eq!(req.size(), SAMPLE_SET_WIRE.len());
        assert_eq!(
            req.to_string(),
            "{Request opcode=SET, bodylen=9, key='somekey'}"
        );
    }

    #[test]
    fn test_encoding_is_repeatable() {
        // Serialization must not mutate the frame.
        let req = sample_set();
        let first = req.bytes().to_vec();
        assert_eq!(req.bytes(), first.as_slice());
        assert_eq!(req.bytes(), first.as_slice());
    }

    #[test]
    fn test_encoding_request_with_extras() {
        let req = Request::build(
            CommandCode::SET,
            824,
            7242,
            938_424_885,
            &[1, 2, 3, 4],
            b"somekey",
            b"somevalue",
        );

        let mut out = SplitRecorder::new();
        let n = req.transmit(&mut out).unwrap();

        #[rustfmt::skip]
        let expected: &[u8] = &[
            0x80, 0x01,
            0x00, 0x07,             // key length
            0x04,                   // extras length
            0x00,                   // data type
            0x03, 0x38,             // vbucket
            0x00, 0x00, 0x00, 0x14, // total body length
            0x00, 0x00, 0x1c, 0x4a, // opaque
            0x00, 0x00, 0x00, 0x00, 0x37, 0xef, 0x3a, 0x35, // CAS
            1, 2, 3, 4,
            b's', b'o', b'm', b'e', b'k', b'e', b'y',
            b's', b'o', b'm', b'e', b'v', b'a', b'l', b'u', b'e',
        ];
        assert_eq!(out.sink, expected);
        assert_eq!(n, expected.len());
        assert_eq!(out.writes.len(), 1, "small frame must go out in one write");
    }

    #[test]
    fn test_transmit_splits_large_body() {
        let body = vec![0u8; 256];
        let req = Request::build(
            CommandCode::SET,
            824,
            7242,
            938_424_885,
            &[1, 2, 3, 4],
            b"somekey",
            &body,
        );
        assert_eq!(req.size(), HDR_LEN + 4 + 7 + 256);

        let mut out = SplitRecorder::new();
        let n = req.transmit(&mut out).unwrap();
        assert_eq!(n, req.size());
        assert_eq!(out.writes, vec![HDR_LEN + 4 + 7, 256]);

        let mut expected = Vec::new();
        expected.extend_from_slice(&[
            0x80, 0x01, 0x00, 0x07, 0x04, 0x00, 0x03, 0x38, 0x00, 0x00, 0x01, 0x0b, 0x00, 0x00,
            0x1c, 0x4a, 0x00, 0x00, 0x00, 0x00, 0x37, 0xef, 0x3a, 0x35,
        ]);
        expected.extend_from_slice(&[1, 2, 3, 4]);
        expected.extend_from_slice(b"somekey");
        expected.extend_from_slice(&body);
        assert_eq!(out.sink, expected);
    }

    #[test]
    fn test_transmit_write_failure() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("sink closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let err = sample_set().transmit(&mut Broken).unwrap_err();
        assert!(matches!(err, Error::Write { bytes: 0, .. }));
    }

    #[test]
    fn test_receive_roundtrip() {
        let req = Request::build(
            CommandCode::SET,
            824,
            7242,
            0,
            &[1],
            b"somekey",
            b"somevalue",
        );
        let wire = req.bytes().to_vec();

        let (decoded, n) = Request::receive(&mut &wire[..]).unwrap();
        assert_eq!(n, wire.len());
        assert_eq!(decoded, req);
        assert_eq!(decoded.extras(), &[1]);
        assert_eq!(decoded.key(), b"somekey");
        assert_eq!(decoded.body(), b"somevalue");
        assert_eq!(decoded.vbucket(), 824);
        assert_eq!(decoded.opaque(), 7242);
    }

    #[test]
    fn test_receive_empty_sections() {
        let req = Request::build(CommandCode::SET, 824, 7242, 0, &[], &[], &[]);
        let wire = req.bytes().to_vec();
        assert_eq!(wire.len(), HDR_LEN);

        let (decoded, n) = Request::receive(&mut &wire[..]).unwrap();
        assert_eq!(n, HDR_LEN);
        assert_eq!(decoded, req);
        assert!(decoded.extras().is_empty());
        assert!(decoded.key().is_empty());
        assert!(decoded.body().is_empty());
    }

    #[test]
    fn test_receive_short_header() {
        let err = Request::receive(&mut &[1u8, 2, 3][..]).unwrap_err();
        assert_eq!(err.bytes_transferred(), 3);
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_receive_short_body() {
        let req = Request::build(CommandCode::SET, 824, 7242, 0, &[1], b"somekey", b"somevalue");
        let wire = req.bytes();
        let truncated = &wire[..wire.len() - 3];

        let err = Request::receive(&mut &truncated[..]).unwrap_err();
        assert_eq!(err.bytes_transferred(), truncated.len());
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_receive_bad_magic() {
        let mut wire = sample_set().bytes().to_vec();
        wire[0] = 0x83;

        let err = Request::receive(&mut &wire[..]).unwrap_err();
        assert_eq!(err.to_string(), "Bad magic: 0x83");
        assert_eq!(err.bytes_transferred(), HDR_LEN);
    }

    #[test]
    fn test_receive_rejects_oversize_body() {
        // Reject on the declared length, before any body byte is read.
        let declared = (DEFAULT_MAX_BODY_LEN + 5) as u32;
        let mut hdr = vec![0u8; HDR_LEN];
        hdr[0] = REQ_MAGIC;
        hdr[1] = CommandCode::SET.as_u8();
        hdr[8..12].copy_from_slice(&declared.to_be_bytes());

        let err = Request::receive(&mut &hdr[..]).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("{declared} is too big (max {DEFAULT_MAX_BODY_LEN})")
        );
        assert_eq!(err.bytes_transferred(), HDR_LEN);
    }

    #[test]
    fn test_receive_with_custom_cap() {
        let req = Request::build(CommandCode::SET, 0, 0, 0, &[], b"k", &vec![0u8; 512]);
        let wire = req.bytes().to_vec();
        let opts = ReceiveOptions { max_body_len: 100 };

        let mut scratch = Vec::new();
        let err = Request::receive_with(&mut &wire[..], &mut scratch, &opts).unwrap_err();
        assert!(matches!(err, Error::BodyTooLarge { max: 100, .. }));
    }

    #[test]
    fn test_scratch_buffer_reuse() {
        let req = sample_set();
        let mut stream = Vec::new();
        stream.extend_from_slice(req.bytes());
        stream.extend_from_slice(req.bytes());

        let mut scratch = Vec::with_capacity(HDR_LEN);
        let opts = ReceiveOptions::default();
        let mut rd = &stream[..];
        let (first, _) = Request::receive_with(&mut rd, &mut scratch, &opts).unwrap();
        let (second, _) = Request::receive_with(&mut rd, &mut scratch, &opts).unwrap();
        assert_eq!(first, req);
        assert_eq!(second, req);
    }

    #[test]
    fn test_receive_tap_mutation() {
        #[rustfmt::skip]
        let content: &[u8] = &[
            0x80, CommandCode::TAP_MUTATION.as_u8(),
            0x00, 0x07,             // key length
            0x02,                   // declared extras length
            0x00,                   // data type
            0x03, 0x38,             // vbucket
            0x00, 0x00, 0x00, 0x16, // total body length
            0x00, 0x00, 0x1c, 0x4a, // opaque
            0x00, 0x00, 0x00, 0x00, 0x37, 0xef, 0x3a, 0x35, // CAS
            0, 4,                   // engine-private length
            1, 2, 3, 4,             // engine-private data
            b's', b'o', b'm', b'e', b'k', b'e', b'y',
            b's', b'o', b'm', b'e', b'v', b'a', b'l', b'u', b'e',
        ];

        let (req, n) = Request::receive(&mut &content[..]).unwrap();
        assert_eq!(n, content.len());
        assert_eq!(req.extras(), &[0, 4, 1, 2, 3, 4]);
        assert_eq!(req.key(), b"somekey");
        assert_eq!(req.body(), b"somevalue");
        assert_eq!(
            req.to_string(),
            "{Request opcode=TAP_MUTATION, bodylen=9, key='somekey'}"
        );
    }

    #[test]
    fn test_tap_hostile_engine_length_is_clamped() {
        // Declared engine-private length runs past the tail; accessors must
        // stay in bounds instead of panicking.
        let mut wire = Request::build(
            CommandCode::TAP_MUTATION,
            0,
            0,
            0,
            &[0, 0],
            b"k",
            b"v",
        )
        .bytes()
        .to_vec();
        wire[HDR_LEN] = 0xff;
        wire[HDR_LEN + 1] = 0xff;

        let (req, _) = Request::receive(&mut &wire[..]).unwrap();
        assert_eq!(req.extras().len(), 4); // whole tail
        assert!(req.key().is_empty());
        assert!(req.body().is_empty());
    }

    #[test]
    fn test_header_bytes_excludes_value() {
        let req = Request::build(CommandCode::SET, 1, 2, 3, &[9, 9], b"key", b"value");
        let hdr = req.header_bytes();
        assert_eq!(hdr.len(), HDR_LEN + 2 + 3);
        assert_eq!(&hdr[HDR_LEN..], &[9, 9, b'k', b'e', b'y']);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Any buildable request survives a serialize/receive round trip.
            #[test]
            fn prop_roundtrip_preserves_fields(
                opcode in 0u8..0x40, // outside the TAP engine-extras range
                vbucket in any::<u16>(),
                opaque in any::<u32>(),
                cas in any::<u64>(),
                extras in prop::collection::vec(any::<u8>(), 0..=16),
                key in prop::collection::vec(any::<u8>(), 0..=64),
                body in prop::collection::vec(any::<u8>(), 0..=512),
            ) {
                let req = Request::build(
                    CommandCode(opcode), vbucket, opaque, cas, &extras, &key, &body,
                );
                let wire = req.bytes().to_vec();
                let (decoded, n) = Request::receive(&mut &wire[..]).unwrap();

                prop_assert_eq!(n, wire.len());
                prop_assert_eq!(&decoded, &req);
                prop_assert_eq!(decoded.extras(), extras.as_slice());
                prop_assert_eq!(decoded.key(), key.as_slice());
                prop_assert_eq!(decoded.body(), body.as_slice());
            }

            /// Transmit always emits exactly the serialized image.
            #[test]
            fn prop_transmit_matches_bytes(
                body in prop::collection::vec(any::<u8>(), 0..=1024),
            ) {
                let req = Request::build(
                    CommandCode::SET, 1, 2, 3, &[1, 2, 3, 4], b"somekey", &body,
                );
                let mut out = SplitRecorder::new();
                let n = req.transmit(&mut out).unwrap();
                prop_assert_eq!(n, req.size());
                prop_assert_eq!(out.sink.as_slice(), req.bytes());
            }

            /// A non-request magic byte is always rejected.
            #[test]
            fn prop_bad_magic_rejected(magic in any::<u8>().prop_filter("not request magic", |m| *m != REQ_MAGIC)) {
                let mut wire = sample_set().bytes().to_vec();
                wire[0] = magic;
                let err = Request::receive(&mut &wire[..]).unwrap_err();
                prop_assert!(matches!(err, Error::BadMagic { .. }), "expected BadMagic, got {:?}", err);
            }
        }
    }
}
