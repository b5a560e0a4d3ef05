//! Codec for the memcached binary protocol.
//!
//! This library converts in-memory request and response values to and from
//! their on-the-wire byte representation: the fixed 24-byte header, the
//! extras/key/value tail, streaming transmit and receive over caller-supplied
//! byte sinks and sources, and the TAP engine-private extras rule. It does
//! not manage connections, interpret command semantics, or correlate
//! responses to requests; callers provide the transport.
//!
//! # Quick Start
//!
//! ```rust
//! use mcwire::{CommandCode, Request};
//!
//! // Build a SET request
//! let req = Request::build(CommandCode::SET, 0, 7242, 0, &[], b"somekey", b"somevalue");
//!
//! // Serialize (aliases the frame's single backing buffer)
//! let wire = req.bytes();
//!
//! // Decode it back from any reader
//! let (decoded, n) = Request::receive(&mut &wire[..])?;
//! assert_eq!(n, req.size());
//! assert_eq!(decoded.key(), b"somekey");
//! # Ok::<(), mcwire::Error>(())
//! ```
//!
//! # Features
//!
//! - **Single-allocation frames** - one contiguous buffer per frame, with
//!   zero-copy accessors for extras, key, and value
//! - **Streaming transmit** - one write for small frames, header then value
//!   for large ones
//! - **Reusable header scratch** - receive loops can amortize the 24-byte
//!   header allocation
//! - **Error classification** - server statuses wrapped as errors, with
//!   not-found and fatal/recoverable helpers

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod protocol;

pub use protocol::{
    CommandCode, DEFAULT_MAX_BODY_LEN, Error, HDR_LEN, REQ_MAGIC, RES_MAGIC, ReceiveOptions,
    Request, Response, Result, Status, is_fatal, is_not_found, max_body_len, set_max_body_len,
};
