//! Memcached binary protocol core implementation
//!
//! This module provides the wire format constants, the opcode and status
//! tables, and the request/response codecs.

mod codec;
mod error;
mod request;
mod response;
mod types;

pub use codec::{ReceiveOptions, max_body_len, set_max_body_len};
pub use error::{Error, Result, is_fatal, is_not_found};
pub use request::Request;
pub use response::Response;
pub use types::{CommandCode, Status};

/// Magic byte opening every client-to-server frame
pub const REQ_MAGIC: u8 = 0x80;

/// Magic byte opening every server-to-client frame
pub const RES_MAGIC: u8 = 0x81;

/// Fixed header length in bytes
pub const HDR_LEN: usize = 24;

/// Default cap on the total tail (extras + key + body) accepted on receive
pub const DEFAULT_MAX_BODY_LEN: usize = 1_000_000;

/// Frames with a tail strictly below this many bytes are transmitted in a
/// single write; larger frames go out as header+extras+key, then body.
pub const TRANSMIT_SPLIT_THRESHOLD: u32 = 128;
