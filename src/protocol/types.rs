//! Opcode and status tables
//!
//! Both are open sets on the wire: the codec round-trips bytes it does not
//! recognize, so they are modeled as transparent newtypes with associated
//! constants rather than closed enums. The name tables exist for logging and
//! error formatting only and have no effect on wire behavior.

use std::fmt;

/// A memcached binary protocol command code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct CommandCode(pub u8);

impl CommandCode {
    /// Get the value of a key
    pub const GET: Self = Self(0x00);
    /// Store a key unconditionally
    pub const SET: Self = Self(0x01);
    /// Store a key only if it does not exist
    pub const ADD: Self = Self(0x02);
    /// Store a key only if it already exists
    pub const REPLACE: Self = Self(0x03);
    /// Remove a key
    pub const DELETE: Self = Self(0x04);
    /// Add to a numeric value
    pub const INCREMENT: Self = Self(0x05);
    /// Subtract from a numeric value
    pub const DECREMENT: Self = Self(0x06);
    /// Close the connection
    pub const QUIT: Self = Self(0x07);
    /// Invalidate all items
    pub const FLUSH: Self = Self(0x08);
    /// Quiet GET
    pub const GETQ: Self = Self(0x09);
    /// No-op / pipeline flush marker
    pub const NOOP: Self = Self(0x0a);
    /// Server version string
    pub const VERSION: Self = Self(0x0b);
    /// GET echoing the key back
    pub const GETK: Self = Self(0x0c);
    /// Quiet GETK
    pub const GETKQ: Self = Self(0x0d);
    /// Append to an existing value
    pub const APPEND: Self = Self(0x0e);
    /// Prepend to an existing value
    pub const PREPEND: Self = Self(0x0f);
    /// Server statistics
    pub const STAT: Self = Self(0x10);
    /// Quiet SET
    pub const SETQ: Self = Self(0x11);
    /// Quiet ADD
    pub const ADDQ: Self = Self(0x12);
    /// Quiet REPLACE
    pub const REPLACEQ: Self = Self(0x13);
    /// Quiet DELETE
    pub const DELETEQ: Self = Self(0x14);
    /// Quiet INCREMENT
    pub const INCREMENTQ: Self = Self(0x15);
    /// Quiet DECREMENT
    pub const DECREMENTQ: Self = Self(0x16);
    /// Quiet QUIT
    pub const QUITQ: Self = Self(0x17);
    /// Quiet FLUSH
    pub const FLUSHQ: Self = Self(0x18);
    /// Quiet APPEND
    pub const APPENDQ: Self = Self(0x19);
    /// Quiet PREPEND
    pub const PREPENDQ: Self = Self(0x1a);
    /// List supported SASL mechanisms
    pub const SASL_LIST_MECHS: Self = Self(0x20);
    /// Begin SASL authentication
    pub const SASL_AUTH: Self = Self(0x21);
    /// Continue SASL authentication
    pub const SASL_STEP: Self = Self(0x22);
    /// Open a TAP stream
    pub const TAP_CONNECT: Self = Self(0x40);
    /// TAP: a key was mutated
    pub const TAP_MUTATION: Self = Self(0x41);
    /// TAP: a key was deleted
    pub const TAP_DELETE: Self = Self(0x42);
    /// TAP: the store was flushed
    pub const TAP_FLUSH: Self = Self(0x43);
    /// TAP: opaque control message
    pub const TAP_OPAQUE: Self = Self(0x44);
    /// TAP: vbucket state change
    pub const TAP_VBUCKET_SET: Self = Self(0x45);
    /// TAP: checkpoint started
    pub const TAP_CHECKPOINT_START: Self = Self(0x46);
    /// TAP: checkpoint ended
    pub const TAP_CHECKPOINT_END: Self = Self(0x47);

    /// Convert to the wire byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// True for the TAP stream family that appends engine-private data to the
    /// declared extras ([`TAP_MUTATION`](Self::TAP_MUTATION) through
    /// [`TAP_CHECKPOINT_END`](Self::TAP_CHECKPOINT_END) inclusive).
    #[must_use]
    pub const fn has_engine_extras(self) -> bool {
        self.0 >= Self::TAP_MUTATION.0 && self.0 <= Self::TAP_CHECKPOINT_END.0
    }

    /// Symbolic name, if this is a known command code.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::GET => "GET",
            Self::SET => "SET",
            Self::ADD => "ADD",
            Self::REPLACE => "REPLACE",
            Self::DELETE => "DELETE",
            Self::INCREMENT => "INCREMENT",
            Self::DECREMENT => "DECREMENT",
            Self::QUIT => "QUIT",
            Self::FLUSH => "FLUSH",
            Self::GETQ => "GETQ",
            Self::NOOP => "NOOP",
            Self::VERSION => "VERSION",
            Self::GETK => "GETK",
            Self::GETKQ => "GETKQ",
            Self::APPEND => "APPEND",
            Self::PREPEND => "PREPEND",
            Self::STAT => "STAT",
            Self::SETQ => "SETQ",
            Self::ADDQ => "ADDQ",
            Self::REPLACEQ => "REPLACEQ",
            Self::DELETEQ => "DELETEQ",
            Self::INCREMENTQ => "INCREMENTQ",
            Self::DECREMENTQ => "DECREMENTQ",
            Self::QUITQ => "QUITQ",
            Self::FLUSHQ => "FLUSHQ",
            Self::APPENDQ => "APPENDQ",
            Self::PREPENDQ => "PREPENDQ",
            Self::SASL_LIST_MECHS => "SASL_LIST_MECHS",
            Self::SASL_AUTH => "SASL_AUTH",
            Self::SASL_STEP => "SASL_STEP",
            Self::TAP_CONNECT => "TAP_CONNECT",
            Self::TAP_MUTATION => "TAP_MUTATION",
            Self::TAP_DELETE => "TAP_DELETE",
            Self::TAP_FLUSH => "TAP_FLUSH",
            Self::TAP_OPAQUE => "TAP_OPAQUE",
            Self::TAP_VBUCKET_SET => "TAP_VBUCKET_SET",
            Self::TAP_CHECKPOINT_START => "TAP_CHECKPOINT_START",
            Self::TAP_CHECKPOINT_END => "TAP_CHECKPOINT_END",
            _ => return None,
        })
    }
}

impl From<u8> for CommandCode {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02x}", self.0),
        }
    }
}

/// A memcached binary protocol response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Status(pub u16);

impl Status {
    /// The operation succeeded
    pub const SUCCESS: Self = Self(0x00);
    /// Key not found
    pub const KEY_ENOENT: Self = Self(0x01);
    /// Key already exists (or CAS mismatch)
    pub const KEY_EEXISTS: Self = Self(0x02);
    /// Value too large to store
    pub const E2BIG: Self = Self(0x03);
    /// Invalid arguments
    pub const EINVAL: Self = Self(0x04);
    /// Item not stored
    pub const NOT_STORED: Self = Self(0x05);
    /// Incr/decr on a non-numeric value
    pub const DELTA_BADVAL: Self = Self(0x06);
    /// The vbucket does not belong to this server
    pub const NOT_MY_VBUCKET: Self = Self(0x07);
    /// Unknown command
    pub const UNKNOWN_COMMAND: Self = Self(0x81);
    /// Server out of memory
    pub const ENOMEM: Self = Self(0x82);
    /// Temporary failure, retry later
    pub const TMPFAIL: Self = Self(0x86);
    /// Sentinel for errors that did not come from a server response
    pub const UNKNOWN: Self = Self(0xffff);

    /// Convert to the wire value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// True iff this is [`SUCCESS`](Self::SUCCESS)
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == Self::SUCCESS.0
    }

    /// Symbolic name, if this is a known status.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::SUCCESS => "SUCCESS",
            Self::KEY_ENOENT => "KEY_ENOENT",
            Self::KEY_EEXISTS => "KEY_EEXISTS",
            Self::E2BIG => "E2BIG",
            Self::EINVAL => "EINVAL",
            Self::NOT_STORED => "NOT_STORED",
            Self::DELTA_BADVAL => "DELTA_BADVAL",
            Self::NOT_MY_VBUCKET => "NOT_MY_VBUCKET",
            Self::UNKNOWN_COMMAND => "UNKNOWN_COMMAND",
            Self::ENOMEM => "ENOMEM",
            Self::TMPFAIL => "TMPFAIL",
            _ => return None,
        })
    }
}

impl From<u16> for Status {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:04x}", self.0),
        }
    }
}
