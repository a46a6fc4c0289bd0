//! Bit-level codec for the ITU-T V.150.1 message set: the setup/control
//! messages exchanged during capability negotiation, and the info-stream
//! messages that carry the modem's octet/character/bit payload once the
//! session is connected.
//!
//! The wire shapes (`Init`, `Connect`, `Mp`, `Mph`, `Info1a`, `Info1c`,
//! `Infoh`) are described in `SPEC_FULL.md`; every one of the roughly
//! twenty V.150.1 message IDs is built on top of one of these six shapes.

pub mod bitstream;
pub mod crc;
pub mod message;

use std::fmt;

pub use message::{Message, MessageId, CHANNEL_MASK_ANY};

#[derive(Debug)]
pub enum Error {
    /// The bit cursor ran out of input before a field finished decoding.
    Truncated,
    /// CRC mismatch over the protected bit range.
    CrcMismatch { expected: u16, computed: u16 },
    /// The first octet did not map to a known message ID.
    UnknownMessageId(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Truncated => write!(f, "message truncated before decoding finished"),
            Error::CrcMismatch { expected, computed } => {
                write!(f, "crc mismatch: expected {expected:#06x}, computed {computed:#06x}")
            }
            Error::UnknownMessageId(id) => write!(f, "unknown message id {id:#04x}"),
        }
    }
}

impl std::error::Error for Error {}
