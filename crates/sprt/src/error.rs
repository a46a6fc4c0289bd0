use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// The datagram did not look like an SPRT packet (X/R set, too short,
    /// or the wrong payload type): the caller should try another sink.
    NotSprtPacket,
    /// `subsession` changed from the value latched on the first packet.
    SubsessionChanged { expected: u8, got: u8 },
    /// `channel` is not one of the four defined transmission channels.
    ChannelOutOfRange(u8),
    /// `tx` was called with a payload larger than the channel allows.
    PayloadTooLarge { channel: u8, len: usize, max: u16 },
    /// The reliable channel's transmit window has no free slot.
    WindowFull(u8),
    /// A channel parameter fell outside `channel_parm_limits`.
    ParamOutOfRange { field: &'static str },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotSprtPacket => write!(f, "not an SPRT packet"),
            Error::SubsessionChanged { expected, got } => {
                write!(f, "subsession changed from {expected} to {got}")
            }
            Error::ChannelOutOfRange(c) => write!(f, "channel {c} out of range"),
            Error::PayloadTooLarge { channel, len, max } => write!(
                f,
                "payload of {len} bytes exceeds channel {channel}'s max of {max}"
            ),
            Error::WindowFull(c) => write!(f, "transmit window full on channel {c}"),
            Error::ParamOutOfRange { field } => write!(f, "parameter `{field}` out of range"),
        }
    }
}

impl std::error::Error for Error {}
