use std::fmt;

#[derive(Debug)]
pub enum Error {
    Truncated,
    InvalidEvent(u8),
    InvalidRic(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Truncated => write!(f, "SSE packet shorter than its fixed 4-byte header"),
            Error::InvalidEvent(v) => write!(f, "invalid SSE event code {v}"),
            Error::InvalidRic(v) => write!(f, "invalid SSE RIC code {v}"),
        }
    }
}

impl std::error::Error for Error {}
