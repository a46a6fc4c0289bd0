use std::fmt;

#[derive(Debug)]
pub enum Error {
    Codec(codec::Error),
    /// `tx_info_stream` had no message ID left to try: the far end's
    /// `INIT` did not indicate support for any info-stream variant this
    /// session knows how to send.
    NoAvailableInfoStreamMessage,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Codec(e) => write!(f, "codec error: {e}"),
            Error::NoAvailableInfoStreamMessage => {
                write!(f, "no info-stream message the far end supports is available")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<codec::Error> for Error {
    fn from(e: codec::Error) -> Self {
        Error::Codec(e)
    }
}

