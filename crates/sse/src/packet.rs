//! The 4-byte SSE packet and its optional extension (§4.5).

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    InitialAudio,
    VoiceBandData,
    ModemRelay,
    FaxRelay,
    TextRelay,
    TextProbe,
}

impl MediaState {
    pub fn to_u8(self) -> u8 {
        use MediaState::*;
        match self {
            InitialAudio => 0,
            VoiceBandData => 1,
            ModemRelay => 2,
            FaxRelay => 3,
            TextRelay => 4,
            TextProbe => 5,
        }
    }

    pub fn from_u8(v: u8) -> Result<Self, Error> {
        use MediaState::*;
        Ok(match v {
            0 => InitialAudio,
            1 => VoiceBandData,
            2 => ModemRelay,
            3 => FaxRelay,
            4 => TextRelay,
            5 => TextProbe,
            other => return Err(Error::InvalidEvent(other)),
        })
    }
}

impl fmt::Display for MediaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaState::InitialAudio => "initial-audio",
            MediaState::VoiceBandData => "voice-band-data",
            MediaState::ModemRelay => "modem-relay",
            MediaState::FaxRelay => "fax-relay",
            MediaState::TextRelay => "text-relay",
            MediaState::TextProbe => "text-probe",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub event: MediaState,
    /// Force-response bit: set on forced-retry packets under explicit-ack.
    pub f: bool,
    /// Extension-present bit.
    pub x: bool,
    pub ric: u8,
    pub ric_info: u16,
    /// Present iff `x`. Under explicit-ack this carries `remote_media_state`
    /// (and, when the host layers RFC 2198 redundancy on top, an RTP-style
    /// timestamp for dedup).
    pub extension: Option<Bytes>,
}

impl Packet {
    /// # Test
    /// ```
    /// use sse::packet::{MediaState, Packet};
    ///
    /// let pkt = Packet {
    ///     event: MediaState::ModemRelay,
    ///     f: false,
    ///     x: true,
    ///     ric: 7,
    ///     ric_info: 0x1234,
    ///     extension: Some(vec![MediaState::InitialAudio.to_u8()].into()),
    /// };
    /// let bytes = pkt.encode();
    /// assert_eq!(Packet::decode(&bytes).unwrap(), pkt);
    /// ```
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(8);
        let byte0 = (self.event.to_u8() << 2) | ((self.f as u8) << 1) | (self.x as u8);
        buf.put_u8(byte0);
        buf.put_u8(self.ric);
        buf.put_u16(self.ric_info);
        if let Some(ext) = &self.extension {
            buf.put_u16(ext.len() as u16 & 0x07FF);
            buf.extend_from_slice(ext);
        }
        buf.freeze()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < 4 {
            return Err(Error::Truncated);
        }
        let mut buf = bytes;
        let byte0 = buf.get_u8();
        let event = MediaState::from_u8(byte0 >> 2)?;
        let f = byte0 & 0b10 != 0;
        let x = byte0 & 0b01 != 0;
        let ric = buf.get_u8();
        let ric_info = buf.get_u16();

        let extension = if x {
            if buf.remaining() < 2 {
                return Err(Error::Truncated);
            }
            let len = (buf.get_u16() & 0x07FF) as usize;
            if buf.remaining() < len {
                return Err(Error::Truncated);
            }
            Some(Bytes::copy_from_slice(&buf[..len]))
        } else {
            None
        };

        Ok(Packet {
            event,
            f,
            x,
            ric,
            ric_info,
            extension,
        })
    }

    /// `remote_media_state` carried in the explicit-ack extension's first
    /// byte, if present.
    pub fn remote_media_state(&self) -> Option<MediaState> {
        self.extension
            .as_ref()
            .and_then(|ext| ext.first())
            .and_then(|&b| MediaState::from_u8(b).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_packets() {
        assert!(matches!(Packet::decode(&[0, 0, 0]), Err(Error::Truncated)));
    }

    #[test]
    fn no_extension_round_trips() {
        let pkt = Packet {
            event: MediaState::FaxRelay,
            f: true,
            x: false,
            ric: 3,
            ric_info: 0xBEEF,
            extension: None,
        };
        let bytes = pkt.encode();
        assert_eq!(bytes.len(), 4);
        assert_eq!(Packet::decode(&bytes).unwrap(), pkt);
    }
}
