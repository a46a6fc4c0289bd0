//! The 6-byte SPRT header (§4.1) and its acknowledgement words.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::Error;

pub const MAX_PACKET_BYTES: usize = 12 + 256;
pub const SEQ_NO_MASK: u16 = 0x3FFF;

/// One `(channel, ack_seq_no)` entry from the packet's acknowledgement list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub channel: u8,
    pub seq_no: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub subsession: u8,
    pub payload_type: u8,
    pub channel: u8,
    pub sequence_no: u16,
    pub base_sequence_no: u16,
    pub acks: Vec<Ack>,
    pub payload: Bytes,
}

impl Packet {
    /// # Test
    /// ```
    /// use sprt::packet::Packet;
    ///
    /// let pkt = Packet {
    ///     subsession: 1,
    ///     payload_type: 96,
    ///     channel: 1,
    ///     sequence_no: 5,
    ///     base_sequence_no: 2,
    ///     acks: vec![sprt::packet::Ack { channel: 1, seq_no: 4 }],
    ///     payload: b"abc"[..].into(),
    /// };
    ///
    /// let bytes = pkt.encode();
    /// let decoded = Packet::decode(&bytes, 96).unwrap();
    /// assert_eq!(decoded, pkt);
    /// ```
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(MAX_PACKET_BYTES);

        let byte0 = (self.subsession & 0x7F) as u16;
        buf.put_u8(byte0 as u8);

        let byte1 = self.payload_type & 0x7F;
        buf.put_u8(byte1);

        let tc_seq: u16 = ((self.channel as u16 & 0x3) << 14) | (self.sequence_no & SEQ_NO_MASK);
        buf.put_u16(tc_seq);

        let noa = self.acks.len().min(3) as u16;
        let noa_base: u16 = (noa << 14) | (self.base_sequence_no & SEQ_NO_MASK);
        buf.put_u16(noa_base);

        for ack in self.acks.iter().take(3) {
            let word: u16 = ((ack.channel as u16 & 0x3) << 14) | (ack.seq_no & SEQ_NO_MASK);
            buf.put_u16(word);
        }

        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }

    pub fn decode(bytes: &[u8], expected_payload_type: u8) -> Result<Self, Error> {
        if bytes.len() < 6 {
            return Err(Error::NotSprtPacket);
        }
        let mut buf = bytes;

        let byte0 = buf.get_u8();
        let x = byte0 & 0x80 != 0;
        let subsession = byte0 & 0x7F;

        let byte1 = buf.get_u8();
        let r = byte1 & 0x80 != 0;
        let payload_type = byte1 & 0x7F;

        if x || r || payload_type != expected_payload_type {
            return Err(Error::NotSprtPacket);
        }

        let tc_seq = buf.get_u16();
        let channel = (tc_seq >> 14) as u8 & 0x3;
        let sequence_no = tc_seq & SEQ_NO_MASK;

        let noa_base = buf.get_u16();
        let noa = (noa_base >> 14) as usize & 0x3;
        let base_sequence_no = noa_base & SEQ_NO_MASK;

        if buf.remaining() < noa * 2 {
            return Err(Error::NotSprtPacket);
        }
        let mut acks = Vec::with_capacity(noa);
        for _ in 0..noa {
            let word = buf.get_u16();
            acks.push(Ack {
                channel: (word >> 14) as u8 & 0x3,
                seq_no: word & SEQ_NO_MASK,
            });
        }

        Ok(Packet {
            subsession,
            payload_type,
            channel,
            sequence_no,
            base_sequence_no,
            acks,
            payload: Bytes::copy_from_slice(buf),
        })
    }
}

/// `(a - b) mod 2^14`, the distance used throughout the window arithmetic.
pub fn seq_distance(a: u16, b: u16) -> u16 {
    (a.wrapping_sub(b)) & SEQ_NO_MASK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_extension_or_reserved_bit() {
        let mut bytes = [0u8; 6];
        bytes[0] = 0x80; // X bit set
        assert!(matches!(
            Packet::decode(&bytes, 0),
            Err(Error::NotSprtPacket)
        ));
    }

    #[test]
    fn seq_distance_wraps_modulo_2_14() {
        assert_eq!(seq_distance(2, 16381), 5);
        assert_eq!(seq_distance(5, 5), 0);
    }
}
