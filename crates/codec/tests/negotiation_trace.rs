//! A small realistic trace through the message set, exercising decode
//! against `id()`/`channel_mask()` together rather than each message in
//! isolation (spec.md §8.5 round-trip properties).

use codec::message::CharFormat;
use codec::{Message, MessageId};

#[test]
fn setup_messages_decode_on_the_control_channel_only() {
    let trace = [
        Message::Init { support: 0x00FF },
        Message::JmInfo {
            category_words: [1, 2, 3, 4],
        },
        Message::Connect { words: [1, 2, 3, 4, 5] },
        Message::Cleardown { reason: 7 },
    ];

    for msg in trace {
        let bytes = msg.encode();
        let decoded = Message::decode(&bytes).expect("setup message round-trips");
        assert_eq!(decoded.id(), msg.id());
        assert!(decoded.id().is_allowed_on(2), "{:?} must be eligible on channel 2", decoded.id());
        assert!(!decoded.id().is_allowed_on(1), "{:?} must not ride an info channel", decoded.id());
    }
}

#[test]
fn info_stream_messages_decode_on_info_channels_only() {
    let trace = [
        Message::IRawOctet { octet: 0x5A },
        Message::IOctet { dlci: None, octet: 0x5A },
        Message::ICharDynCs {
            format: CharFormat {
                data_bits: 8,
                parity: 0,
                stop_bits: 1,
            },
            character: b'Q',
            seq: 42,
        },
    ];

    for msg in trace {
        let bytes = msg.encode();
        let decoded = Message::decode(&bytes).expect("info message round-trips");
        assert_eq!(decoded.id(), msg.id());
        assert!(decoded.id().is_allowed_on(1) || decoded.id().is_allowed_on(3));
        assert!(!decoded.id().is_allowed_on(2), "{:?} must not ride the control channel", decoded.id());
    }
}

#[test]
fn flipped_crc_bit_is_rejected_but_id_byte_still_reads() {
    let init = Message::Init { support: 0x1234 };
    let mut bytes = init.encode();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;

    let err = Message::decode(&bytes).unwrap_err();
    assert!(matches!(err, codec::Error::CrcMismatch { .. }));
    assert_eq!(MessageId::from_u8(bytes[0]).unwrap(), MessageId::Init);
}

#[test]
fn unknown_message_id_is_rejected_before_any_bit_parsing() {
    let bytes = vec![0xEE, 0, 0, 0];
    let err = Message::decode(&bytes).unwrap_err();
    assert!(matches!(err, codec::Error::UnknownMessageId(0xEE)));
}
