//! End-to-end joint-engine scenarios from spec.md §8: capability
//! negotiation, the INIT/CONNECT state walk, and the failure paths of
//! §4.8 (bad CRC, wrong channel, pre-INIT message).

use codec::{Message, MessageId};
use session::capability::{SUPPORT_I_CHAR_DYN_CS, SUPPORT_I_CHAR_STAT, SUPPORT_I_RAW_BIT};
use session::{Capabilities, ConnectionState, Session, SessionHandler, StatusReport};

#[derive(Default)]
struct Recorder {
    tx: Vec<Vec<u8>>,
    rx_octets: Vec<u8>,
    statuses: Vec<StatusReport>,
}

impl SessionHandler for Recorder {
    fn on_tx_message(&mut self, bytes: &[u8]) {
        self.tx.push(bytes.to_vec());
    }
    fn on_rx_data(&mut self, bytes: &[u8], _fill: i32) {
        self.rx_octets.extend_from_slice(bytes);
    }
    fn on_status(&mut self, status: StatusReport) {
        self.statuses.push(status);
    }
}

fn near() -> Capabilities {
    Capabilities {
        support: SUPPORT_I_CHAR_STAT | SUPPORT_I_CHAR_DYN_CS,
        ..Capabilities::default()
    }
}

#[test]
fn init_negotiates_capabilities_and_reaches_connected() {
    let mut s = Session::new(near(), vec![MessageId::ICharStat], Recorder::default());
    s.start(0);

    let far_init = Message::Init {
        support: SUPPORT_I_CHAR_STAT | SUPPORT_I_RAW_BIT,
    };
    s.rx_message(&far_init.encode(), 2, 0).unwrap();
    assert_eq!(s.joint_state(), ConnectionState::Inited);
    assert_eq!(s.far_available.support, SUPPORT_I_CHAR_STAT);

    let far_connect = Message::Connect { words: [0; 5] };
    s.rx_message(&far_connect.encode(), 2, 0).unwrap();
    // far has connected; near hasn't announced its own Connect yet.
    assert_eq!(s.joint_state(), ConnectionState::Inited);

    s.send_connect();
    assert_eq!(s.joint_state(), ConnectionState::Connected);
}

#[test]
fn bad_crc_is_reported_and_dropped() {
    let mut s = Session::new(near(), vec![], Recorder::default());
    let init = Message::Init { support: 0x1234 };
    let mut bytes = init.encode();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;

    s.rx_message(&bytes, 2, 0).unwrap();
    assert!(matches!(
        s.handler().statuses.last(),
        Some(StatusReport::CrcFailure { message: MessageId::Init })
    ));
    assert_eq!(s.joint_state(), ConnectionState::Idle);
}

#[test]
fn wrong_channel_is_reported_and_dropped() {
    let mut s = Session::new(near(), vec![], Recorder::default());
    let init = Message::Init { support: 0 };
    // INIT is control-only (channel 2); send it on channel 1 instead.
    s.rx_message(&init.encode(), 1, 0).unwrap();
    assert!(matches!(
        s.handler().statuses.last(),
        Some(StatusReport::WrongChannel { message: MessageId::Init, channel: 1 })
    ));
}

#[test]
fn info_before_init_is_reported_and_dropped() {
    let mut s = Session::new(near(), vec![], Recorder::default());
    let octet = Message::IRawOctet { octet: 0x41 };
    s.rx_message(&octet.encode(), 1, 0).unwrap();
    assert!(matches!(
        s.handler().statuses.last(),
        Some(StatusReport::PreInitMessage { message: MessageId::IRawOctet })
    ));
    assert!(s.handler().rx_octets.is_empty());
}
