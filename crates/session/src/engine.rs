//! The joint message engine: dispatch, ordering rules and capability
//! negotiation of §4.6, grounded on the message handling in `v150_1.c`.

use log::warn;

use codec::message::CharFormat;
use codec::{Message, MessageId};

use crate::capability::{BreakInfo, Capabilities};
use crate::state::ConnectionState;
use crate::status::{SpeSignal, StatusReport};
use crate::Error;

/// `MR_EVENT` event IDs this engine recognises. The full V.150.1 table
/// (`mr_event_id_e`) has more members; only the ones that drive a state
/// transition here are named.
pub const MR_EVENT_PHYSUP: u8 = 1;

/// 8 data bits, no parity, 1 stop bit — used when `tx_info_stream` builds
/// a character-oriented message of its own accord rather than relaying a
/// format the host supplied.
const DEFAULT_CHAR_FORMAT: CharFormat = CharFormat {
    data_bits: 3,
    parity: 0,
    stop_bits: 0,
};

/// The joint state a message type requires before it is accepted, beyond
/// the blanket pre-`INIT` gate above. `None` means no state requirement
/// past having left `Idle`.
fn minimum_required_state(id: MessageId) -> Option<ConnectionState> {
    use MessageId::*;
    match id {
        JmInfo | StartJm | XidXchg | ProfXchg => Some(ConnectionState::Inited),
        Break | BreakAck | IRawOctet | IOctet | ICharStat | ICharDyn | IRawBit | IFrame
        | IOctetCs | ICharStatCs | ICharDynCs => Some(ConnectionState::Connected),
        _ => None,
    }
}

pub trait SessionHandler {
    #[allow(unused_variables)]
    fn on_tx_message(&mut self, bytes: &[u8]) {}

    #[allow(unused_variables)]
    fn on_rx_data(&mut self, bytes: &[u8], fill: i32) {}

    #[allow(unused_variables)]
    fn on_status(&mut self, status: StatusReport) {}

    #[allow(unused_variables)]
    fn on_spe_signal(&mut self, signal: SpeSignal) {}
}

const DEFAULT_CALL_DISCRIMINATION_TIMEOUT_US: u64 = 3_000_000;

pub struct Session<H: SessionHandler> {
    handler: H,
    pub near: Capabilities,
    pub far: Capabilities,
    pub far_available: Capabilities,
    joint_state: ConnectionState,
    /// Priority order for `tx_info_stream`'s message-ID selection.
    info_priority: Vec<MessageId>,
    /// Running character-sequence counter the peer last reported, per
    /// `_CS` info-stream variant, used to compute the delivered `fill`.
    far_cs_seq: Option<u16>,
    /// Running character-sequence counter for our own outgoing `_CS`
    /// info-stream messages.
    local_cs_seq: u16,
    call_discrimination_timeout_us: u64,
    call_discrimination_deadline: Option<u64>,
}

impl<H: SessionHandler> Session<H> {
    pub fn new(near: Capabilities, info_priority: Vec<MessageId>, handler: H) -> Self {
        Self {
            handler,
            near,
            far: Capabilities::default(),
            far_available: Capabilities::default(),
            joint_state: ConnectionState::Idle,
            info_priority,
            far_cs_seq: None,
            local_cs_seq: 0,
            call_discrimination_timeout_us: DEFAULT_CALL_DISCRIMINATION_TIMEOUT_US,
            call_discrimination_deadline: None,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn joint_state(&self) -> ConnectionState {
        self.joint_state
    }

    fn set_joint_state(&mut self, to: ConnectionState) {
        if to != self.joint_state {
            let from = self.joint_state;
            self.joint_state = to;
            self.handler.on_status(StatusReport::JointStateChanged { from, to });
        }
    }

    /// Arm the call-discrimination timer; call once at session start.
    pub fn start(&mut self, now: u64) {
        self.call_discrimination_deadline = Some(now + self.call_discrimination_timeout_us);
    }

    pub fn send_init(&mut self) {
        let msg = Message::Init {
            support: self.near.support,
        };
        self.handler.on_tx_message(&msg.encode());
    }

    /// Announce this side ready to enter `Connected`; joins with a prior
    /// or later `Connect` from the far end (§4.6).
    pub fn send_connect(&mut self) {
        self.near.connection_state = ConnectionState::Connected;
        let msg = Message::Connect { words: [0; 5] };
        self.handler.on_tx_message(&msg.encode());
        if self.far.connection_state.at_least(ConnectionState::Connected) {
            self.set_joint_state(ConnectionState::Connected);
        }
    }

    pub fn send_cleardown(&mut self, reason: u8) {
        self.near.connection_state = ConnectionState::Idle;
        let msg = Message::Cleardown { reason };
        self.handler.on_tx_message(&msg.encode());
        self.set_joint_state(ConnectionState::Idle);
    }

    /// §4.6: process one decoded V.150.1 message arriving on `channel`.
    pub fn rx_message(&mut self, bytes: &[u8], channel: u8, now: u64) -> Result<(), Error> {
        let msg = match Message::decode(bytes) {
            Ok(m) => m,
            Err(codec::Error::CrcMismatch { .. }) => {
                if let Some(id) = bytes.first().copied().and_then(|b| codec::MessageId::from_u8(b).ok()) {
                    self.handler.on_status(StatusReport::CrcFailure { message: id });
                }
                warn!("dropping V.150.1 message with a bad CRC");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let id = msg.id();
        if !id.is_allowed_on(channel) {
            self.handler
                .on_status(StatusReport::WrongChannel { message: id, channel });
            warn!("{id:?} arrived on disallowed channel {channel}");
            return Ok(());
        }

        if self.joint_state == ConnectionState::Idle && !matches!(msg, Message::Init { .. } | Message::Null) {
            self.handler.on_status(StatusReport::PreInitMessage { message: id });
            warn!("{id:?} arrived before INIT");
            return Ok(());
        }

        if let Some(required) = minimum_required_state(id) {
            if !self.joint_state.at_least(required) {
                self.handler.on_status(StatusReport::PreInitMessage { message: id });
                warn!("{id:?} arrived while joint state was only {}", self.joint_state);
                return Ok(());
            }
        }

        match msg {
            Message::Null => {}
            Message::Init { support } => {
                self.far.support = support;
                self.far_available = Capabilities::negotiate_available(&self.near, support);
                self.call_discrimination_deadline = None;
                if self.joint_state == ConnectionState::Idle {
                    self.set_joint_state(ConnectionState::Inited);
                }
            }
            Message::Connect { .. } => {
                self.far.connection_state = ConnectionState::Connected;
                if self.near.connection_state.at_least(ConnectionState::Connected) {
                    self.set_joint_state(ConnectionState::Connected);
                } else {
                    self.near.connection_state = ConnectionState::Connected;
                }
            }
            Message::Cleardown { reason } => {
                self.far.connection_state = ConnectionState::Idle;
                self.set_joint_state(ConnectionState::Idle);
                self.handler.on_status(StatusReport::CleardownReceived { reason });
                self.handler.on_spe_signal(SpeSignal::Cleardown);
            }
            Message::MrEvent {
                event_id, payload, ..
            } => {
                if event_id == MR_EVENT_PHYSUP {
                    self.far.tx_data_rate = payload[0] as u32;
                    self.far.rx_data_rate = payload[1] as u32;
                    self.far.symbol_rate = payload[2] as u32;
                    self.far.connection_state = ConnectionState::Physup;
                    self.handler.on_spe_signal(SpeSignal::SwitchToData);
                }
            }
            Message::Break {
                source,
                kind,
                duration_ms,
            } => {
                let info = BreakInfo {
                    source,
                    kind,
                    duration_ms,
                };
                self.far.break_info = Some(info);
                self.handler.on_status(StatusReport::BreakReceived(info));
            }
            Message::BreakAck => {}
            Message::XidXchg { .. } | Message::ProfXchg { .. } => {}
            Message::JmInfo { category_words } => {
                for (i, w) in category_words.into_iter().enumerate() {
                    self.far.jm_category_id_seen[i] = true;
                    self.far.jm_category_info[i] = w;
                }
            }
            Message::StartJm { category_words } => {
                for (i, w) in category_words.into_iter().enumerate().take(16) {
                    self.far.jm_category_id_seen[i] = true;
                    self.far.jm_category_info[i] = w;
                }
            }
            Message::IRawOctet { octet } => self.handler.on_rx_data(&[octet], -1),
            Message::IOctet { octet, .. } => self.handler.on_rx_data(&[octet], -1),
            Message::ICharStat { character, .. } => self.handler.on_rx_data(&[character], -1),
            Message::ICharDyn { character, .. } => self.handler.on_rx_data(&[character], -1),
            Message::IRawBit { bit } => self.handler.on_rx_data(&[bit as u8], -1),
            Message::IFrame { bit, .. } => self.handler.on_rx_data(&[bit as u8], -1),
            Message::IOctetCs { octet, seq, .. } => {
                let fill = self.cs_fill(seq);
                self.handler.on_rx_data(&[octet], fill);
            }
            Message::ICharStatCs { character, seq, .. } => {
                let fill = self.cs_fill(seq);
                self.handler.on_rx_data(&[character], fill);
            }
            Message::ICharDynCs { character, seq, .. } => {
                let fill = self.cs_fill(seq);
                self.handler.on_rx_data(&[character], fill);
            }
        }

        let _ = now;
        Ok(())
    }

    /// Gap, in lost characters, between the last `_CS` sequence number
    /// seen and this one; -1 on the first `_CS` message.
    fn cs_fill(&mut self, seq: u16) -> i32 {
        let fill = match self.far_cs_seq {
            Some(prev) => (seq.wrapping_sub(prev).wrapping_sub(1)) as i32,
            None => -1,
        };
        self.far_cs_seq = Some(seq);
        fill
    }

    /// §4.6 "Outgoing info-stream selection": walk the priority list and
    /// send `octet` using the first message ID the far end indicated
    /// availability for during `INIT`.
    pub fn tx_info_stream(&mut self, octet: u8) -> Result<(), Error> {
        use crate::capability::*;

        for &id in &self.info_priority.clone() {
            let available = match id {
                MessageId::IRawOctet => true,
                MessageId::IOctet => true,
                MessageId::ICharStat => self.far_available.has(SUPPORT_I_CHAR_STAT),
                MessageId::ICharDyn => self.far_available.has(SUPPORT_I_CHAR_DYN),
                MessageId::IOctetCs => self.far_available.has(SUPPORT_I_OCTET_CS),
                MessageId::ICharStatCs => self.far_available.has(SUPPORT_I_CHAR_STAT_CS),
                MessageId::ICharDynCs => self.far_available.has(SUPPORT_I_CHAR_DYN_CS),
                MessageId::IRawBit => self.far_available.has(SUPPORT_I_RAW_BIT),
                MessageId::IFrame => self.far_available.has(SUPPORT_I_FRAME),
                _ => false,
            };
            if !available {
                continue;
            }
            let msg = match id {
                MessageId::IRawOctet => Message::IRawOctet { octet },
                MessageId::IOctet => Message::IOctet { dlci: None, octet },
                MessageId::ICharStat => Message::ICharStat {
                    format: DEFAULT_CHAR_FORMAT,
                    character: octet,
                },
                MessageId::ICharDyn => Message::ICharDyn {
                    format: DEFAULT_CHAR_FORMAT,
                    character: octet,
                },
                MessageId::IOctetCs => Message::IOctetCs {
                    dlci: None,
                    octet,
                    seq: self.next_local_cs_seq(),
                },
                MessageId::ICharStatCs => Message::ICharStatCs {
                    format: DEFAULT_CHAR_FORMAT,
                    character: octet,
                    seq: self.next_local_cs_seq(),
                },
                MessageId::ICharDynCs => Message::ICharDynCs {
                    format: DEFAULT_CHAR_FORMAT,
                    character: octet,
                    seq: self.next_local_cs_seq(),
                },
                // IRawBit/IFrame carry a single bit, not an octet; this API
                // has no bit to offer them, so they are never selected.
                MessageId::IRawBit | MessageId::IFrame => continue,
                _ => continue,
            };
            self.handler.on_tx_message(&msg.encode());
            return Ok(());
        }
        Err(Error::NoAvailableInfoStreamMessage)
    }

    fn next_local_cs_seq(&mut self) -> u16 {
        let seq = self.local_cs_seq;
        self.local_cs_seq = self.local_cs_seq.wrapping_add(1);
        seq
    }

    pub fn timer_expired(&mut self, now: u64) {
        if let Some(deadline) = self.call_discrimination_deadline {
            if now >= deadline && self.joint_state == ConnectionState::Idle {
                self.call_discrimination_deadline = None;
                self.handler.on_status(StatusReport::CallDiscriminationTimeout);
            }
        }
    }
}
