//! The SPRT engine: packet parse/build, ACK batching, retransmission and
//! delivery dispatch (§4.2-§4.4), grounded on `sprt_rx_packet`, `sprt_tx`
//! and `sprt_timer_expired` in `sprt.c`.

use log::warn;

use crate::channel::{ChannelParams, RxChannel, RxOutcome, TcId, TxChannel};
use crate::packet::{Ack, Packet};
use crate::timer;
use crate::Error;

const DEFAULT_TA01_TIMEOUT_US: u64 = 90_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SprtStatus {
    ExcessRetries { channel: TcId, sequence_no: u16 },
    SubsessionChanged { expected: u8, got: u8 },
    OutOfSequence { channel: TcId, sequence_no: u16 },
}

/// Callback contract of §6.2. Every method defaults to a no-op so a
/// handler only needs to implement the events it cares about.
pub trait SprtHandler {
    #[allow(unused_variables)]
    fn on_tx_packet(&mut self, bytes: &[u8]) {}

    #[allow(unused_variables)]
    fn on_deliver(&mut self, channel: TcId, sequence_no: u16, payload: &[u8]) {}

    #[allow(unused_variables)]
    fn on_timer(&mut self, deadline_us: Option<u64>) {}

    #[allow(unused_variables)]
    fn on_status(&mut self, status: SprtStatus) {}
}

pub struct Engine<H: SprtHandler> {
    handler: H,
    subsession: Option<u8>,
    tx_subsession: u8,
    rx_payload_type: u8,
    tx_payload_type: u8,

    rx: [RxChannel; 4],
    tx: [TxChannel; 4],

    /// Shared across the reliable channels, per `sprt_state_s.tx.ack_queue`.
    ack_queue: Vec<Ack>,
    ta01_deadline: Option<u64>,
    ta01_timeout_us: u64,
    /// Set when a busy-clear should drain buffered packets on the next tick.
    immediate: bool,
}

impl<H: SprtHandler> Engine<H> {
    pub fn new(
        subsession_id: u8,
        rx_payload_type: u8,
        tx_payload_type: u8,
        parms: [ChannelParams; 4],
        handler: H,
    ) -> Result<Self, Error> {
        for (i, p) in parms.iter().enumerate() {
            crate::channel::validate_channel_parms(i as u8, p)?;
        }
        Ok(Self {
            handler,
            subsession: None,
            tx_subsession: subsession_id,
            rx_payload_type,
            tx_payload_type,
            rx: parms.map(RxChannel::new),
            tx: parms.map(TxChannel::new),
            ack_queue: Vec::with_capacity(3),
            ta01_deadline: None,
            ta01_timeout_us: DEFAULT_TA01_TIMEOUT_US,
            immediate: false,
        })
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    fn queue_ack(&mut self, channel: u8, sequence_no: u16, now: u64) {
        if self.ack_queue.is_empty() {
            self.ta01_deadline = Some(now + self.ta01_timeout_us);
        }
        self.ack_queue.push(Ack {
            channel,
            seq_no: sequence_no,
        });
        if self.ack_queue.len() >= 3 {
            self.flush_acks(now);
        }
    }

    fn drain_piggyback(&mut self) -> Vec<Ack> {
        self.ta01_deadline = None;
        std::mem::take(&mut self.ack_queue)
            .into_iter()
            .take(3)
            .collect()
    }

    fn send(&mut self, channel: TcId, sequence_no: u16, payload: &[u8]) {
        let acks = self.drain_piggyback();
        let base_sequence_no = self.rx[channel as usize].base_sequence_no;
        let pkt = Packet {
            subsession: self.tx_subsession,
            payload_type: self.tx_payload_type,
            channel: channel as u8,
            sequence_no,
            base_sequence_no,
            acks,
            payload: payload.to_vec().into(),
        };
        let bytes = pkt.encode();
        self.handler.on_tx_packet(&bytes);
    }

    fn flush_acks(&mut self, _now: u64) {
        if self.ack_queue.is_empty() {
            return;
        }
        self.send(TcId::UnreliableUnsequenced, 0, &[]);
    }

    /// §4.2: process a datagram arriving from the far end.
    pub fn rx_packet(&mut self, bytes: &[u8], now: u64) -> Result<(), Error> {
        let pkt = Packet::decode(bytes, self.rx_payload_type)?;

        match self.subsession {
            None => self.subsession = Some(pkt.subsession),
            Some(expected) if expected != pkt.subsession => {
                self.handler.on_status(SprtStatus::SubsessionChanged {
                    expected,
                    got: pkt.subsession,
                });
                self.subsession = Some(pkt.subsession);
                return Ok(());
            }
            Some(_) => {}
        }

        let channel = TcId::from_u8(pkt.channel)?;

        for ack in &pkt.acks {
            let ack_channel = TcId::from_u8(ack.channel)?;
            if !ack_channel.is_reliable() {
                warn!("received ACK for non-reliable channel {ack_channel}, ignoring");
                continue;
            }
            self.tx[ack.channel as usize].ack(ack.seq_no);
        }

        match channel {
            TcId::UnreliableUnsequenced | TcId::UnreliableSequenced => {
                self.handler.on_deliver(channel, pkt.sequence_no, &pkt.payload);
            }
            TcId::ReliableSequenced | TcId::ExpeditedReliableSequenced => {
                let idx = pkt.channel as usize;
                match self.rx[idx].receive(pkt.sequence_no, &pkt.payload) {
                    RxOutcome::Deliver(items) => {
                        self.queue_ack(pkt.channel, pkt.sequence_no, now);
                        for (seq, payload) in items {
                            self.handler.on_deliver(channel, seq, &payload);
                        }
                    }
                    RxOutcome::Buffered => {
                        self.queue_ack(pkt.channel, pkt.sequence_no, now);
                    }
                    RxOutcome::Duplicate => {
                        self.queue_ack(pkt.channel, pkt.sequence_no, now);
                        self.handler.on_status(SprtStatus::OutOfSequence {
                            channel,
                            sequence_no: pkt.sequence_no,
                        });
                    }
                    RxOutcome::Dropped => {}
                }
            }
        }

        Ok(())
    }

    /// §4.3: `tx(channel, payload)`.
    pub fn tx(&mut self, channel: u8, payload: &[u8], now: u64) -> Result<(), Error> {
        let tc = TcId::from_u8(channel)?;
        let max = self.tx[channel as usize].params.max_payload_bytes;
        if payload.len() > max as usize {
            return Err(Error::PayloadTooLarge {
                channel,
                len: payload.len(),
                max,
            });
        }
        match tc {
            TcId::UnreliableUnsequenced => self.send(tc, 0, payload),
            TcId::UnreliableSequenced => {
                let seq = self.tx[channel as usize].queuing_sequence_no;
                self.tx[channel as usize].queuing_sequence_no =
                    (seq + 1) & crate::packet::SEQ_NO_MASK;
                self.send(tc, seq, payload);
            }
            TcId::ReliableSequenced | TcId::ExpeditedReliableSequenced => {
                let seq = self.tx[channel as usize].enqueue(payload, now)?;
                self.tx[channel as usize].ta02_deadline =
                    Some(now + self.tx[channel as usize].params.ta02_timeout_us);
                self.send(tc, seq, payload);
            }
        }
        Ok(())
    }

    /// §4.4: drive every timer from a single external deadline.
    pub fn timer_expired(&mut self, now: u64) {
        if let Some(deadline) = self.ta01_deadline {
            if now >= deadline && !self.ack_queue.is_empty() {
                self.flush_acks(now);
            }
        }

        for tc in [TcId::ReliableSequenced, TcId::ExpeditedReliableSequenced] {
            let idx = tc as usize;
            if let Some(deadline) = self.tx[idx].ta02_deadline {
                if now >= deadline {
                    self.send(tc, self.tx[idx].queuing_sequence_no, &[]);
                    self.tx[idx].ta02_deadline = Some(now + self.tx[idx].params.ta02_timeout_us);
                }
            }

            let expired = self.tx[idx].expire_tr03(now);
            for (seq, payload, exhausted) in expired {
                if exhausted {
                    self.handler.on_status(SprtStatus::ExcessRetries {
                        channel: tc,
                        sequence_no: seq,
                    });
                } else {
                    self.send(tc, seq, &payload);
                }
            }
        }

        if self.immediate {
            self.immediate = false;
            for tc in [TcId::ReliableSequenced, TcId::ExpeditedReliableSequenced] {
                let idx = tc as usize;
                let drained = self.rx[idx].drain_on_busy_clear();
                for (seq, payload) in drained {
                    self.handler.on_deliver(tc, seq, &payload);
                }
            }
        }

        let deadline = timer::earliest(
            std::iter::once(self.ta01_deadline)
                .chain(self.tx.iter().map(|c| c.ta02_deadline))
                .chain(self.tx.iter().map(|c| c.next_tr03_deadline())),
        );
        self.handler.on_timer(deadline);
    }

    /// Mark the local end of `channel` busy or free. Returns the previous
    /// state. Clearing busy schedules a drain on the next `timer_expired`.
    pub fn set_local_busy(&mut self, channel: u8, busy: bool) -> bool {
        let was_busy = self.rx[channel as usize].local_busy;
        self.rx[channel as usize].local_busy = busy;
        if was_busy && !busy {
            self.immediate = true;
        }
        was_busy
    }

    pub fn far_busy(&self, channel: u8) -> bool {
        self.tx[channel as usize].far_busy
    }

    pub fn set_far_busy(&mut self, channel: u8, busy: bool) {
        self.tx[channel as usize].far_busy = busy;
    }

    pub fn channel_params(&self, channel: u8) -> ChannelParams {
        self.tx[channel as usize].params
    }

    /// Apply new per-channel tuning at runtime, as the host's
    /// `sprt_set_local_tc_*` setters do. Rejected while either side of the
    /// channel has packets in flight, since the window resize would
    /// otherwise orphan outstanding slots.
    pub fn set_channel_params(&mut self, channel: u8, parms: ChannelParams) -> Result<(), Error> {
        crate::channel::validate_channel_parms(channel, &parms)?;
        let idx = channel as usize;
        if !self.tx[idx].is_idle() || !self.rx[idx].is_idle() {
            return Err(Error::ParamOutOfRange {
                field: "channel busy",
            });
        }
        self.tx[idx] = TxChannel::new(parms);
        self.rx[idx] = RxChannel::new(parms);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::default_channel_parms;

    #[derive(Default)]
    struct Recorder {
        sent: Vec<Vec<u8>>,
        delivered: Vec<(TcId, u16, Vec<u8>)>,
        statuses: Vec<SprtStatus>,
    }

    impl SprtHandler for Recorder {
        fn on_tx_packet(&mut self, bytes: &[u8]) {
            self.sent.push(bytes.to_vec());
        }
        fn on_deliver(&mut self, channel: TcId, sequence_no: u16, payload: &[u8]) {
            self.delivered.push((channel, sequence_no, payload.to_vec()));
        }
        fn on_status(&mut self, status: SprtStatus) {
            self.statuses.push(status);
        }
    }

    fn pair() -> (Engine<Recorder>, Engine<Recorder>) {
        let a = Engine::new(1, 96, 96, default_channel_parms(), Recorder::default()).unwrap();
        let b = Engine::new(1, 96, 96, default_channel_parms(), Recorder::default()).unwrap();
        (a, b)
    }

    #[test]
    fn clean_reliable_exchange_delivers_and_acks() {
        let (mut a, mut b) = pair();
        a.tx(1, b"abc", 0).unwrap();
        assert_eq!(a.handler().sent.len(), 1);

        let pkt = a.handler().sent[0].clone();
        b.rx_packet(&pkt, 0).unwrap();
        assert_eq!(b.handler().delivered, vec![(TcId::ReliableSequenced, 0, b"abc".to_vec())]);

        b.timer_expired(b.ta01_timeout_us);
        assert_eq!(b.handler().sent.len(), 1);

        let ack_pkt = b.handler().sent[0].clone();
        a.rx_packet(&ack_pkt, 0).unwrap();
        assert!(a.tx[1].next_tr03_deadline().is_none());
    }

    #[test]
    fn rejects_mismatched_payload_type() {
        let (mut a, _b) = pair();
        let mut bytes = vec![0u8; 6];
        bytes[1] = 5; // payload type mismatch
        assert!(matches!(a.rx_packet(&bytes, 0), Err(Error::NotSprtPacket)));
    }
}
