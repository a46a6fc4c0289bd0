//! Per-channel parameter tables, transmit ring and receive reorder buffer.
//!
//! Directly modelled on `sprt_chan_t` (`private/sprt.h`): the transmit
//! ring's retry-timer order is a doubly-linked list through the slot
//! array (`prev_in_time`/`next_in_time`), addressed by `Option<u8>` slot
//! index rather than the original's raw array indices with an `0xFF`
//! sentinel tag.

use std::fmt;

use crate::Error;

pub const MAX_WINDOW_SIZE: usize = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TcId {
    UnreliableUnsequenced = 0,
    ReliableSequenced = 1,
    ExpeditedReliableSequenced = 2,
    UnreliableSequenced = 3,
}

impl TcId {
    pub fn from_u8(v: u8) -> Result<Self, Error> {
        Ok(match v {
            0 => TcId::UnreliableUnsequenced,
            1 => TcId::ReliableSequenced,
            2 => TcId::ExpeditedReliableSequenced,
            3 => TcId::UnreliableSequenced,
            other => return Err(Error::ChannelOutOfRange(other)),
        })
    }

    pub fn is_reliable(self) -> bool {
        matches!(self, TcId::ReliableSequenced | TcId::ExpeditedReliableSequenced)
    }

    pub fn is_sequenced(self) -> bool {
        matches!(
            self,
            TcId::ReliableSequenced | TcId::ExpeditedReliableSequenced | TcId::UnreliableSequenced
        )
    }

    pub const ALL: [TcId; 4] = [
        TcId::UnreliableUnsequenced,
        TcId::ReliableSequenced,
        TcId::ExpeditedReliableSequenced,
        TcId::UnreliableSequenced,
    ];
}

impl fmt::Display for TcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TcId::UnreliableUnsequenced => "unreliable-unsequenced",
            TcId::ReliableSequenced => "reliable-sequenced",
            TcId::ExpeditedReliableSequenced => "expedited-reliable-sequenced",
            TcId::UnreliableSequenced => "unreliable-sequenced",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelParams {
    pub max_payload_bytes: u16,
    pub window_size: u16,
    pub ta02_timeout_us: u64,
    pub tr03_timeout_us: u64,
    pub max_tries: u8,
}

struct Limits {
    min_payload: u16,
    max_payload: u16,
    min_window: u16,
    max_window: u16,
}

const LIMITS: [Limits; 4] = [
    Limits {
        min_payload: 140,
        max_payload: 256,
        min_window: 1,
        max_window: 1,
    },
    Limits {
        min_payload: 132,
        max_payload: 256,
        min_window: 32,
        max_window: 96,
    },
    Limits {
        min_payload: 132,
        max_payload: 256,
        min_window: 8,
        max_window: 32,
    },
    Limits {
        min_payload: 140,
        max_payload: 256,
        min_window: 1,
        max_window: 1,
    },
];

pub const MIN_MAX_TRIES: u8 = 1;
pub const MAX_MAX_TRIES: u8 = 20;
pub const DEFAULT_MAX_TRIES: u8 = 10;

/// `default_channel_parms` from `sprt.c`, treated as a compile-time table.
pub fn default_channel_parms() -> [ChannelParams; 4] {
    [
        ChannelParams {
            max_payload_bytes: 140,
            window_size: 1,
            ta02_timeout_us: 0,
            tr03_timeout_us: 0,
            max_tries: DEFAULT_MAX_TRIES,
        },
        ChannelParams {
            max_payload_bytes: 132,
            window_size: 32,
            ta02_timeout_us: 130_000,
            tr03_timeout_us: 500_000,
            max_tries: DEFAULT_MAX_TRIES,
        },
        ChannelParams {
            max_payload_bytes: 132,
            window_size: 8,
            ta02_timeout_us: 500_000,
            tr03_timeout_us: 500_000,
            max_tries: DEFAULT_MAX_TRIES,
        },
        ChannelParams {
            max_payload_bytes: 140,
            window_size: 1,
            ta02_timeout_us: 0,
            tr03_timeout_us: 0,
            max_tries: DEFAULT_MAX_TRIES,
        },
    ]
}

/// Validate `parms` for `channel` against `channel_parm_limits`.
pub fn validate_channel_parms(channel: u8, parms: &ChannelParams) -> Result<(), Error> {
    let limits = LIMITS
        .get(channel as usize)
        .ok_or(Error::ChannelOutOfRange(channel))?;
    if parms.max_payload_bytes < limits.min_payload || parms.max_payload_bytes > limits.max_payload
    {
        return Err(Error::ParamOutOfRange {
            field: "max_payload_bytes",
        });
    }
    if parms.window_size < limits.min_window || parms.window_size > limits.max_window {
        return Err(Error::ParamOutOfRange { field: "window_size" });
    }
    if parms.max_tries < MIN_MAX_TRIES || parms.max_tries > MAX_MAX_TRIES {
        return Err(Error::ParamOutOfRange { field: "max_tries" });
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct TxSlot {
    payload: Vec<u8>,
    sequence_no: u16,
    tr03_deadline: u64,
    remaining_tries: u8,
    prev_in_time: Option<u8>,
    next_in_time: Option<u8>,
}

/// Transmit-side state for one SPRT channel: `sprt_chan_t` on the `tx` half
/// of `sprt_state_s`.
#[derive(Debug)]
pub struct TxChannel {
    pub params: ChannelParams,
    pub base_sequence_no: u16,
    pub queuing_sequence_no: u16,
    pub busy: bool,
    pub far_busy: bool,
    slots: Vec<Option<TxSlot>>,
    first_in_time: Option<u8>,
    last_in_time: Option<u8>,
    pub ta02_deadline: Option<u64>,
}

impl TxChannel {
    pub fn new(params: ChannelParams) -> Self {
        let window = params.window_size.max(1) as usize;
        Self {
            params,
            base_sequence_no: 0,
            queuing_sequence_no: 0,
            busy: false,
            far_busy: false,
            slots: (0..window).map(|_| None).collect(),
            first_in_time: None,
            last_in_time: None,
            ta02_deadline: None,
        }
    }

    fn window(&self) -> usize {
        self.slots.len()
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// No unacknowledged slots outstanding; safe to resize the window.
    pub fn is_idle(&self) -> bool {
        self.first_in_time.is_none()
    }

    fn slot_index(&self, sequence_no: u16) -> usize {
        (crate::packet::seq_distance(sequence_no, self.base_sequence_no) as usize) % self.window()
    }

    fn unlink(&mut self, idx: u8) {
        let slot = self.slots[idx as usize].as_ref().unwrap();
        let prev = slot.prev_in_time;
        let next = slot.next_in_time;
        match prev {
            Some(p) => self.slots[p as usize].as_mut().unwrap().next_in_time = next,
            None => self.first_in_time = next,
        }
        match next {
            Some(n) => self.slots[n as usize].as_mut().unwrap().prev_in_time = prev,
            None => self.last_in_time = prev,
        }
    }

    fn append_tail(&mut self, idx: u8) {
        let prev_tail = self.last_in_time;
        {
            let slot = self.slots[idx as usize].as_mut().unwrap();
            slot.prev_in_time = prev_tail;
            slot.next_in_time = None;
        }
        match prev_tail {
            Some(t) => self.slots[t as usize].as_mut().unwrap().next_in_time = Some(idx),
            None => self.first_in_time = Some(idx),
        }
        self.last_in_time = Some(idx);
    }

    /// Enqueue `payload` as a new reliable transmission, arming its TR03
    /// deadline. Returns the assigned sequence number.
    pub fn enqueue(&mut self, payload: &[u8], now: u64) -> Result<u16, Error> {
        if payload.len() > self.params.max_payload_bytes as usize {
            return Err(Error::PayloadTooLarge {
                channel: 0,
                len: payload.len(),
                max: self.params.max_payload_bytes,
            });
        }
        if self.is_full() {
            return Err(Error::WindowFull(0));
        }
        let sequence_no = self.queuing_sequence_no;
        let idx = self.slot_index(sequence_no) as u8;
        self.slots[idx as usize] = Some(TxSlot {
            payload: payload.to_vec(),
            sequence_no,
            tr03_deadline: now + self.params.tr03_timeout_us,
            remaining_tries: self.params.max_tries,
            prev_in_time: None,
            next_in_time: None,
        });
        self.append_tail(idx);
        self.queuing_sequence_no = (sequence_no + 1) & crate::packet::SEQ_NO_MASK;
        Ok(sequence_no)
    }

    /// Free the slot acknowledged for `seq_no`, if any, and advance
    /// `base_sequence_no` past any now-contiguous freed slots.
    pub fn ack(&mut self, seq_no: u16) -> bool {
        let idx = self.slot_index(seq_no);
        let matched = matches!(&self.slots[idx], Some(s) if s.sequence_no == seq_no);
        if matched {
            self.unlink(idx as u8);
            self.slots[idx] = None;
        }
        // advance base_sequence_no past any contiguous freed slots at the
        // front of the window
        loop {
            let front = self.slot_index(self.base_sequence_no);
            if self.slots[front].is_some() {
                break;
            }
            if self.base_sequence_no == self.queuing_sequence_no {
                break;
            }
            self.base_sequence_no = (self.base_sequence_no + 1) & crate::packet::SEQ_NO_MASK;
        }
        matched
    }

    /// Slots whose TR03 deadline has passed at `now`: `(sequence_no,
    /// payload)` for retransmission. Each returned slot has its
    /// `remaining_tries` decremented and is moved to the retry-list tail
    /// with a fresh deadline, unless tries are exhausted, in which case it
    /// is dropped and reported via the returned bool.
    pub fn expire_tr03(&mut self, now: u64) -> Vec<(u16, Vec<u8>, bool)> {
        let mut out = Vec::new();
        loop {
            let head = match self.first_in_time {
                Some(h) => h,
                None => break,
            };
            let deadline = self.slots[head as usize].as_ref().unwrap().tr03_deadline;
            if deadline > now {
                break;
            }
            self.unlink(head);
            let exhausted;
            let seq;
            let payload;
            {
                let slot = self.slots[head as usize].as_mut().unwrap();
                slot.remaining_tries = slot.remaining_tries.saturating_sub(1);
                exhausted = slot.remaining_tries == 0;
                seq = slot.sequence_no;
                payload = slot.payload.clone();
            }
            if exhausted {
                self.slots[head as usize] = None;
            } else {
                {
                    let slot = self.slots[head as usize].as_mut().unwrap();
                    slot.tr03_deadline = now + self.params.tr03_timeout_us;
                }
                self.append_tail(head);
            }
            out.push((seq, payload, exhausted));
        }
        out
    }

    pub fn next_tr03_deadline(&self) -> Option<u64> {
        self.first_in_time
            .map(|h| self.slots[h as usize].as_ref().unwrap().tr03_deadline)
    }
}

/// Receive-side state for one SPRT channel: reorder buffer plus sequence
/// counters, mirroring the rx half of `sprt_chan_t`.
#[derive(Debug)]
pub struct RxChannel {
    pub params: ChannelParams,
    pub base_sequence_no: u16,
    pub local_busy: bool,
    slots: Vec<Option<Vec<u8>>>,
}

pub enum RxOutcome {
    /// Payloads to deliver in order, and the base_sequence_no to ack.
    Deliver(Vec<(u16, Vec<u8>)>),
    /// Buffered pending earlier packets; caller should still ACK.
    Buffered,
    /// An already-delivered packet arrived again; re-ACK it.
    Duplicate,
    /// Too far ahead of the window; drop silently, do not ACK.
    Dropped,
}

impl RxChannel {
    pub fn new(params: ChannelParams) -> Self {
        let window = params.window_size.max(1) as usize;
        Self {
            params,
            base_sequence_no: 0,
            local_busy: false,
            slots: (0..window).map(|_| None).collect(),
        }
    }

    fn window(&self) -> usize {
        self.slots.len()
    }

    /// No buffered out-of-order packets outstanding; safe to resize.
    pub fn is_idle(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// §4.2 step 5, reliable-channel branch.
    pub fn receive(&mut self, sequence_no: u16, payload: &[u8]) -> RxOutcome {
        let window = self.window();
        if sequence_no == self.base_sequence_no {
            let idx = 0;
            self.slots[idx] = Some(payload.to_vec());
            let mut delivered = Vec::new();
            if !self.local_busy {
                loop {
                    let front = 0;
                    match self.slots[front].take() {
                        Some(p) => {
                            delivered.push((self.base_sequence_no, p));
                            self.base_sequence_no =
                                (self.base_sequence_no + 1) & crate::packet::SEQ_NO_MASK;
                            self.slots.rotate_left(1);
                        }
                        None => break,
                    }
                }
            }
            return RxOutcome::Deliver(delivered);
        }
        let gap = crate::packet::seq_distance(sequence_no, self.base_sequence_no) as usize;
        if gap < window {
            self.slots[gap] = Some(payload.to_vec());
            RxOutcome::Buffered
        } else if gap > 2 * MAX_WINDOW_SIZE {
            RxOutcome::Duplicate
        } else {
            RxOutcome::Dropped
        }
    }

    /// Drain any buffered packets newly eligible for delivery after the
    /// application clears a local-busy condition.
    pub fn drain_on_busy_clear(&mut self) -> Vec<(u16, Vec<u8>)> {
        let mut delivered = Vec::new();
        loop {
            match self.slots[0].take() {
                Some(p) => {
                    delivered.push((self.base_sequence_no, p));
                    self.base_sequence_no = (self.base_sequence_no + 1) & crate::packet::SEQ_NO_MASK;
                    self.slots.rotate_left(1);
                }
                None => break,
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_enqueue_and_ack_frees_slot() {
        let mut ch = TxChannel::new(default_channel_parms()[1]);
        let seq = ch.enqueue(b"abc", 0).unwrap();
        assert_eq!(seq, 0);
        assert!(!ch.is_full() || ch.window() == 1);
        assert!(ch.ack(seq));
        assert_eq!(ch.base_sequence_no, 1);
    }

    #[test]
    fn tr03_retransmits_then_exhausts() {
        let mut params = default_channel_parms()[1];
        params.max_tries = 2;
        params.tr03_timeout_us = 100;
        let mut ch = TxChannel::new(params);
        ch.enqueue(b"abc", 0).unwrap();
        let expired = ch.expire_tr03(100);
        assert_eq!(expired.len(), 1);
        assert!(!expired[0].2);
        let expired2 = ch.expire_tr03(300);
        assert_eq!(expired2.len(), 1);
        assert!(expired2[0].2);
    }

    #[test]
    fn rx_out_of_order_then_in_order_delivers_both() {
        // spec.md §8 scenario 3: {5, 7, 6} arrive on a reliable channel
        // with base_sequence_no = 5.
        let mut rx = RxChannel::new(default_channel_parms()[1]);
        rx.base_sequence_no = 5;

        match rx.receive(5, b"e") {
            RxOutcome::Deliver(items) => assert_eq!(items, vec![(5, b"e".to_vec())]),
            _ => panic!("expected deliver"),
        }
        assert_eq!(rx.base_sequence_no, 6);

        match rx.receive(7, b"g") {
            RxOutcome::Buffered => {}
            _ => panic!("expected buffered"),
        }
        assert_eq!(rx.base_sequence_no, 6);

        match rx.receive(6, b"f") {
            RxOutcome::Deliver(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0], (6, b"f".to_vec()));
                assert_eq!(items[1], (7, b"g".to_vec()));
            }
            _ => panic!("expected deliver"),
        }
        assert_eq!(rx.base_sequence_no, 8);
    }
}
