//! The three SSE reliability schemes of §4.5 (C.4/V.150.1): none,
//! repetition, and explicit acknowledgement. RFC 2198 redundancy is left
//! as a stub per spec.md's own description ("not implemented in the
//! reference; the contract is to stub unless the host implements
//! RFC 2198").

use crate::packet::{MediaState, Packet};
use crate::Error;

const DEFAULT_REPETITION_COUNT: u8 = 2;
const DEFAULT_REPETITION_INTERVAL_US: u64 = 20_000;
const DEFAULT_T0_US: u64 = 50_000;
const DEFAULT_N0: u8 = 3;
const DEFAULT_T1_US: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReliabilityMethod {
    None,
    Repetition {
        count: u8,
        interval_us: u64,
    },
    /// Stub: the host is expected to layer RFC 2198 redundant transport
    /// itself; this engine treats it identically to `None`.
    Rfc2198Redundancy,
    ExplicitAck {
        t0_us: u64,
        n0: u8,
        t1_us: u64,
    },
}

impl Default for ReliabilityMethod {
    fn default() -> Self {
        ReliabilityMethod::ExplicitAck {
            t0_us: DEFAULT_T0_US,
            n0: DEFAULT_N0,
            t1_us: DEFAULT_T1_US,
        }
    }
}

impl ReliabilityMethod {
    pub fn repetition_default() -> Self {
        ReliabilityMethod::Repetition {
            count: DEFAULT_REPETITION_COUNT,
            interval_us: DEFAULT_REPETITION_INTERVAL_US,
        }
    }
}

pub trait SseHandler {
    #[allow(unused_variables)]
    fn on_tx_packet(&mut self, bytes: &[u8]) {}

    #[allow(unused_variables)]
    fn on_remote_state_change(&mut self, remote: MediaState) {}

    #[allow(unused_variables)]
    fn on_timer(&mut self, deadline_us: Option<u64>) {}
}

enum RetryState {
    Idle,
    Repeating { remaining: u8, next: u64 },
    ExplicitBurst { remaining: u8, next: u64 },
    ExplicitForced { next: u64 },
}

pub struct Engine<H: SseHandler> {
    handler: H,
    method: ReliabilityMethod,
    local_media_state: MediaState,
    remote_media_state: MediaState,
    /// The remote's most recent acknowledgement of *our* state.
    remote_ack: Option<MediaState>,
    previous_rx_timestamp: Option<u32>,
    last_tx: Vec<u8>,
    retry: RetryState,
}

impl<H: SseHandler> Engine<H> {
    pub fn new(method: ReliabilityMethod, handler: H) -> Self {
        Self {
            handler,
            method,
            local_media_state: MediaState::InitialAudio,
            remote_media_state: MediaState::InitialAudio,
            remote_ack: None,
            previous_rx_timestamp: None,
            last_tx: Vec::new(),
            retry: RetryState::Idle,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn local_media_state(&self) -> MediaState {
        self.local_media_state
    }

    pub fn remote_media_state(&self) -> MediaState {
        self.remote_media_state
    }

    fn build_packet(&self, forced: bool) -> Packet {
        let explicit_ack = matches!(self.method, ReliabilityMethod::ExplicitAck { .. });
        Packet {
            event: self.local_media_state,
            f: forced,
            x: explicit_ack,
            ric: 0,
            ric_info: 0,
            extension: explicit_ack.then(|| vec![self.remote_media_state.to_u8()].into()),
        }
    }

    fn send(&mut self, forced: bool) {
        let pkt = self.build_packet(forced);
        let bytes = pkt.encode().to_vec();
        self.handler.on_tx_packet(&bytes);
        self.last_tx = bytes;
    }

    /// §4.5 "mode-change send rule": called whenever the local media
    /// state transitions.
    pub fn set_local_media_state(&mut self, state: MediaState, now: u64) {
        self.local_media_state = state;
        self.remote_ack = None;
        self.send(false);
        self.retry = match self.method {
            ReliabilityMethod::None | ReliabilityMethod::Rfc2198Redundancy => RetryState::Idle,
            ReliabilityMethod::Repetition { count, interval_us } => RetryState::Repeating {
                remaining: count,
                next: now + interval_us,
            },
            ReliabilityMethod::ExplicitAck { t0_us, n0, .. } => RetryState::ExplicitBurst {
                remaining: n0,
                next: now + t0_us,
            },
        };
    }

    /// §4.5 receive dedup: packets sharing `rx_timestamp` with the
    /// previous one are ignored.
    pub fn rx_packet(&mut self, bytes: &[u8], rx_timestamp: u32) -> Result<(), Error> {
        if self.previous_rx_timestamp == Some(rx_timestamp) {
            return Ok(());
        }
        self.previous_rx_timestamp = Some(rx_timestamp);

        let pkt = Packet::decode(bytes)?;
        if pkt.event != self.remote_media_state {
            self.remote_media_state = pkt.event;
            self.handler.on_remote_state_change(pkt.event);
        }

        if matches!(self.method, ReliabilityMethod::ExplicitAck { .. }) {
            if let Some(acked) = pkt.remote_media_state() {
                self.remote_ack = Some(acked);
                if acked == self.local_media_state {
                    self.retry = RetryState::Idle;
                }
            }
        }
        Ok(())
    }

    pub fn next_deadline(&self) -> Option<u64> {
        match self.retry {
            RetryState::Idle => None,
            RetryState::Repeating { next, .. } => Some(next),
            RetryState::ExplicitBurst { next, .. } => Some(next),
            RetryState::ExplicitForced { next } => Some(next),
        }
    }

    pub fn timer_expired(&mut self, now: u64) {
        match self.retry {
            RetryState::Idle => {}
            RetryState::Repeating { remaining, next } if now >= next => {
                self.send(false);
                self.retry = if remaining > 1 {
                    let (_, interval_us) = match self.method {
                        ReliabilityMethod::Repetition { count, interval_us } => (count, interval_us),
                        _ => unreachable!(),
                    };
                    RetryState::Repeating {
                        remaining: remaining - 1,
                        next: now + interval_us,
                    }
                } else {
                    RetryState::Idle
                };
            }
            RetryState::ExplicitBurst { remaining, next } if now >= next => {
                self.send(false);
                let (t0_us, t1_us) = match self.method {
                    ReliabilityMethod::ExplicitAck { t0_us, t1_us, .. } => (t0_us, t1_us),
                    _ => unreachable!(),
                };
                self.retry = if remaining > 1 {
                    RetryState::ExplicitBurst {
                        remaining: remaining - 1,
                        next: now + t0_us,
                    }
                } else {
                    RetryState::ExplicitForced { next: now + t1_us }
                };
            }
            RetryState::ExplicitForced { next } if now >= next => {
                self.send(true);
                let t1_us = match self.method {
                    ReliabilityMethod::ExplicitAck { t1_us, .. } => t1_us,
                    _ => unreachable!(),
                };
                self.retry = RetryState::ExplicitForced { next: now + t1_us };
            }
            _ => {}
        }
        self.handler.on_timer(self.next_deadline());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        sent: Vec<Vec<u8>>,
    }

    impl SseHandler for Recorder {
        fn on_tx_packet(&mut self, bytes: &[u8]) {
            self.sent.push(bytes.to_vec());
        }
    }

    #[test]
    fn dedup_drops_repeated_timestamp() {
        let mut eng = Engine::new(ReliabilityMethod::None, Recorder::default());
        let pkt = Packet {
            event: MediaState::ModemRelay,
            f: false,
            x: false,
            ric: 0,
            ric_info: 0,
            extension: None,
        };
        let bytes = pkt.encode();
        eng.rx_packet(&bytes, 100).unwrap();
        assert_eq!(eng.remote_media_state(), MediaState::ModemRelay);

        // a second packet with a different state but the same timestamp
        // must be treated as a duplicate and ignored.
        let pkt2 = Packet {
            event: MediaState::FaxRelay,
            ..pkt
        };
        eng.rx_packet(&pkt2.encode(), 100).unwrap();
        assert_eq!(eng.remote_media_state(), MediaState::ModemRelay);

        eng.rx_packet(&pkt2.encode(), 101).unwrap();
        assert_eq!(eng.remote_media_state(), MediaState::FaxRelay);
    }

    #[test]
    fn explicit_ack_stops_retrying_once_acknowledged() {
        let mut eng = Engine::new(
            ReliabilityMethod::ExplicitAck {
                t0_us: 100,
                n0: 3,
                t1_us: 1000,
            },
            Recorder::default(),
        );
        eng.set_local_media_state(MediaState::ModemRelay, 0);
        assert!(eng.next_deadline().is_some());

        let mut ack = Packet {
            event: MediaState::ModemRelay,
            f: false,
            x: true,
            ric: 0,
            ric_info: 0,
            extension: Some(vec![MediaState::ModemRelay.to_u8()].into()),
        };
        eng.rx_packet(&ack.encode(), 5).unwrap();
        assert!(eng.next_deadline().is_none());

        ack.extension = Some(vec![MediaState::InitialAudio.to_u8()].into());
    }
}
