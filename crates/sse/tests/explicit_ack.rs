//! spec.md §8 SSE scenario: explicit-ack handshake between two engines
//! until both sides stop retrying.

use sse::{Engine, MediaState, ReliabilityMethod, SseHandler};

#[derive(Default)]
struct Recorder {
    sent: Vec<Vec<u8>>,
    remote_changes: Vec<MediaState>,
}

impl SseHandler for Recorder {
    fn on_tx_packet(&mut self, bytes: &[u8]) {
        self.sent.push(bytes.to_vec());
    }
    fn on_remote_state_change(&mut self, remote: MediaState) {
        self.remote_changes.push(remote);
    }
}

fn method() -> ReliabilityMethod {
    ReliabilityMethod::ExplicitAck {
        t0_us: 1_000,
        n0: 3,
        t1_us: 10_000,
    }
}

/// Both sides announce a state at the same time, neither having seen the
/// other's yet (a simultaneous-open), so the first exchange can't ack
/// anything; only the retry burst's second round, sent after each side has
/// learned the other's state, carries a usable ack and stops both retries.
#[test]
fn simultaneous_announcements_converge_on_the_second_round() {
    let mut a = Engine::new(method(), Recorder::default());
    let mut b = Engine::new(method(), Recorder::default());

    a.set_local_media_state(MediaState::ModemRelay, 0);
    b.set_local_media_state(MediaState::ModemRelay, 0);

    let a_pkt_1 = a.handler().sent[0].clone();
    let b_pkt_1 = b.handler().sent[0].clone();
    a.rx_packet(&b_pkt_1, 1).unwrap();
    b.rx_packet(&a_pkt_1, 1).unwrap();
    assert!(a.next_deadline().is_some(), "first exchange could not ack yet");
    assert!(b.next_deadline().is_some());

    // t0 fires: each side's second send now embeds the peer's state it
    // just learned, which acks the peer's own local state.
    a.timer_expired(1_000);
    b.timer_expired(1_000);
    let a_pkt_2 = a.handler().sent.last().unwrap().clone();
    let b_pkt_2 = b.handler().sent.last().unwrap().clone();
    a.rx_packet(&b_pkt_2, 2).unwrap();
    b.rx_packet(&a_pkt_2, 2).unwrap();

    assert!(a.next_deadline().is_none(), "a's ack-of-b stops a's retry");
    assert!(b.next_deadline().is_none(), "b's ack-of-a stops b's retry");
}

#[test]
fn repetition_mode_sends_a_fixed_burst_then_stops() {
    let mut eng = Engine::new(
        ReliabilityMethod::Repetition {
            count: 2,
            interval_us: 500,
        },
        Recorder::default(),
    );
    eng.set_local_media_state(MediaState::FaxRelay, 0);
    assert_eq!(eng.handler().sent.len(), 1);

    eng.timer_expired(500);
    assert_eq!(eng.handler().sent.len(), 2);

    eng.timer_expired(1_000);
    assert_eq!(eng.handler().sent.len(), 3);

    eng.timer_expired(1_500);
    assert_eq!(eng.handler().sent.len(), 3, "burst of 2 retries has been exhausted");
    assert!(eng.next_deadline().is_none());
}
