//! Local/far busy flow control on a reliable channel (spec.md §4.2 step 5,
//! §6.2): a busy receiver still slots in-order packets without delivering
//! them, and a busy-clear drains everything buffered on the next tick.

use sprt::channel::default_channel_parms;
use sprt::{Engine, SprtHandler, TcId};

#[derive(Default)]
struct Recorder {
    sent: Vec<Vec<u8>>,
    delivered: Vec<(TcId, u16, Vec<u8>)>,
}

impl SprtHandler for Recorder {
    fn on_tx_packet(&mut self, bytes: &[u8]) {
        self.sent.push(bytes.to_vec());
    }
    fn on_deliver(&mut self, channel: TcId, sequence_no: u16, payload: &[u8]) {
        self.delivered.push((channel, sequence_no, payload.to_vec()));
    }
}

fn engine() -> Engine<Recorder> {
    Engine::new(1, 96, 96, default_channel_parms(), Recorder::default()).unwrap()
}

const RS: u8 = TcId::ReliableSequenced as u8;

#[test]
fn busy_receiver_buffers_without_delivering_until_cleared() {
    let mut tx_side = engine();
    let mut rx_side = engine();

    tx_side.tx(RS, b"one", 0).unwrap();
    let pkt1 = tx_side.handler().sent[0].clone();

    rx_side.set_local_busy(RS, true);
    rx_side.rx_packet(&pkt1, 0).unwrap();
    assert!(
        rx_side.handler().delivered.is_empty(),
        "a busy receiver must not deliver even an in-order packet"
    );

    tx_side.tx(RS, b"two", 1).unwrap();
    let pkt2 = tx_side.handler().sent[1].clone();
    rx_side.rx_packet(&pkt2, 1).unwrap();
    assert!(rx_side.handler().delivered.is_empty());

    let was_busy = rx_side.set_local_busy(RS, false);
    assert!(was_busy);
    rx_side.timer_expired(2);

    assert_eq!(rx_side.handler().delivered.len(), 2);
    assert_eq!(rx_side.handler().delivered[0].2, b"one");
    assert_eq!(rx_side.handler().delivered[1].2, b"two");
}

#[test]
fn far_busy_is_a_plain_advisory_flag() {
    let mut eng = engine();
    assert!(!eng.far_busy(RS));
    eng.set_far_busy(RS, true);
    assert!(eng.far_busy(RS));
    eng.set_far_busy(RS, false);
    assert!(!eng.far_busy(RS));
}
