//! spec.md §8 scenario 2: a reliable-channel packet lost in flight is
//! retransmitted on TR03 expiry and eventually delivered once it gets
//! through.

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
    let mut parms = default_channel_parms();
    parms[1].tr03_timeout_us = 1_000;
    parms[1].max_tries = 3;
    Engine::new(7, 96, 96, parms, Recorder::default()).unwrap()
}

#[test]
fn lost_packet_is_retransmitted_then_delivered() {
    let mut sender = engine();
    let mut receiver = engine();

    sender.tx(1, b"hello", 0).unwrap();
    assert_eq!(sender.handler().sent.len(), 1);
    // the first transmission is "lost": do not deliver it to `receiver`.

    sender.timer_expired(500);
    assert!(sender.handler().sent.len() == 1, "TR03 has not expired yet");

    sender.timer_expired(1_500);
    assert_eq!(sender.handler().sent.len(), 2, "TR03 expiry retransmits once");

    let retransmitted = sender.handler().sent[1].clone();
    receiver.rx_packet(&retransmitted, 1_500).unwrap();
    assert_eq!(
        receiver.handler().delivered,
        vec![(TcId::ReliableSequenced, 0, b"hello".to_vec())]
    );
}

#[test]
fn exhausting_all_tries_reports_excess_retries() {
    use sprt::SprtStatus;

    #[derive(Default)]
    struct StatusRecorder {
        statuses: Vec<SprtStatus>,
    }
    impl SprtHandler for StatusRecorder {
        fn on_status(&mut self, status: SprtStatus) {
            self.statuses.push(status);
        }
    }

    let mut parms = default_channel_parms();
    parms[1].tr03_timeout_us = 1_000;
    parms[1].max_tries = 2;
    let mut sender = Engine::new(7, 96, 96, parms, StatusRecorder::default()).unwrap();

    sender.tx(1, b"x", 0).unwrap();
    sender.timer_expired(1_000); // first retry, 1 try left
    sender.timer_expired(2_000); // exhausted
    assert!(matches!(
        sender.handler().statuses.last(),
        Some(SprtStatus::ExcessRetries { channel: TcId::ReliableSequenced, sequence_no: 0 })
    ));
}
