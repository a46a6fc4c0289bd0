//! The runnable demonstration harness: two blocking UDP sockets (one for
//! SPRT, one for SSE) driving the `sprt`/`sse`/`v150-session` engines,
//! the way `turn-server`'s `main.rs` drives its session map from a
//! socket loop, minus the async runtime — the core here has nothing
//! concurrent to hand off to.

use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use codec::MessageId;
use session::{Session, SessionHandler, SpeSignal, StatusReport};
use sprt::{ChannelParams, Engine as SprtEngine, SprtHandler, SprtStatus, TcId};
use sse::{Engine as SseEngine, ReliabilityMethod, SseHandler};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Buffers outgoing SPRT packets so the gateway's run loop can push them
/// to the socket outside of the engine's own borrow.
#[derive(Default)]
struct SprtBridge {
    outbound: Vec<Vec<u8>>,
    inbound_for_session: Vec<(u8, Vec<u8>)>,
}

impl SprtHandler for SprtBridge {
    fn on_tx_packet(&mut self, bytes: &[u8]) {
        self.outbound.push(bytes.to_vec());
    }

    fn on_deliver(&mut self, channel: TcId, sequence_no: u16, payload: &[u8]) {
        debug!("sprt delivered {} bytes on {channel} seq {sequence_no}", payload.len());
        if !payload.is_empty() {
            self.inbound_for_session.push((channel as u8, payload.to_vec()));
        }
    }

    fn on_status(&mut self, status: SprtStatus) {
        warn!("sprt status: {status:?}");
    }
}

#[derive(Default)]
struct SseBridge {
    outbound: Vec<Vec<u8>>,
}

impl SseHandler for SseBridge {
    fn on_tx_packet(&mut self, bytes: &[u8]) {
        self.outbound.push(bytes.to_vec());
    }

    fn on_remote_state_change(&mut self, remote: sse::MediaState) {
        info!("remote media state changed to {remote}");
    }
}

#[derive(Default)]
struct SessionBridge {
    /// Encoded V.150.1 messages waiting to go out over an SPRT channel;
    /// the run loop pulls these and calls `sprt.tx`.
    outbound: Vec<Vec<u8>>,
    received_octets: Vec<u8>,
}

impl SessionHandler for SessionBridge {
    fn on_tx_message(&mut self, bytes: &[u8]) {
        self.outbound.push(bytes.to_vec());
    }

    fn on_rx_data(&mut self, bytes: &[u8], fill: i32) {
        if fill > 0 {
            warn!("{fill} characters lost before this info-stream delivery");
        }
        self.received_octets.extend_from_slice(bytes);
    }

    fn on_status(&mut self, status: StatusReport) {
        info!("session status: {status:?}");
    }

    fn on_spe_signal(&mut self, signal: SpeSignal) {
        info!("signalling modem DSP: {signal:?}");
    }
}

/// One end of the demonstration call: an SPRT engine, an SSE engine, the
/// joint message engine, and the sockets wiring them to a peer.
pub struct Gateway {
    sprt: SprtEngine<SprtBridge>,
    sse: SseEngine<SseBridge>,
    session: Session<SessionBridge>,
    sprt_socket: UdpSocket,
    sse_socket: UdpSocket,
    peer_sprt: SocketAddr,
    peer_sse: SocketAddr,
    started: Instant,
    info_channel: u8,
}

impl Gateway {
    pub fn bind(
        bind_addr: SocketAddr,
        peer_addr: SocketAddr,
        subsession_id: u8,
        payload_type: u8,
        channel_parms: [ChannelParams; 4],
        sse_reliability: ReliabilityMethod,
        near: session::Capabilities,
        info_priority: Vec<MessageId>,
    ) -> anyhow::Result<Self> {
        let sprt_socket = UdpSocket::bind(bind_addr)?;
        sprt_socket.set_read_timeout(Some(POLL_INTERVAL))?;
        let mut sse_addr = bind_addr;
        sse_addr.set_port(bind_addr.port() + 1);
        let sse_socket = UdpSocket::bind(sse_addr)?;
        sse_socket.set_read_timeout(Some(POLL_INTERVAL))?;

        let mut peer_sse = peer_addr;
        peer_sse.set_port(peer_addr.port() + 1);

        let sprt = SprtEngine::new(
            subsession_id,
            payload_type,
            payload_type,
            channel_parms,
            SprtBridge::default(),
        )
        .map_err(|e| anyhow::anyhow!("invalid SPRT channel tuning: {e}"))?;

        Ok(Self {
            sprt,
            sse: SseEngine::new(sse_reliability, SseBridge::default()),
            session: Session::new(near, info_priority, SessionBridge::default()),
            sprt_socket,
            sse_socket,
            peer_sprt: peer_addr,
            peer_sse,
            started: Instant::now(),
            info_channel: TcId::ReliableSequenced as u8,
        })
    }

    fn now_us(&self) -> u64 {
        self.started.elapsed().as_micros() as u64
    }

    pub fn send_init(&mut self) -> anyhow::Result<()> {
        self.session.start(self.now_us());
        self.session.send_init();
        self.flush_session()
    }

    pub fn send_connect(&mut self) -> anyhow::Result<()> {
        self.session.send_connect();
        self.flush_session()
    }

    /// Queue one octet of modem data for delivery over the negotiated
    /// info-stream message type.
    pub fn send_octet(&mut self, octet: u8) -> anyhow::Result<()> {
        self.session.tx_info_stream(octet)?;
        self.flush_session()
    }

    fn flush_session(&mut self) -> anyhow::Result<()> {
        let now = self.now_us();
        let pending: Vec<Vec<u8>> = std::mem::take(&mut self.session.handler_mut().outbound);
        for bytes in pending {
            self.sprt.tx(self.info_channel, &bytes, now)?;
        }
        self.flush_sprt()
    }

    fn flush_sprt(&mut self) -> std::io::Result<()> {
        let pending: Vec<Vec<u8>> = std::mem::take(&mut self.sprt.handler_mut().outbound);
        for bytes in pending {
            self.sprt_socket.send_to(&bytes, self.peer_sprt)?;
        }
        Ok(())
    }

    fn flush_sse(&mut self) -> std::io::Result<()> {
        let pending: Vec<Vec<u8>> = std::mem::take(&mut self.sse.handler_mut().outbound);
        for bytes in pending {
            self.sse_socket.send_to(&bytes, self.peer_sse)?;
        }
        Ok(())
    }

    pub fn set_local_media_state(&mut self, state: sse::MediaState) -> std::io::Result<()> {
        let now = self.now_us();
        self.sse.set_local_media_state(state, now);
        self.flush_sse()
    }

    /// One pass of the run loop: poll both sockets for at most
    /// `POLL_INTERVAL`, dispatch anything received, drive both timer
    /// wheels, and flush anything the dispatch produced.
    pub fn poll_once(&mut self) -> anyhow::Result<()> {
        let mut buf = [0u8; 2048];
        match self.sprt_socket.recv_from(&mut buf) {
            Ok((n, from)) => {
                if from != self.peer_sprt {
                    debug!("ignoring SPRT datagram from unexpected peer {from}");
                } else {
                    let now = self.now_us();
                    if let Err(e) = self.sprt.rx_packet(&buf[..n], now) {
                        warn!("dropping malformed SPRT packet: {e}");
                    }
                    let delivered: Vec<(u8, Vec<u8>)> =
                        std::mem::take(&mut self.sprt.handler_mut().inbound_for_session);
                    for (channel, payload) in delivered {
                        if let Err(e) = self.session.rx_message(&payload, channel, now) {
                            warn!("dropping malformed V.150.1 message: {e}");
                        }
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => return Err(e.into()),
        }

        match self.sse_socket.recv_from(&mut buf) {
            Ok((n, from)) => {
                if from != self.peer_sse {
                    debug!("ignoring SSE datagram from unexpected peer {from}");
                } else {
                    let now = self.now_us() as u32;
                    if let Err(e) = self.sse.rx_packet(&buf[..n], now) {
                        warn!("dropping malformed SSE packet: {e}");
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => return Err(e.into()),
        }

        let now = self.now_us();
        self.sprt.timer_expired(now);
        self.session.timer_expired(now);
        self.sse.timer_expired(now);

        self.flush_sprt()?;
        self.flush_sse()?;
        Ok(())
    }

    pub fn received_octets(&self) -> &[u8] {
        &self.session.handler().received_octets
    }
}
