//! Simple Packet Relay Transport (ITU-T V.150.1 Annex B), less the
//! packet-exchange/socket layer, which the host owns.
//!
//! [`engine::Engine`] is the entry point: construct it with the four
//! channels' [`channel::ChannelParams`], then drive it from the host's
//! three events (`rx_packet`, `tx`, `timer_expired`) through the
//! [`engine::SprtHandler`] callback contract.

pub mod channel;
pub mod engine;
mod error;
pub mod packet;
pub mod timer;

pub use channel::{ChannelParams, TcId};
pub use engine::{Engine, SprtHandler, SprtStatus};
pub use error::Error;
pub use packet::{Ack, Packet};
