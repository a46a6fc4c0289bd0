//! State Signalling Events (ITU-T V.150.1 Annex C): the 4-byte packet
//! format plus the three selectable reliability schemes that carry media
//! state transitions between audio, voice-band-data, modem-relay,
//! fax-relay and text-relay.

pub mod engine;
mod error;
pub mod packet;
pub mod ric;

pub use engine::{Engine, ReliabilityMethod, SseHandler};
pub use error::Error;
pub use packet::{MediaState, Packet};
