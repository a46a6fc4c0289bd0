//! The joint V.150.1 message engine and connection state machine, built
//! on top of the `codec` wire format. The host is expected to feed it
//! bytes that arrived over `sprt`/`sse` transport, but this crate never
//! talks to either directly.

pub mod capability;
pub mod engine;
mod error;
pub mod state;
pub mod status;

pub use capability::{BreakInfo, Capabilities, V42BisParams, V44Params};
pub use engine::{Session, SessionHandler, MR_EVENT_PHYSUP};
pub use error::Error;
pub use state::ConnectionState;
pub use status::{SpeSignal, StatusReport};
