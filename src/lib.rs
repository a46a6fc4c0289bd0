//! Library half of the `v150-relay` binary: config loading and the
//! two-gateway demonstration harness. The protocol engines themselves
//! live in the `codec`/`sprt`/`sse`/`v150-session` crates; this crate
//! only wires them to real sockets.

pub mod config;
pub mod gateway;

pub use config::{Cli, TuningConfig};
pub use gateway::Gateway;
