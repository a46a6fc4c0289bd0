//! CLI + file configuration, layered the way `turn-server`'s `Config`
//! does: `clap` for the entry point, `serde`/`toml` for the parts a
//! deployment wants to template out into a file.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

use sprt::ChannelParams;

/// Command-line entry point for the two-gateway UDP demo harness.
#[derive(Debug, Parser)]
#[command(author, version, about = "V.150.1 modem-over-IP transport core")]
pub struct Cli {
    /// Local address to bind the SPRT and SSE sockets to.
    #[arg(long, default_value = "127.0.0.1:4000")]
    pub bind: SocketAddr,

    /// Remote peer's SPRT/SSE address.
    #[arg(long)]
    pub peer: SocketAddr,

    /// SPRT subsession identifier this side transmits.
    #[arg(long, default_value_t = 1)]
    pub subsession: u8,

    /// RTP payload type carried by both ends' SPRT packets.
    #[arg(long, default_value_t = 96)]
    pub payload_type: u8,

    /// Optional TOML file overriding per-channel tuning (§6.3).
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    pub log_level: log::LevelFilter,
}

/// Per-channel and SSE tunables, loadable from the file named by
/// `--config`. Defaults mirror `sprt::channel::default_channel_parms`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    pub channels: [ChannelTuning; 4],
    pub sse_repetition_count: u8,
    pub sse_repetition_interval_us: u64,
    pub sse_t0_us: u64,
    pub sse_n0: u8,
    pub sse_t1_us: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ChannelTuning {
    pub max_payload_bytes: u16,
    pub window_size: u16,
    pub ta02_timeout_us: u64,
    pub tr03_timeout_us: u64,
    pub max_tries: u8,
}

impl From<ChannelTuning> for ChannelParams {
    fn from(t: ChannelTuning) -> Self {
        ChannelParams {
            max_payload_bytes: t.max_payload_bytes,
            window_size: t.window_size,
            ta02_timeout_us: t.ta02_timeout_us,
            tr03_timeout_us: t.tr03_timeout_us,
            max_tries: t.max_tries,
        }
    }
}

impl Default for ChannelTuning {
    fn default() -> Self {
        let p = sprt::channel::default_channel_parms()[0];
        ChannelTuning {
            max_payload_bytes: p.max_payload_bytes,
            window_size: p.window_size,
            ta02_timeout_us: p.ta02_timeout_us,
            tr03_timeout_us: p.tr03_timeout_us,
            max_tries: p.max_tries,
        }
    }
}

impl Default for TuningConfig {
    fn default() -> Self {
        let parms = sprt::channel::default_channel_parms();
        TuningConfig {
            channels: parms.map(|p| ChannelTuning {
                max_payload_bytes: p.max_payload_bytes,
                window_size: p.window_size,
                ta02_timeout_us: p.ta02_timeout_us,
                tr03_timeout_us: p.tr03_timeout_us,
                max_tries: p.max_tries,
            }),
            sse_repetition_count: 2,
            sse_repetition_interval_us: 20_000,
            sse_t0_us: 50_000,
            sse_n0: 3,
            sse_t1_us: 1_000_000,
        }
    }
}

impl TuningConfig {
    pub fn load(path: Option<&PathBuf>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                Ok(toml::from_str(&text)?)
            }
            None => Ok(TuningConfig::default()),
        }
    }

    pub fn channel_params(&self) -> [ChannelParams; 4] {
        self.channels.map(ChannelParams::from)
    }

    pub fn sse_reliability(&self) -> sse::ReliabilityMethod {
        sse::ReliabilityMethod::ExplicitAck {
            t0_us: self.sse_t0_us,
            n0: self.sse_n0,
            t1_us: self.sse_t1_us,
        }
    }
}
