//! Per-side capability/parameter record, modelled on `v150_1_near_far_t`
//! (`private/v150_1.h`). `near` describes what this session supports;
//! `far` is populated from the peer's `INIT`.

use crate::state::ConnectionState;

pub const SUPPORT_I_OCTET_CS: u16 = 1 << 0;
pub const SUPPORT_I_CHAR_STAT_CS: u16 = 1 << 1;
pub const SUPPORT_I_CHAR_DYN_CS: u16 = 1 << 2;
pub const SUPPORT_I_CHAR_STAT: u16 = 1 << 3;
pub const SUPPORT_I_CHAR_DYN: u16 = 1 << 4;
pub const SUPPORT_I_FRAME: u16 = 1 << 5;
pub const SUPPORT_I_RAW_BIT: u16 = 1 << 6;
pub const SUPPORT_DLCI: u16 = 1 << 7;
pub const SUPPORT_ECRXCH: u16 = 1 << 8;
pub const SUPPORT_NECRXCH: u16 = 1 << 9;
pub const SUPPORT_ASYMMETRIC_TYPES: u16 = 1 << 10;

/// V.42bis sub-parameters (`v42bis_p0`..`v42bis_p2` in `v150_1_near_far_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct V42BisParams {
    pub p0: u8,
    pub p1: u8,
    pub p2: u8,
}

/// V.44 sub-parameters (`v44_c0`, `v44_p0`..`v44_p3t`/`p3r`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct V44Params {
    pub c0: u16,
    pub p0: u16,
    pub p1t: u16,
    pub p1r: u16,
    pub p2t: u16,
    pub p2r: u16,
    pub p3t: u16,
    pub p3r: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakInfo {
    pub source: u8,
    pub kind: u8,
    pub duration_ms: u16,
}

/// One side's negotiated state: the `near` or `far` half of
/// `v150_1_near_far_t`.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub support: u16,
    pub jm_category_id_seen: [bool; 16],
    pub jm_category_info: [u16; 16],
    pub v42bis: V42BisParams,
    pub v44: V44Params,
    pub dlci_default: u8,
    pub xid_profile: u8,
    pub tx_data_rate: u32,
    pub rx_data_rate: u32,
    pub symbol_rate: u32,
    pub connection_state: ConnectionState,
    pub busy: bool,
    pub break_info: Option<BreakInfo>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            support: 0,
            jm_category_id_seen: [false; 16],
            jm_category_info: [0; 16],
            v42bis: V42BisParams::default(),
            v44: V44Params::default(),
            dlci_default: 0,
            xid_profile: 0,
            tx_data_rate: 0,
            rx_data_rate: 0,
            symbol_rate: 0,
            connection_state: ConnectionState::Idle,
            busy: false,
            break_info: None,
        }
    }
}

impl Capabilities {
    pub fn has(&self, flag: u16) -> bool {
        self.support & flag != 0
    }

    /// §4.6: the sender's capability flags ANDed with the local
    /// "supported" flags gives per-feature "available" flags; `I_OCTET`
    /// availability is derived separately from the local DLCI flag
    /// (there is no dedicated wire bit for it).
    pub fn negotiate_available(local: &Capabilities, far_support: u16) -> Capabilities {
        let mut available = Capabilities {
            support: local.support & far_support,
            ..Capabilities::default()
        };
        if local.has(SUPPORT_DLCI) {
            available.support |= SUPPORT_DLCI;
        }
        available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiate_available_is_an_intersection() {
        // spec.md §8 end-to-end scenario 1
        let near = Capabilities {
            support: SUPPORT_I_CHAR_STAT | SUPPORT_I_CHAR_DYN_CS,
            ..Capabilities::default()
        };
        let far_support = SUPPORT_I_CHAR_STAT | SUPPORT_I_RAW_BIT;
        let available = Capabilities::negotiate_available(&near, far_support);
        assert_eq!(available.support, SUPPORT_I_CHAR_STAT);
    }
}
