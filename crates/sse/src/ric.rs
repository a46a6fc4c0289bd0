//! The flat RIC (reason/info code) enumeration of §4.5, supplemented per
//! `SPEC_FULL.md` item 4 from `v150_1_sse.h`'s MoIP RIC table, the
//! Annex F/T.38 FoIP RIC table, and the CM/JM additional-info bitmask.

use std::fmt;

use crate::Error;

/// MoIP (modem relay) reason/info codes. The numeric assignment below is
/// this crate's own, consistent choice; ITU-T V.150.1 leaves the exact
/// table outside what `SPEC_FULL.md` is able to pin down without the
/// paid standard text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoipRic {
    NullReserved,
    V8Cm,
    V8Jm,
    V21,
    V22Bis,
    V23,
    V32Bis,
    V34,
    V90,
    V92,
    VoiceBandData,
    NoMedia,
    TimeoutNoActivity,
    TimeoutNoCompatibleReply,
    CleardownNormal,
    CleardownIncompatibleProcedure,
    CleardownPhysicalLayerRelease,
    CleardownLinkLayerDisconnect,
    CleardownDataCompressionDisconnect,
    CleardownAbnormalRelease,
    CleardownUnexpectedSignal,
    CleardownUnrecognizedSignal,
    PTransitionDetected,
    PPrimeTransitionDetected,
    JmCategoryInfo,
    /// Vendor-specific codes, conventionally 0xC0-0xFF.
    Vendor(u8),
}

impl MoipRic {
    pub fn to_u8(self) -> u8 {
        use MoipRic::*;
        match self {
            NullReserved => 0,
            V8Cm => 1,
            V8Jm => 2,
            V21 => 3,
            V22Bis => 4,
            V23 => 5,
            V32Bis => 6,
            V34 => 7,
            V90 => 8,
            V92 => 9,
            VoiceBandData => 10,
            NoMedia => 11,
            TimeoutNoActivity => 12,
            TimeoutNoCompatibleReply => 13,
            CleardownNormal => 14,
            CleardownIncompatibleProcedure => 15,
            CleardownPhysicalLayerRelease => 16,
            CleardownLinkLayerDisconnect => 17,
            CleardownDataCompressionDisconnect => 18,
            CleardownAbnormalRelease => 19,
            CleardownUnexpectedSignal => 20,
            CleardownUnrecognizedSignal => 21,
            PTransitionDetected => 22,
            PPrimeTransitionDetected => 23,
            JmCategoryInfo => 24,
            Vendor(code) => code,
        }
    }

    pub fn from_u8(v: u8) -> Result<Self, Error> {
        use MoipRic::*;
        Ok(match v {
            0 => NullReserved,
            1 => V8Cm,
            2 => V8Jm,
            3 => V21,
            4 => V22Bis,
            5 => V23,
            6 => V32Bis,
            7 => V34,
            8 => V90,
            9 => V92,
            10 => VoiceBandData,
            11 => NoMedia,
            12 => TimeoutNoActivity,
            13 => TimeoutNoCompatibleReply,
            14 => CleardownNormal,
            15 => CleardownIncompatibleProcedure,
            16 => CleardownPhysicalLayerRelease,
            17 => CleardownLinkLayerDisconnect,
            18 => CleardownDataCompressionDisconnect,
            19 => CleardownAbnormalRelease,
            20 => CleardownUnexpectedSignal,
            21 => CleardownUnrecognizedSignal,
            22 => PTransitionDetected,
            23 => PPrimeTransitionDetected,
            24 => JmCategoryInfo,
            0xC0..=0xFF => Vendor(v),
            other => return Err(Error::InvalidRic(other)),
        })
    }

    pub fn is_cleardown(self) -> bool {
        use MoipRic::*;
        matches!(
            self,
            CleardownNormal
                | CleardownIncompatibleProcedure
                | CleardownPhysicalLayerRelease
                | CleardownLinkLayerDisconnect
                | CleardownDataCompressionDisconnect
                | CleardownAbnormalRelease
                | CleardownUnexpectedSignal
                | CleardownUnrecognizedSignal
        )
    }

    pub fn is_timeout(self) -> bool {
        matches!(
            self,
            MoipRic::TimeoutNoActivity | MoipRic::TimeoutNoCompatibleReply
        )
    }
}

impl fmt::Display for MoipRic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use MoipRic::*;
        match self {
            NullReserved => write!(f, "null-reserved"),
            V8Cm => write!(f, "v8-cm"),
            V8Jm => write!(f, "v8-jm"),
            V21 => write!(f, "v21"),
            V22Bis => write!(f, "v22bis"),
            V23 => write!(f, "v23"),
            V32Bis => write!(f, "v32bis"),
            V34 => write!(f, "v34"),
            V90 => write!(f, "v90"),
            V92 => write!(f, "v92"),
            VoiceBandData => write!(f, "voice-band-data"),
            NoMedia => write!(f, "no-media"),
            TimeoutNoActivity => write!(f, "timeout-no-activity"),
            TimeoutNoCompatibleReply => write!(f, "timeout-no-compatible-reply"),
            CleardownNormal => write!(f, "cleardown-normal"),
            CleardownIncompatibleProcedure => write!(f, "cleardown-incompatible-procedure"),
            CleardownPhysicalLayerRelease => write!(f, "cleardown-physical-layer-release"),
            CleardownLinkLayerDisconnect => write!(f, "cleardown-link-layer-disconnect"),
            CleardownDataCompressionDisconnect => {
                write!(f, "cleardown-data-compression-disconnect")
            }
            CleardownAbnormalRelease => write!(f, "cleardown-abnormal-release"),
            CleardownUnexpectedSignal => write!(f, "cleardown-unexpected-signal"),
            CleardownUnrecognizedSignal => write!(f, "cleardown-unrecognized-signal"),
            PTransitionDetected => write!(f, "p-transition-detected"),
            PPrimeTransitionDetected => write!(f, "p-prime-transition-detected"),
            JmCategoryInfo => write!(f, "jm-category-info"),
            Vendor(code) => write!(f, "vendor({code:#04x})"),
        }
    }
}

/// Annex F/T.38 fax-relay reason/info codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoipRic {
    NullReserved,
    T30CngDetected,
    T30CedDetected,
    V21Preamble,
    Cleardown,
    Vendor(u8),
}

impl FoipRic {
    pub fn to_u8(self) -> u8 {
        use FoipRic::*;
        match self {
            NullReserved => 0,
            T30CngDetected => 1,
            T30CedDetected => 2,
            V21Preamble => 3,
            Cleardown => 4,
            Vendor(code) => code,
        }
    }

    pub fn from_u8(v: u8) -> Result<Self, Error> {
        use FoipRic::*;
        Ok(match v {
            0 => NullReserved,
            1 => T30CngDetected,
            2 => T30CedDetected,
            3 => V21Preamble,
            4 => Cleardown,
            0xC0..=0xFF => Vendor(v),
            other => return Err(Error::InvalidRic(other)),
        })
    }
}

impl fmt::Display for FoipRic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use FoipRic::*;
        match self {
            NullReserved => write!(f, "null-reserved"),
            T30CngDetected => write!(f, "t30-cng-detected"),
            T30CedDetected => write!(f, "t30-ced-detected"),
            V21Preamble => write!(f, "v21-preamble"),
            Cleardown => write!(f, "cleardown"),
            Vendor(code) => write!(f, "vendor({code:#04x})"),
        }
    }
}

/// Bit flags carried in the `RIC-info` field alongside `JmCategoryInfo`
/// (Table 13), naming which V.8 CM/JM categories were seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CmJmInfo(pub u16);

impl CmJmInfo {
    pub const V34_DUPLEX: u16 = 1 << 0;
    pub const V34_HALF_DUPLEX: u16 = 1 << 1;
    pub const V32_V32BIS: u16 = 1 << 2;
    pub const V22_V22BIS: u16 = 1 << 3;
    pub const V17: u16 = 1 << 4;
    pub const V29: u16 = 1 << 5;
    pub const V27TER: u16 = 1 << 6;
    pub const V26TER: u16 = 1 << 7;

    pub fn has(self, bit: u16) -> bool {
        self.0 & bit != 0
    }

    pub fn set(&mut self, bit: u16, on: bool) {
        if on {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }
}

/// V.150.1 timeout reasons (Table 14).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutReason {
    NoActivityOnVbd,
    NoCompatibleModeAnnounced,
}

impl TimeoutReason {
    pub fn to_str(self) -> &'static str {
        match self {
            TimeoutReason::NoActivityOnVbd => "no-activity-on-vbd",
            TimeoutReason::NoCompatibleModeAnnounced => "no-compatible-mode-announced",
        }
    }
}

/// V.150.1 cleardown reasons (Table 28).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleardownReason {
    Normal,
    IncompatibleProcedure,
    PhysicalLayerRelease,
    LinkLayerDisconnect,
    DataCompressionDisconnect,
    AbnormalRelease,
    UnexpectedSignal,
    UnrecognizedSignal,
}

impl CleardownReason {
    pub fn to_str(self) -> &'static str {
        use CleardownReason::*;
        match self {
            Normal => "normal",
            IncompatibleProcedure => "incompatible-procedure",
            PhysicalLayerRelease => "physical-layer-release",
            LinkLayerDisconnect => "link-layer-disconnect",
            DataCompressionDisconnect => "data-compression-disconnect",
            AbnormalRelease => "abnormal-release",
            UnexpectedSignal => "unexpected-signal",
            UnrecognizedSignal => "unrecognized-signal",
        }
    }
}
