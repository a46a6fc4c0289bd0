//! Structured status reports surfaced to the host (§6.2, §7).

use codec::MessageId;

use crate::capability::BreakInfo;
use crate::state::ConnectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReport {
    JointStateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    CleardownReceived {
        reason: u8,
    },
    CallDiscriminationTimeout,
    CrcFailure {
        message: MessageId,
    },
    WrongChannel {
        message: MessageId,
        channel: u8,
    },
    /// The message arrived before the joint state it requires: either
    /// any message before `INIT`, or an info-stream/category message
    /// before the state its type requires (`Inited` or `Connected`).
    PreInitMessage {
        message: MessageId,
    },
    /// The far end signalled a break (source, type, duration), mirroring
    /// the `v150_1_near_far_t.break_*` fields `v150_1.c` reports on BREAK
    /// receipt.
    BreakReceived(BreakInfo),
}

/// The out-of-band signal to the (out-of-scope) modem DSP: `V150_1_SIGNAL_*`
/// in `private/v150_1.h`, surfaced per `SPEC_FULL.md` item 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeSignal {
    SwitchToAudio,
    SwitchToData,
    GenerateAnsam,
    Cleardown,
}
