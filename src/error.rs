// SPDX-License-Identifier: AGPL-3.0-or-later

//! Closed error taxonomy for the TCG Storage protocol core (spec §7).
//!
//! Framing and method layers never retry; they propagate. Only the
//! session layer's receive loop retries, and only on a "not ready"
//! ComPacket (see [`crate::session::control::ControlSessionOptions`]).

use crate::method::status::MethodStatus;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level "illegal request", or Discovery0 returned a
    /// zero-length response.
    #[error("drive does not support the TCG Storage protocol")]
    NotSupported,

    /// Transport reported a failure that isn't "illegal request".
    #[error("transport error: {0}")]
    Transport(String),

    #[error("ComPacket of {len} bytes exceeds MaxComPacketSize ({max})")]
    TooLargeComPacket { len: usize, max: usize },

    #[error("Packet of {len} bytes exceeds MaxPacketSize ({max})")]
    TooLargePacket { len: usize, max: usize },

    #[error("unbalanced list in data stream")]
    UnbalancedList,

    #[error("unknown atom/token byte 0x{0:02x}")]
    UnknownAtom(u8),

    #[error("medium-length integer atoms are not implemented")]
    MediumIntNotImplemented,

    #[error("long-length integer atoms are not implemented")]
    LongIntNotImplemented,

    #[error("truncated data stream: expected {expected} more bytes, got {got}")]
    TruncatedStream { expected: usize, got: usize },

    #[error("empty method response")]
    EmptyMethodResponse,

    #[error("malformed method response: {0}")]
    MalformedMethodResponse(String),

    #[error("received an unsolicited/unexpected response on this ComID")]
    ReceivedUnexpectedResponse,

    #[error("method call timed out waiting for a response")]
    MethodTimeout,

    #[error("TPer closed the session")]
    TPerClosedSession,

    #[error("session is already closed")]
    SessionAlreadyClosed,

    #[error("TPer method status: {0}")]
    MethodStatus(#[from] MethodStatus),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("a byte challenge response from Authenticate is not implemented")]
    ChallengeResponseNotImplemented,

    #[error("invalid Properties response: {0}")]
    InvalidPropertiesResponse(String),

    #[error("invalid StartSession response: {0}")]
    InvalidStartSessionResponse(String),

    #[error("drive does not advertise synchronous TPer operation")]
    TPerSyncNotSupported,

    #[error("drive requires TPer buffer management, which is not implemented")]
    TPerBufferManagementNotSupported,
}
