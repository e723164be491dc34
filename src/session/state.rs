// SPDX-License-Identifier: AGPL-3.0-or-later

//! The synchronous method-execution state machine (spec §4.F):
//!
//! ```text
//! Idle --execute--> Sent --poll--> Received --decode--> Done
//!                       |                      \
//!                       +-- EndOfSession detected --> TPerClosedSession
//!                       +-- empty payload N times --> ErrMethodTimeout
//! ```

use std::{thread, time::Duration};

use tracing::trace;

use crate::{
    comid::{ComId, low16},
    error::{Error, Result},
    framing::{build_frame, parse_frame},
    transport::{Protocol, Transport, TransportError},
    wire::Token,
};

/// Bounds the "not ready" poll loop (spec §4.F default: 100 * 10ms).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveTimeout {
    pub retries: u32,
    pub interval: Duration,
}

impl Default for ReceiveTimeout {
    fn default() -> Self {
        Self { retries: 100, interval: Duration::from_millis(10) }
    }
}

/// The framing/transport parameters a single exchange needs. Owned by
/// whichever session (control or regular) is driving it.
pub struct ExchangeParams {
    pub comid: ComId,
    pub comid_ext: u16,
    pub tsn: u32,
    pub hsn: u32,
    /// `TPer.MaxComPacketSize` -- caps what we're allowed to *send*.
    pub tper_max_com_packet_size: u32,
    /// `TPer.MaxPacketSize` -- caps what we're allowed to *send*.
    pub tper_max_packet_size: u32,
    /// `Host.MaxComPacketSize` -- the receive buffer we allocate (spec
    /// §4.E receive algorithm step 1). Independent of the TPer's caps.
    pub host_max_com_packet_size: u32,
    pub sequence_numbers: bool,
    pub timeout: ReceiveTimeout,
}

/// Sends `payload` and polls for a response, implementing the state
/// machine above. `seq_last_xmit` is threaded through so the caller's
/// session can keep it monotonic across calls (spec §3 invariant).
pub fn execute(
    transport: &mut dyn Transport,
    params: &ExchangeParams,
    seq_last_xmit: &mut u32,
    payload: &[u8],
) -> Result<Vec<u8>> {
    drain_unsolicited(transport, params)?;

    let seq_number = if params.sequence_numbers { *seq_last_xmit + 1 } else { 0 };
    let frame = build_frame(
        low16(params.comid),
        params.comid_ext,
        params.tsn,
        params.hsn,
        seq_number,
        payload,
        params.tper_max_com_packet_size,
        params.tper_max_packet_size,
    )?;

    transport
        .ifsend(Protocol::TcgManagement, low16(params.comid), &frame)
        .map_err(map_transport_err)?;
    if params.sequence_numbers {
        *seq_last_xmit = seq_number;
    }
    trace!(tsn = params.tsn, hsn = params.hsn, seq_number, "method sent");

    let data = poll_for_response(transport, params)?;

    if data == [Token::EndOfSession.raw()] {
        return Err(Error::TPerClosedSession);
    }

    Ok(data)
}

/// Before sending, drains any unsolicited payload left over from a
/// prior exchange; receiving one here indicates protocol desync (spec
/// §4.F).
fn drain_unsolicited(transport: &mut dyn Transport, params: &ExchangeParams) -> Result<()> {
    let mut buf = vec![0u8; params.host_max_com_packet_size as usize];
    transport
        .ifrecv(Protocol::TcgManagement, low16(params.comid), &mut buf)
        .map_err(map_transport_err)?;
    match parse_frame(&buf)? {
        None => Ok(()),
        Some(_) => Err(Error::ReceivedUnexpectedResponse),
    }
}

fn poll_for_response(transport: &mut dyn Transport, params: &ExchangeParams) -> Result<Vec<u8>> {
    for attempt in 0..params.timeout.retries {
        let mut buf = vec![0u8; params.host_max_com_packet_size as usize];
        transport
            .ifrecv(Protocol::TcgManagement, low16(params.comid), &mut buf)
            .map_err(map_transport_err)?;

        if let Some(parsed) = parse_frame(&buf)? {
            return Ok(parsed.data);
        }

        trace!(attempt, "not ready, retrying");
        if attempt + 1 < params.timeout.retries {
            thread::sleep(params.timeout.interval);
        }
    }
    Err(Error::MethodTimeout)
}

/// Closes a session: sends a bare `EndOfSession` token, then polls
/// until a non-empty reply arrives and verifies it is exactly
/// `EndOfSession` (spec §4.F).
pub fn close(transport: &mut dyn Transport, params: &ExchangeParams, seq_last_xmit: &mut u32) -> Result<()> {
    let payload = [Token::EndOfSession.raw()];
    let seq_number = if params.sequence_numbers { *seq_last_xmit + 1 } else { 0 };
    let frame = build_frame(
        low16(params.comid),
        params.comid_ext,
        params.tsn,
        params.hsn,
        seq_number,
        &payload,
        params.tper_max_com_packet_size,
        params.tper_max_packet_size,
    )?;
    transport
        .ifsend(Protocol::TcgManagement, low16(params.comid), &frame)
        .map_err(map_transport_err)?;
    if params.sequence_numbers {
        *seq_last_xmit = seq_number;
    }

    let data = poll_for_response(transport, params)?;
    if data != [Token::EndOfSession.raw()] {
        return Err(Error::MalformedMethodResponse(
            "expected a bare EndOfSession in reply to session close".into(),
        ));
    }
    Ok(())
}

fn map_transport_err(e: TransportError) -> Error {
    match e {
        TransportError::NotSupported => Error::NotSupported,
        TransportError::Other(s) => Error::Transport(s),
    }
}
