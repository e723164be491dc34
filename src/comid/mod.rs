// SPDX-License-Identifier: AGPL-3.0-or-later

//! ComID allocation, validation, and stack reset (spec §4.C).

use tracing::debug;

use crate::{
    error::{Error, Result},
    transport::{Protocol, Transport, TransportError},
};

/// 32-bit identifier composed of a base 16-bit ComID and a 16-bit
/// extension; `-1` is the invalid sentinel (spec §3).
pub type ComId = i32;

pub const COMID_INVALID: ComId = -1;

const VERIFY_COMID_VALID: u16 = 0x0001;
const STACK_RESET: u16 = 0x0002;

pub fn make_comid(base: u16, ext: u16) -> ComId {
    (((ext as u32) << 16) | base as u32) as ComId
}

/// The low 16 bits of a ComID, i.e. the `spsp` value passed to the
/// transport (spec §4.E step 7: `low16(ComID)`).
pub fn low16(comid: ComId) -> u16 {
    (comid as u32 & 0xFFFF) as u16
}

fn base_ext(comid: ComId) -> (u16, u16) {
    let u = comid as u32;
    ((u & 0xFFFF) as u16, (u >> 16) as u16)
}

fn map_transport_err(e: TransportError) -> Error {
    match e {
        TransportError::NotSupported => Error::NotSupported,
        TransportError::Other(s) => Error::Transport(s),
    }
}

/// Issues one `recv(TCGTPer, 0, 512)` and reads base/extension ComID
/// from the first four bytes (spec §4.C).
pub fn get_comid(transport: &mut dyn Transport) -> Result<ComId> {
    let mut buf = [0u8; 512];
    transport.ifrecv(Protocol::TcgTper, 0, &mut buf).map_err(map_transport_err)?;
    let base = u16::from_be_bytes([buf[0], buf[1]]);
    let ext = u16::from_be_bytes([buf[2], buf[3]]);
    Ok(make_comid(base, ext))
}

/// Writes the 12-byte ComID request (`ComID`, `ComIDExt`, request code)
/// and reads back the response payload, length-prefixed at offset 10
/// (spec §4.C).
fn comid_request(transport: &mut dyn Transport, comid: ComId, request: u16) -> Result<Vec<u8>> {
    let (base, ext) = base_ext(comid);
    let mut out = [0u8; 512];
    out[0..2].copy_from_slice(&base.to_be_bytes());
    out[2..4].copy_from_slice(&ext.to_be_bytes());
    out[4..6].copy_from_slice(&request.to_be_bytes());
    transport.ifsend(Protocol::TcgTper, low16(comid), &out).map_err(map_transport_err)?;

    let mut resp = [0u8; 512];
    transport.ifrecv(Protocol::TcgTper, low16(comid), &mut resp).map_err(map_transport_err)?;

    let len = u16::from_be_bytes([resp[10], resp[11]]) as usize;
    let start = 12usize;
    let end = start.saturating_add(len).min(resp.len());
    Ok(resp.get(start..end).unwrap_or_default().to_vec())
}

/// `true` when the ComID's state is `Issued` (2) or `Associated` (3)
/// (spec §4.C).
pub fn is_valid(transport: &mut dyn Transport, comid: ComId) -> Result<bool> {
    let payload = comid_request(transport, comid, VERIFY_COMID_VALID)?;
    if payload.len() < 4 {
        return Ok(false);
    }
    let state = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
    Ok(state == 2 || state == 3)
}

/// Issues a `StackReset` request. A response shorter than 4 bytes means
/// the TPer reported "pending", which this crate does not support
/// (spec §9 open question); a non-zero status word is likewise fatal.
pub fn stack_reset(transport: &mut dyn Transport, comid: ComId) -> Result<()> {
    let payload = comid_request(transport, comid, STACK_RESET)?;
    if payload.len() < 4 {
        return Err(Error::MalformedMethodResponse(
            "StackReset response is pending, which is not supported".into(),
        ));
    }
    let status = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
    if status != 0 {
        return Err(Error::MalformedMethodResponse(format!(
            "StackReset failed with status word {status}"
        )));
    }
    debug!(comid, "stack reset acknowledged");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_and_splits_base_and_extension() {
        let comid = make_comid(0x0A0B, 0x0001);
        assert_eq!(low16(comid), 0x0A0B);
        assert_eq!(base_ext(comid), (0x0A0B, 0x0001));
    }
}
