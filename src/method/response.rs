// SPDX-License-Identifier: AGPL-3.0-or-later

//! Decodes a method response buffer into its argument list, handling the
//! trailing status list and the `TPerClosedSession` call pattern (spec
//! §4.F, §4.G, §7).

use crate::{
    error::{Error, Result},
    method::status::MethodStatus,
    uid,
    wire::{Token, Value, decode},
};

/// Decodes `buf`, strips the `EndOfData` / `[status, _, _]` trailer, and
/// returns everything before it as the method's argument list.
///
/// Maps a non-zero status to [`Error::MethodStatus`], and detects a
/// TPer-initiated `CloseSession` call embedded in the stream as
/// [`Error::TPerClosedSession`] (spec §4.F).
pub fn parse_response(buf: &[u8]) -> Result<Vec<Value>> {
    if buf.is_empty() {
        return Err(Error::EmptyMethodResponse);
    }

    let top = decode(buf)?;
    if top.is_empty() {
        return Err(Error::EmptyMethodResponse);
    }

    if contains_close_session(&top) {
        return Err(Error::TPerClosedSession);
    }

    let eod_idx = top
        .iter()
        .position(|v| v.eq_token(Token::EndOfData))
        .ok_or_else(|| Error::MalformedMethodResponse("missing EndOfData".into()))?;

    let status_list = top
        .get(eod_idx + 1)
        .and_then(Value::as_list)
        .ok_or_else(|| Error::MalformedMethodResponse("missing status list".into()))?;

    let status_code = status_list
        .first()
        .and_then(Value::as_uint)
        .ok_or_else(|| Error::MalformedMethodResponse("status list missing status code".into()))?
        as u8;

    if status_code != MethodStatus::SUCCESS {
        return Err(Error::MethodStatus(MethodStatus::from_code(status_code)));
    }

    Ok(top[..eod_idx].to_vec())
}

/// Scans the top-level response for the `Call / SMUID / CloseSession /
/// [HSN, TSN]` pattern the TPer sends to unilaterally end a session.
fn contains_close_session(values: &[Value]) -> bool {
    for w in values.windows(3) {
        let (call, smuid, method) = (&w[0], &w[1], &w[2]);
        if call.eq_token(Token::Call)
            && smuid.as_bytes() == Some(uid::SMUID.as_bytes().as_slice())
            && method.as_bytes() == Some(uid::method::session_manager::CLOSE_SESSION.as_bytes().as_slice())
        {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Encoder;

    fn success_trailer(enc: &mut Encoder) {
        enc.token(Token::EndOfData);
        enc.start_list();
        enc.uint(0).uint(0).uint(0);
        enc.end_list();
    }

    #[test]
    fn plain_success_response_returns_args() {
        let mut enc = Encoder::new();
        enc.uint(7).bytes(b"ok");
        success_trailer(&mut enc);
        let buf = enc.into_bytes();

        let args = parse_response(&buf).expect("parse");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn nonzero_status_maps_to_method_status_error() {
        let mut enc = Encoder::new();
        enc.token(Token::EndOfData);
        enc.start_list();
        enc.uint(0x01).uint(0).uint(0);
        enc.end_list();
        let buf = enc.into_bytes();

        let err = parse_response(&buf).unwrap_err();
        assert!(matches!(err, Error::MethodStatus(MethodStatus::NotAuthorized)));
    }

    #[test]
    fn embedded_close_session_call_is_detected() {
        let mut enc = Encoder::new();
        enc.token(Token::Call);
        enc.bytes(uid::SMUID.as_bytes());
        enc.bytes(uid::method::session_manager::CLOSE_SESSION.as_bytes());
        enc.start_list();
        enc.uint(7).uint(99);
        enc.end_list();
        success_trailer(&mut enc);
        let buf = enc.into_bytes();

        let err = parse_response(&buf).unwrap_err();
        assert!(matches!(err, Error::TPerClosedSession));
    }
}
