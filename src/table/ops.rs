// SPDX-License-Identifier: AGPL-3.0-or-later

//! Generic Get/Set/Next/Authenticate/Random helpers (spec §4.H).
//!
//! Every helper is parameterised on [`ProtocolLevel`] via the
//! [`Session`] it runs over; callers never write Core-vs-Enterprise
//! framing themselves.

use crate::{
    error::{Error, Result},
    method::{MethodCall, ProtocolLevel},
    session::Session,
    transport::Transport,
    uid::{self, Uid},
    wire::{Token, Value},
};

/// One decoded `name -> value` pair from a row's `RowValues` reply.
pub type RowValues = Vec<(String, Value)>;

fn get_method(protocol: ProtocolLevel) -> Uid {
    if protocol.is_enterprise() { uid::method::enterprise::GET } else { uid::method::GET }
}

fn set_method(protocol: ProtocolLevel) -> Uid {
    if protocol.is_enterprise() { uid::method::enterprise::SET } else { uid::method::SET }
}

fn authenticate_method(protocol: ProtocolLevel) -> Uid {
    if protocol.is_enterprise() { uid::method::enterprise::AUTHENTICATE } else { uid::method::AUTHENTICATE }
}

/// `Get(row, startCol, endCol)` (spec §4.H). `None` columns request the
/// full row.
pub fn get(
    session: &mut Session,
    transport: &mut dyn Transport,
    row: Uid,
    start_col: Option<u64>,
    end_col: Option<u64>,
) -> Result<RowValues> {
    let protocol = session.protocol();
    let mut call = MethodCall::new(row, get_method(protocol), protocol);
    if let (Some(s), Some(e)) = (start_col, end_col) {
        call.start_list();
        call.named_uint("StartColumn", s);
        call.named_uint("EndColumn", e);
        call.end_list();
    }
    let payload = call.finish()?;
    let mut args = session.execute(transport, &payload)?;

    // Enterprise wraps the reply in one extra outer list (spec §4.H).
    if protocol.is_enterprise() {
        if let Some(Value::List(inner)) = args.first().cloned() {
            args = inner;
        }
    }

    let values = args
        .first()
        .and_then(Value::as_list)
        .ok_or_else(|| Error::MalformedMethodResponse("Get reply missing RowValues list".into()))?;
    parse_row_values(values)
}

/// `GetFullRow(row)` -- omits the cell block (spec §4.H).
pub fn get_full_row(session: &mut Session, transport: &mut dyn Transport, row: Uid) -> Result<RowValues> {
    get(session, transport, row, None, None)
}

fn parse_row_values(values: &[Value]) -> Result<RowValues> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < values.len() {
        if values[i].eq_token(Token::StartName) {
            let name = values
                .get(i + 1)
                .and_then(Value::as_bytes)
                .ok_or_else(|| Error::MalformedMethodResponse("RowValues entry missing name".into()))?;
            let value = values
                .get(i + 2)
                .ok_or_else(|| Error::MalformedMethodResponse("RowValues entry missing value".into()))?
                .clone();
            out.push((String::from_utf8_lossy(name).into_owned(), value));
            i += 4;
        } else {
            i += 1;
        }
    }
    Ok(out)
}

fn push_named_values(call: &mut MethodCall, values: &[(String, Value)]) -> Result<()> {
    for (name, value) in values {
        match value {
            Value::Uint(v) => {
                call.named_uint(name, *v);
            },
            Value::Bytes(b) => {
                call.named_bytes(name, b);
            },
            _ => return Err(Error::MalformedMethodResponse(format!("unsupported Set value for {name}"))),
        }
    }
    Ok(())
}

/// `Set(row, values)` (spec §4.H). Core wraps the cell values in
/// optional parameter 1 / `"Values"`; Enterprise replaces the wrapper
/// with two preceding empty lists and one extra nesting level.
pub fn set(
    session: &mut Session,
    transport: &mut dyn Transport,
    row: Uid,
    values: &[(String, Value)],
) -> Result<()> {
    let protocol = session.protocol();
    let mut call = MethodCall::new(row, set_method(protocol), protocol);

    if protocol.is_enterprise() {
        call.start_list();
        call.end_list();
        call.start_list();
        call.end_list();
        call.start_list();
        push_named_values(&mut call, values)?;
        call.end_list();
    } else {
        call.start_optional_param(1, "Values");
        call.start_list();
        push_named_values(&mut call, values)?;
        call.end_list();
        call.end_optional_param();
    }

    let payload = call.finish()?;
    session.execute(transport, &payload)?;
    Ok(())
}

/// `Next(table)` -- returns the RowUIDs belonging to `table` (spec
/// §4.H). The Next method UID is shared by both dialects.
pub fn next(session: &mut Session, transport: &mut dyn Transport, table: Uid) -> Result<Vec<Uid>> {
    let protocol = session.protocol();
    let call = MethodCall::new(table, uid::method::NEXT, protocol);
    let payload = call.finish()?;
    let args = session.execute(transport, &payload)?;

    let rows = args
        .first()
        .and_then(Value::as_list)
        .ok_or_else(|| Error::MalformedMethodResponse("Next reply missing RowUID list".into()))?;

    rows.iter()
        .map(|v| {
            v.as_bytes()
                .and_then(|b| <[u8; 8]>::try_from(b).ok())
                .map(Uid::new)
                .ok_or_else(|| Error::MalformedMethodResponse("Next reply contains a non-UID entry".into()))
        })
        .collect()
}

/// `Authenticate` (spec §4.H). `proof` is the optional `Challenge`
/// parameter (password/PIN bytes).
pub fn authenticate(
    session: &mut Session,
    transport: &mut dyn Transport,
    authority: Uid,
    proof: Option<&[u8]>,
) -> Result<bool> {
    let protocol = session.protocol();
    let mut call = MethodCall::new(uid::THIS_SP, authenticate_method(protocol), protocol);
    call.uid(&authority);
    if let Some(p) = proof {
        call.start_optional_param(0, "Challenge");
        call.bytes(p);
        call.end_optional_param();
    }
    let payload = call.finish()?;
    let args = session.execute(transport, &payload)?;

    match args.first() {
        Some(Value::Uint(0)) => Err(Error::AuthenticationFailed),
        Some(Value::Uint(_)) => Ok(true),
        Some(Value::Bytes(_)) => Err(Error::ChallengeResponseNotImplemented),
        _ => Err(Error::MalformedMethodResponse("empty Authenticate response".into())),
    }
}

/// `Random` (spec §4.H): returns `count` random bytes from the TPer.
pub fn random(session: &mut Session, transport: &mut dyn Transport, count: u32) -> Result<Vec<u8>> {
    let protocol = session.protocol();
    let mut call = MethodCall::new(uid::THIS_SP, uid::method::RANDOM, protocol);
    call.uint(count as u64);
    let payload = call.finish()?;
    let args = session.execute(transport, &payload)?;

    args.first()
        .and_then(Value::as_bytes)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| Error::MalformedMethodResponse("Random reply missing byte string".into()))
}
