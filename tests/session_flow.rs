// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end exercise of discovery -> control session -> session ->
//! table operation -> close, driven entirely by a canned in-memory
//! `Transport`. No real drive or toolchain execution is involved; every
//! response below is hand-built with the same `wire`/`framing`
//! primitives the crate itself uses to parse them.

use std::collections::VecDeque;

use tcg_storage_core::{
    comid::make_comid,
    discovery,
    framing::build_frame,
    session::{ControlSession, ControlSessionOptions, Session, SessionOptions},
    table,
    transport::{Identity, Protocol, Transport, TransportError},
    uid,
    wire::{Encoder, Token},
};

const CAP: u32 = 1 << 20;

/// A scripted `Transport`: every `ifrecv` pops the next canned buffer
/// off a FIFO queue (zero-filling the rest of the caller's buffer), and
/// every `ifsend` on `TcgTper` fails with `NotSupported` to simulate a
/// drive that doesn't support `StackReset` -- exercising the
/// best-effort path in `ControlSession::new`.
struct MockTransport {
    recv_queue: VecDeque<Vec<u8>>,
}

impl MockTransport {
    fn new() -> Self {
        Self { recv_queue: VecDeque::new() }
    }

    fn push_not_ready(&mut self) {
        self.recv_queue.push_back(Vec::new());
    }

    fn push_frame(&mut self, frame: Vec<u8>) {
        self.recv_queue.push_back(frame);
    }
}

impl Transport for MockTransport {
    fn ifsend(&mut self, protocol: Protocol, _spsp: u16, _data: &[u8]) -> Result<(), TransportError> {
        if protocol == Protocol::TcgTper {
            return Err(TransportError::NotSupported);
        }
        Ok(())
    }

    fn ifrecv(&mut self, _protocol: Protocol, _spsp: u16, buf: &mut [u8]) -> Result<(), TransportError> {
        buf.fill(0);
        if let Some(queued) = self.recv_queue.pop_front() {
            let n = queued.len().min(buf.len());
            buf[..n].copy_from_slice(&queued[..n]);
        }
        Ok(())
    }

    fn identify(&self) -> Identity {
        Identity::default()
    }

    fn close(&mut self) {}
}

fn discovery_response() -> Vec<u8> {
    let mut buf = vec![0u8; 48];
    // total_size = response length - 4; filled in once the feature
    // TLVs below are known.
    buf[4..6].copy_from_slice(&1u16.to_be_bytes());
    buf[16..22].copy_from_slice(b"VENDOR");

    // TPer feature: sync supported, buffer management not required.
    buf.extend_from_slice(&0x0001u16.to_be_bytes());
    buf.push(0);
    buf.push(1);
    buf.push(0x01);

    // OpalV2 feature: base ComID 0x1000, 1 ComID, no range crossing.
    buf.extend_from_slice(&0x0203u16.to_be_bytes());
    buf.push(0);
    buf.push(5);
    buf.extend_from_slice(&0x1000u16.to_be_bytes());
    buf.extend_from_slice(&0x0001u16.to_be_bytes());
    buf.push(0x00);

    let total_size = (buf.len() - 4) as u32;
    buf[0..4].copy_from_slice(&total_size.to_be_bytes());
    buf
}

fn success_trailer(enc: &mut Encoder) {
    enc.token(Token::EndOfData);
    enc.start_list();
    enc.uint(0).uint(0).uint(0);
    enc.end_list();
}

fn properties_response_frame(comid_base: u16) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.token(Token::Call);
    enc.bytes(uid::SMUID.as_bytes());
    enc.bytes(uid::method::session_manager::SYNC_PROPERTIES.as_bytes());
    enc.start_list();
    enc.start_list();
    enc.named_uint("MaxComPacketSize", 65536);
    enc.named_uint("MaxPacketSize", 65536);
    enc.named_bool("SequenceNumbers", false);
    enc.end_list();
    enc.end_list();
    success_trailer(&mut enc);

    build_frame(comid_base, 0, 0, 0, 0, &enc.into_bytes(), CAP, CAP).expect("build properties frame")
}

fn start_session_response_frame(comid_base: u16, hsn: u32, tsn: u32) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.token(Token::Call);
    enc.bytes(uid::SMUID.as_bytes());
    enc.bytes(uid::method::session_manager::SYNC_SESSION.as_bytes());
    enc.start_list();
    enc.uint(hsn as u64);
    enc.uint(tsn as u64);
    enc.end_list();
    success_trailer(&mut enc);

    build_frame(comid_base, 0, 0, 0, 0, &enc.into_bytes(), CAP, CAP).expect("build start-session frame")
}

fn authenticate_success_frame(comid_base: u16, tsn: u32, hsn: u32) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.uint(1);
    success_trailer(&mut enc);

    build_frame(comid_base, 0, tsn, hsn, 0, &enc.into_bytes(), CAP, CAP).expect("build authenticate frame")
}

fn close_response_frame(comid_base: u16, tsn: u32, hsn: u32) -> Vec<u8> {
    build_frame(comid_base, 0, tsn, hsn, 0, &[Token::EndOfSession.raw()], CAP, CAP)
        .expect("build close frame")
}

#[test]
fn discovery_through_authenticate_and_close() {
    const HSN: u32 = 7;
    const TSN: u32 = 33;

    let mut transport = MockTransport::new();
    transport.push_frame(discovery_response());
    let disc = discovery::discover(&mut transport).expect("discovery");

    assert!(disc.tper.expect("tper feature").sync_supported);
    assert_eq!(disc.base_comid(), Some(0x1000));
    assert!(disc.is_ssc_recognized());

    let comid = make_comid(0x1000, 0);
    let comid_base = 0x1000u16;

    transport.push_not_ready();
    transport.push_frame(properties_response_frame(comid_base));
    let control = ControlSession::new(&mut transport, &disc, ControlSessionOptions::default().with_comid(comid))
        .expect("control session");
    assert_eq!(control.tper_properties().max_com_packet_size, 65536);
    assert!(!control.tper_properties().sequence_numbers);

    transport.push_not_ready();
    transport.push_frame(start_session_response_frame(comid_base, HSN, TSN));
    let mut session = Session::new(
        &control,
        &mut transport,
        uid::ADMIN_SP,
        SessionOptions::default().with_hsn(HSN),
    )
    .expect("session");
    assert_eq!(session.hsn(), HSN);
    assert_eq!(session.tsn(), TSN);

    transport.push_not_ready();
    transport.push_frame(authenticate_success_frame(comid_base, TSN, HSN));
    let ok = table::authenticate(&mut session, &mut transport, uid::AUTHORITY_SID, Some(b"password"))
        .expect("authenticate");
    assert!(ok);

    transport.push_not_ready();
    transport.push_frame(close_response_frame(comid_base, TSN, HSN));
    session.close(&mut transport).expect("close");

    let err = table::random(&mut session, &mut transport, 8).unwrap_err();
    assert!(matches!(err, tcg_storage_core::Error::SessionAlreadyClosed));
}

#[test]
fn start_session_hsn_mismatch_is_rejected() {
    let mut transport = MockTransport::new();
    transport.push_frame(discovery_response());
    let disc = discovery::discover(&mut transport).expect("discovery");

    let comid = make_comid(0x1000, 0);
    transport.push_not_ready();
    transport.push_frame(properties_response_frame(0x1000));
    let control = ControlSession::new(&mut transport, &disc, ControlSessionOptions::default().with_comid(comid))
        .expect("control session");

    // TPer echoes HSN=42 when the host asked for HSN=7 (seed scenario 6).
    transport.push_not_ready();
    transport.push_frame(start_session_response_frame(0x1000, 42, 99));
    let err = Session::new(&control, &mut transport, uid::ADMIN_SP, SessionOptions::default().with_hsn(7))
        .unwrap_err();
    assert!(matches!(err, tcg_storage_core::Error::InvalidStartSessionResponse(_)));
}
