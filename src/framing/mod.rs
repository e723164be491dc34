// SPDX-License-Identifier: AGPL-3.0-or-later

//! Assembles/disassembles SubPacket -> Packet -> ComPacket, pads, and
//! enforces size limits (spec §4.E). This layer is stateless; sequence
//! numbers and session identifiers are supplied by the caller (the
//! session layer owns that state per spec §3's invariants).

pub mod packet;

use tracing::trace;
use zerocopy::{FromBytes, IntoBytes};

use crate::{
    error::{Error, Result},
    framing::packet::{
        COM_PACKET_LEN, ComPacketHeader, PACKET_LEN, PacketHeader, SUB_PACKET_KIND_DATA,
        SUB_PACKET_LEN, SubPacketHeader,
    },
};

const WIRE_ALIGN: usize = 512;

fn pad_to(buf: &mut Vec<u8>, align: usize) {
    let rem = buf.len() % align;
    if rem != 0 {
        buf.resize(buf.len() + (align - rem), 0);
    }
}

/// Builds the full on-wire frame for one method payload (spec §4.E send
/// algorithm, steps 1-5). Step 6 (incrementing `SeqLastXmit`) and step 7
/// (the actual `send`) are the session layer's responsibility.
pub fn build_frame(
    comid: u16,
    comid_ext: u16,
    tsn: u32,
    hsn: u32,
    seq_number: u32,
    payload: &[u8],
    max_com_packet_size: u32,
    max_packet_size: u32,
) -> Result<Vec<u8>> {
    // 1. SubPacket.
    let mut sub_body = payload.to_vec();
    let sub_header = SubPacketHeader::new(SUB_PACKET_KIND_DATA, payload.len() as u32);
    let mut sub = sub_header.as_bytes().to_vec();
    sub.append(&mut sub_body);
    pad_to(&mut sub, 4);

    // 2. Packet.
    let packet_header = PacketHeader::new(tsn, hsn, seq_number, sub.len() as u32);
    let mut packet = packet_header.as_bytes().to_vec();
    packet.extend_from_slice(&sub);

    if packet.len() > max_packet_size as usize {
        return Err(Error::TooLargePacket { len: packet.len(), max: max_packet_size as usize });
    }

    // 3. ComPacket.
    let com_header = ComPacketHeader::new(comid, comid_ext, packet.len() as u32);
    let mut com = com_header.as_bytes().to_vec();
    com.extend_from_slice(&packet);

    // 4. Size checks.
    if com.len() > max_com_packet_size as usize {
        return Err(Error::TooLargeComPacket { len: com.len(), max: max_com_packet_size as usize });
    }

    // 5. Pad to the wire alignment many drives require.
    pad_to(&mut com, WIRE_ALIGN);

    trace!(bytes = com.len(), seq_number, "built frame");
    Ok(com)
}

/// A fully parsed, non-empty frame (spec §4.E receive algorithm).
#[derive(Debug, Clone)]
pub struct ParsedFrame {
    pub tsn: u32,
    pub hsn: u32,
    pub seq_number: u32,
    pub data: Vec<u8>,
}

/// Parses a raw ComPacket buffer. Returns `Ok(None)` when the ComPacket's
/// `Length` field is zero, meaning "not ready" (spec §4.E step 2) -- the
/// caller (the session layer) polls on this, it is not itself an error.
pub fn parse_frame(buf: &[u8]) -> Result<Option<ParsedFrame>> {
    if buf.len() < COM_PACKET_LEN {
        return Err(Error::MalformedMethodResponse("buffer shorter than ComPacket header".into()));
    }
    let com = ComPacketHeader::ref_from_bytes(&buf[..COM_PACKET_LEN])
        .map_err(|e| Error::MalformedMethodResponse(format!("ComPacket header: {e}")))?;
    let com_len = com.length.get() as usize;
    if com_len == 0 {
        return Ok(None);
    }

    let packet_buf = buf
        .get(COM_PACKET_LEN..COM_PACKET_LEN + com_len)
        .ok_or_else(|| Error::MalformedMethodResponse("truncated Packet".into()))?;
    if packet_buf.len() < PACKET_LEN {
        return Err(Error::MalformedMethodResponse("Packet shorter than its header".into()));
    }
    let packet = PacketHeader::ref_from_bytes(&packet_buf[..PACKET_LEN])
        .map_err(|e| Error::MalformedMethodResponse(format!("Packet header: {e}")))?;
    let packet_len = packet.length.get() as usize;

    let sub_buf = packet_buf
        .get(PACKET_LEN..PACKET_LEN + packet_len)
        .ok_or_else(|| Error::MalformedMethodResponse("truncated SubPacket".into()))?;
    if sub_buf.len() < SUB_PACKET_LEN {
        return Err(Error::MalformedMethodResponse("SubPacket shorter than its header".into()));
    }
    let sub = SubPacketHeader::ref_from_bytes(&sub_buf[..SUB_PACKET_LEN])
        .map_err(|e| Error::MalformedMethodResponse(format!("SubPacket header: {e}")))?;

    if sub.kind.get() != SUB_PACKET_KIND_DATA {
        return Err(Error::MalformedMethodResponse(format!(
            "unsupported SubPacket kind {}",
            sub.kind.get()
        )));
    }

    let data_len = sub.length.get() as usize;
    let data = sub_buf
        .get(SUB_PACKET_LEN..SUB_PACKET_LEN + data_len)
        .ok_or_else(|| Error::MalformedMethodResponse("truncated SubPacket data".into()))?
        .to_vec();

    Ok(Some(ParsedFrame {
        tsn: packet.tsn.get(),
        hsn: packet.hsn.get(),
        seq_number: packet.seq_number.get(),
        data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_then_parse_roundtrips() {
        let payload = b"hello method call".to_vec();
        let frame =
            build_frame(0x1234, 0, 7, 42, 0, &payload, 1 << 20, 1 << 16).expect("build");
        assert_eq!(frame.len() % 512, 0);

        let parsed = parse_frame(&frame).expect("parse").expect("non-empty");
        assert_eq!(parsed.tsn, 7);
        assert_eq!(parsed.hsn, 42);
        assert_eq!(parsed.data, payload);
    }

    #[test]
    fn zero_length_compacket_means_not_ready() {
        let mut buf = vec![0u8; COM_PACKET_LEN];
        // Length field (last 4 bytes of the ComPacket header) stays zero.
        buf.resize(512, 0);
        assert!(parse_frame(&buf).expect("parse").is_none());
    }

    #[test]
    fn oversized_packet_is_rejected_before_any_io() {
        let payload = vec![0u8; 1 << 17];
        let err = build_frame(1, 0, 0, 0, 0, &payload, 1 << 20, 1 << 16).unwrap_err();
        assert!(matches!(err, Error::TooLargePacket { .. }));
    }

    #[test]
    fn oversized_compacket_is_rejected_before_any_io() {
        let payload = vec![0u8; 1 << 10];
        let err = build_frame(1, 0, 0, 0, 0, &payload, 256, 1 << 20).unwrap_err();
        assert!(matches!(err, Error::TooLargeComPacket { .. }));
    }
}
