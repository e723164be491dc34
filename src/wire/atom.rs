// SPDX-License-Identifier: AGPL-3.0-or-later

//! Atom encoding/decoding (spec §4.D, TCG Core 3.2.2).
//!
//! An atom is either an integer or a byte string; both share the same
//! framing with an "is-byte" bit. Four size classes exist:
//!
//! - tiny (1 byte, integer only): `0b0Sxxxxxx`
//! - short (<=15 bytes): `0b10bS LLLL`
//! - medium (<=2047 bytes): `0b110b SLLL LLLLLLLL`
//! - long (<=16 MiB): `0b1110 00bS` + 3-byte length
//!
//! `S` (sign) is unused by this crate; every atom we emit and accept is
//! unsigned. `b` is the is-byte flag that distinguishes an integer atom
//! from a byte-string atom of the same size class.

use crate::error::{Error, Result};

const TINY_MAX: u64 = 0x3F;
const SHORT_MAX_LEN: usize = 15;
const MEDIUM_MAX_LEN: usize = 2047;
const LONG_MAX_LEN: usize = 0x00FF_FFFF;

/// Appends the atom header+payload for an unsigned integer (spec's
/// `uint(v)` encoder contract).
pub fn encode_uint(v: u64, out: &mut Vec<u8>) {
    if v <= TINY_MAX {
        out.push(v as u8);
        return;
    }
    // Smallest big-endian width that fits v, rounded up to {2, 4, 8}.
    let width = if v <= u16::MAX as u64 {
        2
    } else if v <= u32::MAX as u64 {
        4
    } else {
        8
    };
    out.push(0x80 | width as u8);
    out.extend_from_slice(&v.to_be_bytes()[8 - width..]);
}

/// Appends the atom header+payload for a byte string (spec's `bytes(b)`
/// encoder contract).
pub fn encode_bytes(b: &[u8], out: &mut Vec<u8>) {
    let len = b.len();
    if len <= SHORT_MAX_LEN {
        out.push(0x80 | 0x20 | len as u8);
    } else if len <= MEDIUM_MAX_LEN {
        out.push(0xC0 | 0x10 | ((len >> 8) as u8 & 0x07));
        out.push((len & 0xFF) as u8);
    } else {
        assert!(len <= LONG_MAX_LEN, "byte string too long for long atom");
        out.push(0xE0 | 0x02);
        let len_bytes = (len as u32).to_be_bytes();
        out.extend_from_slice(&len_bytes[1..]);
    }
    out.extend_from_slice(b);
}

/// A boolean encodes as the unsigned integer 0 or 1 (spec §4.D).
pub fn encode_bool(v: bool, out: &mut Vec<u8>) {
    encode_uint(v as u64, out);
}

/// The decoded payload of one atom, before the caller reinterprets bytes
/// as an integer vs. opaque data.
pub(crate) enum DecodedAtom<'a> {
    Uint(u64),
    Bytes(&'a [u8]),
}

/// Decodes exactly one atom from the front of `buf`, returning the atom
/// and the number of bytes consumed. Reserved tokens and `EmptyAtom` are
/// not atoms and must be handled by the caller before calling this.
pub(crate) fn decode_atom(buf: &[u8]) -> Result<(DecodedAtom<'_>, usize)> {
    let lead = *buf
        .first()
        .ok_or(Error::TruncatedStream { expected: 1, got: 0 })?;

    if lead & 0x80 == 0 {
        // Tiny atom: integer in the low 6 bits (bit 6 is part of the
        // 0xxxxxxx tiny-atom signature, not the value).
        return Ok((DecodedAtom::Uint((lead & 0x3F) as u64), 1));
    }

    if lead & 0xC0 == 0x80 {
        // Short atom: bits7-6=10, bit5=is-byte, bit4=sign (unused), bits3-0=length.
        let is_byte = lead & 0x20 != 0;
        let len = (lead & 0x0F) as usize;
        let payload = take(buf, 1, len)?;
        return Ok((decoded_from(is_byte, payload)?, 1 + len));
    }

    if lead & 0xE0 == 0xC0 {
        // Medium atom: bits7-5=110, bit4=is-byte, bit3=sign (unused),
        // bits2-0 = top 3 bits of an 11-bit length, low 8 bits in byte 2.
        let is_byte = lead & 0x10 != 0;
        let second = *buf
            .get(1)
            .ok_or(Error::TruncatedStream { expected: 2, got: 1 })?;
        let len = (((lead & 0x07) as usize) << 8) | second as usize;
        if !is_byte {
            return Err(Error::MediumIntNotImplemented);
        }
        let payload = take(buf, 2, len)?;
        return Ok((decoded_from(is_byte, payload)?, 2 + len));
    }

    if lead & 0xFC == 0xE0 {
        // Long atom: bits7-2=1110 00, bit1=is-byte, bit0=sign (unused),
        // followed by a 3-byte big-endian length.
        let is_byte = lead & 0x02 != 0;
        if buf.len() < 4 {
            return Err(Error::TruncatedStream { expected: 4, got: buf.len() });
        }
        let len = ((buf[1] as usize) << 16) | ((buf[2] as usize) << 8) | buf[3] as usize;
        if !is_byte {
            return Err(Error::LongIntNotImplemented);
        }
        let payload = take(buf, 4, len)?;
        return Ok((decoded_from(is_byte, payload)?, 4 + len));
    }

    Err(Error::UnknownAtom(lead))
}

fn take(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let end = offset
        .checked_add(len)
        .ok_or(Error::TruncatedStream { expected: len, got: 0 })?;
    buf.get(offset..end)
        .ok_or(Error::TruncatedStream { expected: end, got: buf.len() })
}

fn decoded_from(is_byte: bool, payload: &[u8]) -> Result<DecodedAtom<'_>> {
    if is_byte {
        Ok(DecodedAtom::Bytes(payload))
    } else {
        // Only reachable for tiny/short integer atoms with the width we
        // emit ourselves (2/4/8 bytes); anything else is a protocol bug
        // on the wire we don't expect to see in practice.
        let mut buf = [0u8; 8];
        let start = 8 - payload.len();
        buf[start..].copy_from_slice(payload);
        Ok(DecodedAtom::Uint(u64::from_be_bytes(buf)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_sanity() {
        let mut out = Vec::new();
        encode_uint(32, &mut out);
        assert_eq!(out, vec![0x20]);

        out.clear();
        encode_uint(32768, &mut out);
        assert_eq!(out, vec![0x82, 0x80, 0x00]);

        out.clear();
        encode_uint(131072, &mut out);
        assert_eq!(out, vec![0x84, 0x00, 0x02, 0x00, 0x00]);

        out.clear();
        encode_bytes(&[], &mut out);
        assert_eq!(out, vec![0xA0]);

        out.clear();
        encode_bytes(&[0x2F], &mut out);
        assert_eq!(out, vec![0xA1, 0x2F]);

        out.clear();
        encode_bytes(&[0x8F], &mut out);
        assert_eq!(out, vec![0xA1, 0x8F]);
    }

    #[test]
    fn boundary_sizes_roundtrip() {
        for len in [0usize, 1, 15, 16, 2047, 2048] {
            let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let mut out = Vec::new();
            encode_bytes(&data, &mut out);
            let (atom, consumed) = decode_atom(&out).expect("decode");
            assert_eq!(consumed, out.len());
            match atom {
                DecodedAtom::Bytes(b) => assert_eq!(b, data.as_slice()),
                DecodedAtom::Uint(_) => panic!("expected bytes atom"),
            }
        }
    }

    #[test]
    fn tiny_uint_roundtrip() {
        for v in 0u64..64 {
            let mut out = Vec::new();
            encode_uint(v, &mut out);
            assert_eq!(out.len(), 1);
            let (atom, consumed) = decode_atom(&out).expect("decode");
            assert_eq!(consumed, 1);
            match atom {
                DecodedAtom::Uint(u) => assert_eq!(u, v),
                DecodedAtom::Bytes(_) => panic!("expected uint atom"),
            }
        }
    }
}
