// SPDX-License-Identifier: AGPL-3.0-or-later

//! Level-0 Discovery decoder (spec §4.B, §6, seed scenario 3).
//!
//! `recv(TCGManagement, 0x0001, buf)` returns a fixed 48-byte header
//! followed by a sequence of `{code, version, size}` feature
//! descriptors. Each known feature gets its own small decoder; unknown
//! codes are preserved rather than dropped.

use tracing::warn;

use crate::{
    error::{Error, Result},
    transport::{Protocol, Transport, TransportError},
};

const HEADER_LEN: usize = 48;
const FEATURE_HEADER_LEN: usize = 4;
const DISCOVERY_BUF_LEN: usize = 2048;

pub const FEATURE_TPER: u16 = 0x0001;
pub const FEATURE_LOCKING: u16 = 0x0002;
pub const FEATURE_GEOMETRY: u16 = 0x0003;
pub const FEATURE_SECURE_MSG: u16 = 0x0004;
pub const FEATURE_ENTERPRISE: u16 = 0x0100;
pub const FEATURE_OPAL_V1: u16 = 0x0200;
pub const FEATURE_SINGLE_USER: u16 = 0x0201;
pub const FEATURE_DATA_STORE: u16 = 0x0202;
pub const FEATURE_OPAL_V2: u16 = 0x0203;
pub const FEATURE_OPALITE: u16 = 0x0301;
pub const FEATURE_PYRITE_V1: u16 = 0x0302;
pub const FEATURE_PYRITE_V2: u16 = 0x0303;
pub const FEATURE_RUBY_V1: u16 = 0x0304;
pub const FEATURE_LOCKING_LBA: u16 = 0x0401;
pub const FEATURE_BLOCK_SID: u16 = 0x0402;
pub const FEATURE_NAMESPACE_LOCKING: u16 = 0x0403;
pub const FEATURE_DATA_REMOVAL: u16 = 0x0404;
pub const FEATURE_NAMESPACE_GEOMETRY: u16 = 0x0405;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TPerFeature {
    pub sync_supported: bool,
    pub async_supported: bool,
    pub ack_nak_supported: bool,
    pub buffer_mgmt_supported: bool,
    pub streaming_supported: bool,
    pub comid_mgmt_supported: bool,
}

impl TPerFeature {
    fn decode(b: &[u8]) -> Self {
        let flags = b.first().copied().unwrap_or(0);
        Self {
            sync_supported: flags & 0x01 != 0,
            async_supported: flags & 0x02 != 0,
            ack_nak_supported: flags & 0x04 != 0,
            buffer_mgmt_supported: flags & 0x08 != 0,
            streaming_supported: flags & 0x10 != 0,
            comid_mgmt_supported: flags & 0x40 != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockingFeature {
    pub locking_supported: bool,
    pub locking_enabled: bool,
    pub locked: bool,
    pub media_encryption: bool,
    pub mbr_enabled: bool,
    pub mbr_done: bool,
}

impl LockingFeature {
    fn decode(b: &[u8]) -> Self {
        let flags = b.first().copied().unwrap_or(0);
        Self {
            locking_supported: flags & 0x01 != 0,
            locking_enabled: flags & 0x02 != 0,
            locked: flags & 0x04 != 0,
            media_encryption: flags & 0x08 != 0,
            mbr_enabled: flags & 0x10 != 0,
            mbr_done: flags & 0x20 != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometryFeature {
    pub align: bool,
    pub logical_block_size: u32,
    pub alignment_granularity: u64,
    pub lowest_aligned_lba: u64,
}

impl GeometryFeature {
    fn decode(b: &[u8]) -> Self {
        let align = b.first().copied().unwrap_or(0) & 0x01 != 0;
        let logical_block_size = b.get(4..8).map(be_u32).unwrap_or(0);
        let alignment_granularity = b.get(8..16).map(be_u64).unwrap_or(0);
        let lowest_aligned_lba = b.get(16..24).map(be_u64).unwrap_or(0);
        Self { align, logical_block_size, alignment_granularity, lowest_aligned_lba }
    }
}

/// Shared shape for the SSC (Security Subsystem Class) feature
/// descriptors: OpalV1/V2, Opalite, PyriteV1/V2, RubyV1 (spec §3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SscFeature {
    pub base_comid: u16,
    pub num_comids: u16,
    pub range_crossing_behavior: bool,
}

impl SscFeature {
    fn decode(b: &[u8]) -> Self {
        Self {
            base_comid: b.get(0..2).map(be_u16).unwrap_or(0),
            num_comids: b.get(2..4).map(be_u16).unwrap_or(0),
            range_crossing_behavior: b.get(4).copied().unwrap_or(0) & 0x01 == 0,
        }
    }
}

/// The Enterprise SSC descriptor; no range-crossing bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnterpriseFeature {
    pub base_comid: u16,
    pub num_comids: u16,
}

impl EnterpriseFeature {
    fn decode(b: &[u8]) -> Self {
        Self { base_comid: b.get(0..2).map(be_u16).unwrap_or(0), num_comids: b.get(2..4).map(be_u16).unwrap_or(0) }
    }
}

/// A feature code this crate doesn't have a dedicated decoder for,
/// preserved verbatim (spec §4.B: "Unknown codes are accumulated in a
/// separate list").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFeature {
    pub code: u16,
    pub version: u8,
    pub payload: Vec<u8>,
}

/// The remaining feature codes spec §6 names, kept as raw payloads
/// since this crate does not interpret their bit layout further.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFeature {
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Level0Discovery {
    pub major_version: u16,
    pub minor_version: u16,
    pub vendor: [u8; 32],
    pub tper: Option<TPerFeature>,
    pub locking: Option<LockingFeature>,
    pub geometry: Option<GeometryFeature>,
    pub secure_msg: Option<RawFeature>,
    pub enterprise: Option<EnterpriseFeature>,
    pub opal_v1: Option<SscFeature>,
    pub single_user: Option<RawFeature>,
    pub data_store: Option<RawFeature>,
    pub opal_v2: Option<SscFeature>,
    pub opalite: Option<SscFeature>,
    pub pyrite_v1: Option<SscFeature>,
    pub pyrite_v2: Option<SscFeature>,
    pub ruby_v1: Option<SscFeature>,
    pub locking_lba: Option<RawFeature>,
    pub block_sid: Option<RawFeature>,
    pub namespace_locking: Option<RawFeature>,
    pub data_removal: Option<RawFeature>,
    pub namespace_geometry: Option<RawFeature>,
    pub unknown_features: Vec<UnknownFeature>,
}

impl Level0Discovery {
    /// `true` once any SSC feature (Enterprise or Core) was recognized.
    pub fn is_ssc_recognized(&self) -> bool {
        self.enterprise.is_some()
            || self.opal_v1.is_some()
            || self.opal_v2.is_some()
            || self.opalite.is_some()
            || self.pyrite_v1.is_some()
            || self.pyrite_v2.is_some()
            || self.ruby_v1.is_some()
    }

    /// The BaseComID of whichever SSC feature is present, if any.
    pub fn base_comid(&self) -> Option<u16> {
        self.enterprise
            .map(|f| f.base_comid)
            .or(self.opal_v2.map(|f| f.base_comid))
            .or(self.opal_v1.map(|f| f.base_comid))
            .or(self.pyrite_v2.map(|f| f.base_comid))
            .or(self.pyrite_v1.map(|f| f.base_comid))
            .or(self.ruby_v1.map(|f| f.base_comid))
            .or(self.opalite.map(|f| f.base_comid))
    }
}

fn be_u16(b: &[u8]) -> u16 {
    u16::from_be_bytes(b.try_into().unwrap_or_default())
}

fn be_u32(b: &[u8]) -> u32 {
    u32::from_be_bytes(b.try_into().unwrap_or_default())
}

fn be_u64(b: &[u8]) -> u64 {
    u64::from_be_bytes(b.try_into().unwrap_or_default())
}

/// Decodes a raw Level-0 Discovery response buffer (spec §4.B).
///
/// A malformed header is fatal; an individual feature descriptor whose
/// advertised `size` runs past the buffer is skipped, not fatal.
pub fn decode(buf: &[u8]) -> Result<Level0Discovery> {
    if buf.len() < HEADER_LEN {
        return Err(Error::NotSupported);
    }
    let total_size = be_u32(&buf[0..4]);
    if total_size == 0 {
        return Err(Error::NotSupported);
    }

    let mut out = Level0Discovery {
        major_version: be_u16(&buf[4..6]),
        minor_version: be_u16(&buf[6..8]),
        vendor: buf[16..48].try_into().unwrap_or([0; 32]),
        ..Default::default()
    };

    // `total_size` bounds the TLV scan to the drive's actual response,
    // not to the (often much larger) host receive buffer -- the tail of
    // that buffer is unspecified and must not be walked as more TLVs.
    let scan_end = (4 + total_size as usize).min(buf.len());

    let mut offset = HEADER_LEN;
    while offset + FEATURE_HEADER_LEN <= scan_end {
        let code = be_u16(&buf[offset..offset + 2]);
        let version = buf[offset + 2];
        let size = buf[offset + 3] as usize;
        let body_start = offset + FEATURE_HEADER_LEN;
        let body_end = body_start + size;

        let Some(body) = buf.get(body_start..body_end.min(buf.len())) else {
            warn!(code, "truncated feature descriptor, stopping scan");
            break;
        };
        if body_end > buf.len() {
            warn!(code, advertised = size, available = buf.len() - body_start, "feature body truncated, skipping");
            offset = body_end;
            continue;
        }

        match code {
            FEATURE_TPER => out.tper = Some(TPerFeature::decode(body)),
            FEATURE_LOCKING => out.locking = Some(LockingFeature::decode(body)),
            FEATURE_GEOMETRY => out.geometry = Some(GeometryFeature::decode(body)),
            FEATURE_SECURE_MSG => out.secure_msg = Some(RawFeature { data: body.to_vec() }),
            FEATURE_ENTERPRISE => out.enterprise = Some(EnterpriseFeature::decode(body)),
            FEATURE_OPAL_V1 => out.opal_v1 = Some(SscFeature::decode(body)),
            FEATURE_SINGLE_USER => out.single_user = Some(RawFeature { data: body.to_vec() }),
            FEATURE_DATA_STORE => out.data_store = Some(RawFeature { data: body.to_vec() }),
            FEATURE_OPAL_V2 => out.opal_v2 = Some(SscFeature::decode(body)),
            FEATURE_OPALITE => out.opalite = Some(SscFeature::decode(body)),
            FEATURE_PYRITE_V1 => out.pyrite_v1 = Some(SscFeature::decode(body)),
            FEATURE_PYRITE_V2 => out.pyrite_v2 = Some(SscFeature::decode(body)),
            FEATURE_RUBY_V1 => out.ruby_v1 = Some(SscFeature::decode(body)),
            FEATURE_LOCKING_LBA => out.locking_lba = Some(RawFeature { data: body.to_vec() }),
            FEATURE_BLOCK_SID => out.block_sid = Some(RawFeature { data: body.to_vec() }),
            FEATURE_NAMESPACE_LOCKING => out.namespace_locking = Some(RawFeature { data: body.to_vec() }),
            FEATURE_DATA_REMOVAL => out.data_removal = Some(RawFeature { data: body.to_vec() }),
            FEATURE_NAMESPACE_GEOMETRY => out.namespace_geometry = Some(RawFeature { data: body.to_vec() }),
            other => out.unknown_features.push(UnknownFeature { code: other, version, payload: body.to_vec() }),
        }

        offset = body_end;
    }

    Ok(out)
}

/// Issues `recv(TCGManagement, 0x0001, 2048-byte buffer)` and decodes
/// the response (spec §4.B).
pub fn discover(transport: &mut dyn Transport) -> Result<Level0Discovery> {
    let mut buf = vec![0u8; DISCOVERY_BUF_LEN];
    transport.ifrecv(Protocol::TcgManagement, 0x0001, &mut buf).map_err(|e| match e {
        TransportError::NotSupported => Error::NotSupported,
        TransportError::Other(s) => Error::Transport(s),
    })?;
    decode(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(size: u32, vendor: &[u8]) -> Vec<u8> {
        let mut h = vec![0u8; HEADER_LEN];
        h[0..4].copy_from_slice(&size.to_be_bytes());
        h[4..6].copy_from_slice(&1u16.to_be_bytes());
        h[6..8].copy_from_slice(&0u16.to_be_bytes());
        let len = vendor.len().min(32);
        h[16..16 + len].copy_from_slice(&vendor[..len]);
        h
    }

    #[test]
    fn seed_scenario_three_discovery() {
        let mut buf = header(88, b"VENDOR");
        // TPer feature: code=0x0001, version=0, size=1, flags=0x01.
        buf.extend_from_slice(&0x0001u16.to_be_bytes());
        buf.push(0);
        buf.push(1);
        buf.push(0x01);
        // Locking feature: code=0x0002, version=0, size=1, flags=0x05.
        buf.extend_from_slice(&0x0002u16.to_be_bytes());
        buf.push(0);
        buf.push(1);
        buf.push(0x05);

        let disc = decode(&buf).expect("decode");
        let tper = disc.tper.expect("tper feature");
        assert!(tper.sync_supported);

        let locking = disc.locking.expect("locking feature");
        assert!(locking.locking_supported);
        assert!(locking.locked);
        assert!(!locking.locking_enabled);
    }

    #[test]
    fn zero_size_header_is_not_supported() {
        let buf = header(0, b"");
        assert!(matches!(decode(&buf), Err(Error::NotSupported)));
    }

    #[test]
    fn unknown_feature_codes_are_preserved() {
        let mut buf = header(60, b"X");
        buf.extend_from_slice(&0x9999u16.to_be_bytes());
        buf.push(3);
        buf.push(2);
        buf.extend_from_slice(&[0xAA, 0xBB]);

        let disc = decode(&buf).expect("decode");
        assert_eq!(disc.unknown_features.len(), 1);
        assert_eq!(disc.unknown_features[0].code, 0x9999);
        assert_eq!(disc.unknown_features[0].payload, vec![0xAA, 0xBB]);
    }
}
