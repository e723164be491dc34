// SPDX-License-Identifier: AGPL-3.0-or-later

//! Wire layout of the three nested framing structures (spec §4.E): all
//! big-endian, no implicit padding outside the declared reserved fields.

use zerocopy::{BigEndian, FromBytes, Immutable, IntoBytes, KnownLayout, U16, U32};

pub const COM_PACKET_LEN: usize = 20;
pub const PACKET_LEN: usize = 24;
pub const SUB_PACKET_LEN: usize = 12;

/// `Kind = 0` ("data") is the only SubPacket kind this crate emits or
/// accepts (spec §4.E step 3).
pub const SUB_PACKET_KIND_DATA: u16 = 0;

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct ComPacketHeader {
    pub reserved: [u8; 4],
    pub comid: U16<BigEndian>,
    pub comid_ext: U16<BigEndian>,
    pub outstanding_data: U32<BigEndian>,
    pub min_transfer: U32<BigEndian>,
    pub length: U32<BigEndian>,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct PacketHeader {
    pub tsn: U32<BigEndian>,
    pub hsn: U32<BigEndian>,
    pub seq_number: U32<BigEndian>,
    pub reserved: [u8; 2],
    pub ack_type: U16<BigEndian>,
    pub acknowledgement: U32<BigEndian>,
    pub length: U32<BigEndian>,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct SubPacketHeader {
    pub reserved: [u8; 6],
    pub kind: U16<BigEndian>,
    pub length: U32<BigEndian>,
}

const _: () = assert!(core::mem::size_of::<ComPacketHeader>() == COM_PACKET_LEN);
const _: () = assert!(core::mem::size_of::<PacketHeader>() == PACKET_LEN);
const _: () = assert!(core::mem::size_of::<SubPacketHeader>() == SUB_PACKET_LEN);

impl ComPacketHeader {
    pub fn new(comid: u16, comid_ext: u16, length: u32) -> Self {
        Self {
            reserved: [0; 4],
            comid: U16::new(comid),
            comid_ext: U16::new(comid_ext),
            outstanding_data: U32::new(0),
            min_transfer: U32::new(0),
            length: U32::new(length),
        }
    }
}

impl PacketHeader {
    pub fn new(tsn: u32, hsn: u32, seq_number: u32, length: u32) -> Self {
        Self {
            tsn: U32::new(tsn),
            hsn: U32::new(hsn),
            seq_number: U32::new(seq_number),
            reserved: [0; 2],
            ack_type: U16::new(0),
            acknowledgement: U32::new(0),
            length: U32::new(length),
        }
    }
}

impl SubPacketHeader {
    pub fn new(kind: u16, length: u32) -> Self {
        Self { reserved: [0; 6], kind: U16::new(kind), length: U32::new(length) }
    }
}
