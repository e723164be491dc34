// SPDX-License-Identifier: AGPL-3.0-or-later

//! The transport contract a host provides to this crate (spec §4.A, §6).
//!
//! Device open and transport I/O (NVMe admin passthrough, ATA PASSTHROUGH
//! over SCSI, SCSI SECURITY IN/OUT) are explicit non-goals of this crate;
//! only the `send`/`recv` interface below is specified. Implementations
//! live in the host application.

use core::fmt;

/// SECURITY PROTOCOL values used by the core (spec §4.A).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Protocol {
    Information = 0x00,
    TcgManagement = 0x01,
    TcgTper = 0x02,
}

/// Identifying information a transport can report about the attached
/// drive (spec §4.A, §6).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
    pub protocol_family: String,
    pub model: String,
    pub firmware: String,
    pub serial: String,
}

/// Transport-level failures, collapsed to the two kinds spec §6 names.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Illegal-request style rejection (protocol/ComID unsupported).
    #[error("transport rejected the request as not supported")]
    NotSupported,
    #[error("transport error: {0}")]
    Other(String),
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", *self as u8)
    }
}

/// Host-provided send/receive primitive for TCG Storage traffic (spec
/// §4.A, §6). A drive handle implementing this trait is the sole external
/// collaborator this crate depends on; everything else is pure protocol
/// logic over these four methods.
pub trait Transport {
    /// Delivers `data` to the drive on the given protocol/ComID (`spsp`
    /// is the low 16 bits of the ComID, i.e. SP Specific Protocol id in
    /// TCG terms).
    fn ifsend(&mut self, protocol: Protocol, spsp: u16, data: &[u8]) -> Result<(), TransportError>;

    /// Fills `buf` with the drive's response on the given protocol/ComID.
    /// A response whose ComPacket carries `Length == 0` means "not ready"
    /// and is not itself an error (spec §4.E).
    fn ifrecv(
        &mut self,
        protocol: Protocol,
        spsp: u16,
        buf: &mut [u8],
    ) -> Result<(), TransportError>;

    fn identify(&self) -> Identity;

    fn close(&mut self);

    /// Convenience accessor mirroring `identify().serial`.
    fn serial(&self) -> String {
        self.identify().serial
    }
}
