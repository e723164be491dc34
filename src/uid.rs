// SPDX-License-Identifier: AGPL-3.0-or-later

//! 8-byte object identifiers (spec §3, §6).
//!
//! Every named TCG object — Security Providers, invoking objects,
//! methods, rows, tables, authorities — is an opaque 8-byte string on the
//! wire. [`Uid`] wraps that representation; the well-known constants below
//! are the identifiers spec §6 calls out by name.

use core::fmt;

/// An opaque 8-byte TCG object identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid(pub [u8; 8]);

impl Uid {
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Composes a RowUID from a table's 4-byte prefix and a 4-byte row
    /// index, per spec §3 ("a RowUID within a TableUID is formed by
    /// concatenating the table's 4-byte prefix with a 4-byte row index").
    pub fn row(table_prefix: [u8; 4], index: u32) -> Self {
        let idx = index.to_be_bytes();
        Self([
            table_prefix[0],
            table_prefix[1],
            table_prefix[2],
            table_prefix[3],
            idx[0],
            idx[1],
            idx[2],
            idx[3],
        ])
    }
}

impl From<[u8; 8]> for Uid {
    fn from(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Uid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({})", self)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// `ThisSP` — the invoking object identifying "the currently open SP".
pub const THIS_SP: Uid = Uid([0, 0, 0, 0, 0, 0, 0, 1]);

/// The Session Manager's InvokingID, used for `Properties`/`StartSession`.
pub const SMUID: Uid = Uid([0, 0, 0, 0, 0, 0, 0, 0xFF]);

pub const ADMIN_SP: Uid = Uid([0, 0, 2, 5, 0, 0, 0, 1]);
pub const LOCKING_SP: Uid = Uid([0, 0, 2, 5, 0, 0, 0, 2]);
pub const ENTERPRISE_LOCKING_SP: Uid = Uid([0, 0, 2, 5, 0, 1, 0, 1]);

pub const AUTHORITY_SID: Uid = Uid([0, 0, 0, 9, 0, 0, 0, 6]);
pub const PSID: Uid = Uid([0, 0, 0, 9, 0, 1, 0xFF, 1]);
pub const ADMIN1: Uid = Uid([0, 0, 0, 9, 0, 1, 0, 1]);
pub const BAND_MASTER_0: Uid = Uid([0, 0, 0, 9, 0, 0, 0x80, 1]);
pub const ERASE_MASTER: Uid = Uid([0, 0, 0, 9, 0, 0, 0x84, 1]);

pub const GLOBAL_RANGE: Uid = Uid([0, 0, 8, 2, 0, 0, 0, 1]);

/// Method UIDs, Core dialect (spec §4.H).
pub mod method {
    use super::Uid;

    pub const GET: Uid = Uid([0, 0, 0, 6, 0, 0, 0, 0x16]);
    pub const SET: Uid = Uid([0, 0, 0, 6, 0, 0, 0, 0x17]);
    pub const NEXT: Uid = Uid([0, 0, 0, 6, 0, 0, 0, 0x08]);
    pub const AUTHENTICATE: Uid = Uid([0, 0, 0, 6, 0, 0, 0, 0x1C]);
    pub const RANDOM: Uid = Uid([0, 0, 0, 6, 0, 0, 6, 0x01]);

    /// Enterprise-dialect overrides of the same operations (spec §4.H).
    pub mod enterprise {
        use super::Uid;

        pub const GET: Uid = Uid([0, 0, 0, 6, 0, 0, 0, 0x06]);
        pub const SET: Uid = Uid([0, 0, 0, 6, 0, 0, 0, 0x07]);
        pub const NEXT: Uid = Uid([0, 0, 0, 6, 0, 0, 0, 0x08]);
        pub const AUTHENTICATE: Uid = Uid([0, 0, 0, 6, 0, 0, 0, 0x0C]);
    }

    /// Session-manager methods (spec §4.F).
    pub mod session_manager {
        use super::Uid;

        pub const PROPERTIES: Uid = Uid([0, 0, 0, 0xFF, 0, 0, 0xFF, 0x01]);
        pub const SYNC_PROPERTIES: Uid = Uid([0, 0, 0, 0xFF, 0, 0, 0xFF, 0x03]);
        pub const START_SESSION: Uid = Uid([0, 0, 0, 0xFF, 0, 0, 0, 0x02]);
        pub const SYNC_SESSION: Uid = Uid([0, 0, 0, 0xFF, 0, 0, 0, 0x03]);
        pub const CLOSE_SESSION: Uid = Uid([0, 0, 0, 0xFF, 0, 0, 0, 0x04]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_composes_prefix_and_index() {
        let row = Uid::row([0x00, 0x00, 0x08, 0x02], 3);
        assert_eq!(row.as_bytes(), &[0, 0, 8, 2, 0, 0, 0, 3]);
    }

    #[test]
    fn display_is_lowercase_hex_no_separators() {
        assert_eq!(ADMIN_SP.to_string(), "0000020500000001");
    }
}
