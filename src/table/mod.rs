// SPDX-License-Identifier: AGPL-3.0-or-later

//! Table operations layer: `Get`/`Set`/`Next`/`Authenticate`/`Random`
//! plus known Locking-SP row helpers (spec §4.H).

pub mod ops;
pub mod rows;

pub use ops::{RowValues, authenticate, get, get_full_row, next, random, set};

/// Namespace for the Locking-SP rows most callers need, so
/// `table::Locking::global_range()` reads the way the spec's impl
/// note names it.
pub struct Locking;

impl Locking {
    pub fn global_range() -> crate::uid::Uid {
        rows::global_range_uid()
    }

    pub fn range(index: u32) -> crate::uid::Uid {
        rows::locking_range_uid(index)
    }
}
