// SPDX-License-Identifier: AGPL-3.0-or-later

//! Host-side protocol core for TCG Opal/Pyrite/Ruby/Enterprise
//! self-encrypting drives.
//!
//! This crate implements the wire protocol only: Level-0 Discovery,
//! ComID management, the data-stream codec, ComPacket/Packet/SubPacket
//! framing, session management, method calls, and the Locking-SP table
//! operations layer. It does not own device transport I/O -- callers
//! provide a [`transport::Transport`] impl (e.g. an NVMe/ATA/SCSI
//! Security Send/Receive binding) and drive discovery, session setup,
//! and method calls themselves.
//!
//! A typical session looks like:
//!
//! ```ignore
//! let discovery = discovery::discover(&mut transport)?;
//! let control = session::ControlSession::new(&mut transport, &discovery, Default::default())?;
//! let mut admin = session::Session::new(&control, &mut transport, uid::ADMIN_SP, Default::default())?;
//! table::authenticate(&mut admin, &mut transport, uid::AUTHORITY_SID, Some(b"password"))?;
//! admin.close(&mut transport)?;
//! ```

pub mod comid;
pub mod discovery;
pub mod error;
pub mod framing;
pub mod method;
pub mod session;
pub mod table;
pub mod transport;
pub mod uid;
pub mod wire;

pub use error::{Error, Result};
