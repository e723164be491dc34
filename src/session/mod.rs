// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session management: control sessions, regular sessions, and the
//! properties they negotiate (spec §4.F).

pub mod control;
pub mod properties;
pub mod regular;
pub mod state;

pub use control::{ControlSession, ControlSessionOptions};
pub use properties::Properties;
pub use regular::{Session, SessionOptions};
pub use state::ReceiveTimeout;
