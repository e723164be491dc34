// SPDX-License-Identifier: AGPL-3.0-or-later

//! Method invocation and response parsing (spec §4.G).

pub mod call;
pub mod response;
pub mod status;

pub use call::MethodCall;
pub use response::parse_response;
pub use status::MethodStatus;

/// Which dialect a session speaks for optional parameters (spec §9):
/// Core keys them by uint ID, Enterprise by ASCII name atom. This is the
/// `method_flags` bit the design notes call out -- it never leaks past
/// the session/method layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolLevel {
    Core,
    Enterprise,
}

impl ProtocolLevel {
    pub fn is_enterprise(self) -> bool {
        matches!(self, Self::Enterprise)
    }
}
