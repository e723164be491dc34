// SPDX-License-Identifier: AGPL-3.0-or-later

//! Builds one method invocation buffer (spec §4.G).

use crate::{
    error::{Error, Result},
    method::ProtocolLevel,
    uid::{self, Uid},
    wire::{Encoder, Token},
};

/// Owns the byte buffer and balanced list depth for one invocation.
/// Dropped without calling [`MethodCall::finish`], it simply discards
/// the half-built buffer -- there is nothing to clean up.
pub struct MethodCall {
    enc: Encoder,
    protocol: ProtocolLevel,
}

impl MethodCall {
    pub fn new(invoking_id: Uid, method_id: Uid, protocol: ProtocolLevel) -> Self {
        let mut enc = Encoder::new();
        enc.token(Token::Call).raw_uid(&invoking_id).raw_uid(&method_id).start_list();
        Self { enc, protocol }
    }

    pub fn uint(&mut self, v: u64) -> &mut Self {
        self.enc.uint(v);
        self
    }

    pub fn bool_(&mut self, v: bool) -> &mut Self {
        self.enc.bool_(v);
        self
    }

    pub fn bytes(&mut self, b: &[u8]) -> &mut Self {
        self.enc.bytes(b);
        self
    }

    pub fn uid(&mut self, u: &Uid) -> &mut Self {
        self.enc.raw_uid(u);
        self
    }

    /// Appends a previously built [`crate::wire::Value`] sequence, e.g.
    /// `Properties::push_named`'s output for a `HostProperties` group.
    pub fn values(&mut self, values: &[crate::wire::Value]) -> &mut Self {
        self.enc.values(values);
        self
    }

    pub fn named_uint(&mut self, name: &str, v: u64) -> &mut Self {
        self.enc.named_uint(name, v);
        self
    }

    pub fn named_bool(&mut self, name: &str, v: bool) -> &mut Self {
        self.enc.named_bool(name, v);
        self
    }

    pub fn named_bytes(&mut self, name: &str, v: &[u8]) -> &mut Self {
        self.enc.named_bytes(name, v);
        self
    }

    pub fn start_list(&mut self) -> &mut Self {
        self.enc.start_list();
        self
    }

    pub fn end_list(&mut self) -> &mut Self {
        self.enc.end_list();
        self
    }

    /// Opens an optional parameter group. Enterprise keys it by ASCII
    /// name, Core by uint ID (spec §4.G, §9).
    pub fn start_optional_param(&mut self, id: u64, name: &str) -> &mut Self {
        self.enc.token(Token::StartName);
        if self.protocol.is_enterprise() {
            self.enc.bytes(name.as_bytes());
        } else {
            self.enc.uint(id);
        }
        self
    }

    pub fn end_optional_param(&mut self) -> &mut Self {
        self.enc.token(Token::EndName);
        self
    }

    /// Closes the argument list and appends `EndOfData` / `[0,0,0]`.
    /// Fails if the call's list nesting is unbalanced.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.enc.end_list();
        self.enc.token(Token::EndOfData);
        self.enc.start_list();
        self.enc.uint(0).uint(0).uint(0);
        self.enc.end_list();

        if self.enc.depth() != 0 {
            return Err(Error::UnbalancedList);
        }
        Ok(self.enc.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::decode;

    #[test]
    fn well_formed_call_decodes_and_balances() {
        let mut call = MethodCall::new(uid::THIS_SP, uid::method::GET, ProtocolLevel::Core);
        call.uint(7).bytes(b"hi");
        let buf = call.finish().expect("finish");

        let decoded = decode(&buf).expect("decode");
        assert!(decoded[0].eq_token(Token::Call));
    }

    #[test]
    fn optional_param_dialect_differs_by_protocol() {
        let mut core = MethodCall::new(uid::THIS_SP, uid::method::GET, ProtocolLevel::Core);
        core.start_optional_param(1, "Values").uint(9).end_optional_param();
        let core_buf = core.finish().expect("finish");

        let mut ent =
            MethodCall::new(uid::THIS_SP, uid::method::GET, ProtocolLevel::Enterprise);
        ent.start_optional_param(1, "Values").uint(9).end_optional_param();
        let ent_buf = ent.finish().expect("finish");

        assert_ne!(core_buf, ent_buf);
    }
}
