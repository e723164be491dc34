// SPDX-License-Identifier: AGPL-3.0-or-later

//! Streaming encoder for the data-stream wire format (spec §4.D, §4.G).
//!
//! [`Encoder`] is the low-level byte-stream builder the method layer
//! (`crate::method::call`) wraps with TCG method-call structure. It also
//! backs [`encode`], the inverse of [`crate::wire::decoder::decode`] used
//! by the round-trip property in spec §8.

use crate::wire::{
    atom::{encode_bool, encode_bytes, encode_uint},
    token::Token,
    value::Value,
};

/// Tracks list-nesting balance the way `StartOptionalParameter`/
/// `EndOptionalParameter` does in the method layer (spec §9: both use the
/// same depth counter as `StartList`/`EndList`).
#[derive(Default)]
pub struct Encoder {
    buf: Vec<u8>,
    depth: i32,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&mut self, tok: Token) -> &mut Self {
        match tok {
            Token::StartList | Token::StartName => self.depth += 1,
            Token::EndList | Token::EndName => self.depth -= 1,
            _ => {},
        }
        self.buf.push(tok.raw());
        self
    }

    pub fn start_list(&mut self) -> &mut Self {
        self.token(Token::StartList)
    }

    pub fn end_list(&mut self) -> &mut Self {
        self.token(Token::EndList)
    }

    pub fn uint(&mut self, v: u64) -> &mut Self {
        encode_uint(v, &mut self.buf);
        self
    }

    pub fn bool_(&mut self, v: bool) -> &mut Self {
        encode_bool(v, &mut self.buf);
        self
    }

    pub fn bytes(&mut self, b: &[u8]) -> &mut Self {
        encode_bytes(b, &mut self.buf);
        self
    }

    pub fn raw_uid(&mut self, uid: &crate::uid::Uid) -> &mut Self {
        self.bytes(uid.as_bytes())
    }

    pub fn named_uint(&mut self, name: &str, v: u64) -> &mut Self {
        self.token(Token::StartName)
            .bytes(name.as_bytes())
            .uint(v)
            .token(Token::EndName)
    }

    pub fn named_bool(&mut self, name: &str, v: bool) -> &mut Self {
        self.token(Token::StartName)
            .bytes(name.as_bytes())
            .bool_(v)
            .token(Token::EndName)
    }

    pub fn named_bytes(&mut self, name: &str, v: &[u8]) -> &mut Self {
        self.token(Token::StartName)
            .bytes(name.as_bytes())
            .bytes(v)
            .token(Token::EndName)
    }

    /// List nesting depth; zero means balanced.
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Appends a previously built [`Value`] sequence (e.g. the flat
    /// `StartName name value EndName …` run [`crate::session::properties::Properties::push_named`]
    /// produces) into this call's argument list.
    pub fn values(&mut self, values: &[Value]) -> &mut Self {
        encode_into(values, self);
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

/// Re-encodes a previously decoded value list, the inverse of
/// [`crate::wire::decoder::decode`].
pub fn encode(values: &[Value]) -> Vec<u8> {
    let mut enc = Encoder::new();
    encode_into(values, &mut enc);
    enc.into_bytes()
}

fn encode_into(values: &[Value], enc: &mut Encoder) {
    for v in values {
        match v {
            Value::Uint(u) => {
                enc.uint(*u);
            },
            Value::Bytes(b) => {
                enc.bytes(b);
            },
            Value::List(inner) => {
                enc.start_list();
                encode_into(inner, enc);
                enc.end_list();
            },
            Value::Token(tok) => {
                enc.token(*tok);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::decoder::decode;

    #[test]
    fn roundtrip_nested_list() {
        let values = vec![
            Value::Uint(7),
            Value::List(vec![Value::Bytes(vec![1, 2, 3]), Value::Token(Token::Call)]),
        ];
        let bytes = encode(&values);
        let decoded = decode(&bytes).expect("decode");
        assert_eq!(decoded, values);
    }
}
