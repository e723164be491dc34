// SPDX-License-Identifier: AGPL-3.0-or-later

//! The TCG data-stream codec: atoms, reserved tokens, and the
//! heterogeneous list representation built from them (spec §4.D).

pub mod atom;
pub mod decoder;
pub mod encoder;
pub mod token;
pub mod value;

pub use decoder::decode;
pub use encoder::{Encoder, encode};
pub use token::Token;
pub use value::Value;

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn bytes_roundtrip(b in proptest::collection::vec(any::<u8>(), 0..300)) {
            let mut out = Vec::new();
            atom::encode_bytes(&b, &mut out);
            let decoded = decode(&out).expect("decode");
            prop_assert_eq!(decoded.len(), 1);
            prop_assert_eq!(decoded[0].as_bytes(), Some(b.as_slice()));
        }

        #[test]
        fn uint_roundtrip(v in 0u64..(1u64 << 32)) {
            let mut out = Vec::new();
            atom::encode_uint(v, &mut out);
            let decoded = decode(&out).expect("decode");
            prop_assert_eq!(decoded.len(), 1);
            prop_assert_eq!(decoded[0].as_uint(), Some(v));
        }
    }
}
