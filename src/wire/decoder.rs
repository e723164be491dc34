// SPDX-License-Identifier: AGPL-3.0-or-later

//! Turns a raw TCG data stream into a [`Value`] list (spec §4.D, §8).

use crate::{
    error::{Error, Result},
    wire::{
        atom::{DecodedAtom, decode_atom},
        token::{EMPTY_ATOM, Token},
        value::Value,
    },
};

/// Decodes a full data stream into its top-level sequence of values.
///
/// `StartList`/`EndList` tokens nest; an `EndList` with nothing open, or
/// any leftover bytes once the outermost scope is fully consumed in a
/// single balanced pass, is [`Error::UnbalancedList`].
pub fn decode(mut buf: &[u8]) -> Result<Vec<Value>> {
    let mut stack: Vec<Vec<Value>> = vec![Vec::new()];

    while !buf.is_empty() {
        let lead = buf[0];

        if lead == EMPTY_ATOM {
            buf = &buf[1..];
            continue;
        }

        if let Some(tok) = Token::from_raw(lead) {
            match tok {
                Token::StartList => {
                    stack.push(Vec::new());
                },
                Token::EndList => {
                    let finished = stack.pop().ok_or(Error::UnbalancedList)?;
                    let parent = stack.last_mut().ok_or(Error::UnbalancedList)?;
                    parent.push(Value::List(finished));
                },
                other => {
                    let top = stack.last_mut().ok_or(Error::UnbalancedList)?;
                    top.push(Value::Token(other));
                },
            }
            buf = &buf[1..];
            continue;
        }

        let (atom, consumed) = decode_atom(buf)?;
        let value = match atom {
            DecodedAtom::Uint(v) => Value::Uint(v),
            DecodedAtom::Bytes(b) => Value::Bytes(b.to_vec()),
        };
        stack.last_mut().ok_or(Error::UnbalancedList)?.push(value);
        buf = &buf[consumed..];
    }

    if stack.len() != 1 {
        return Err(Error::UnbalancedList);
    }

    Ok(stack.pop().ok_or(Error::UnbalancedList)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_byte_buffer_atom() {
        let input = [0xA8, 1, 2, 3, 4, 5, 6, 7, 8];
        let out = decode(&input).expect("decode");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_bytes(), Some(&[1u8, 2, 3, 4, 5, 6, 7, 8][..]));
    }

    #[test]
    fn nested_call_token() {
        let input = [0xF0, 0xF8, 0xF1];
        let out = decode(&input).expect("decode");
        assert_eq!(out.len(), 1);
        let inner = out[0].as_list().expect("list");
        assert_eq!(inner.len(), 1);
        assert!(inner[0].eq_token(Token::Call));
    }

    #[test]
    fn unbalanced_end_list_at_depth_zero_is_fatal() {
        let input = [0xF1];
        assert!(matches!(decode(&input), Err(Error::UnbalancedList)));
    }

    #[test]
    fn trailing_content_after_outer_close_is_fatal() {
        // StartList EndList (balanced) followed by a stray EndList.
        let input = [0xF0, 0xF1, 0xF1];
        assert!(matches!(decode(&input), Err(Error::UnbalancedList)));
    }

    #[test]
    fn empty_atom_is_elided() {
        let input = [0xFF, 0x20, 0xFF];
        let out = decode(&input).expect("decode");
        assert_eq!(out, vec![Value::Uint(32)]);
    }
}
