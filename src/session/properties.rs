// SPDX-License-Identifier: AGPL-3.0-or-later

//! `HostProperties` / `TPerProperties` (spec §3, §4.F).
//!
//! Both sides of a negotiation share this shape; only the defaults
//! differ by direction (what the host proposes vs. the TCG-prescribed
//! floor the TPer is required to honor).

use crate::{
    error::{Error, Result},
    wire::{Token, Value},
};

/// Numeric and boolean capability caps exchanged by `Properties` /
/// `SyncProperties` (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Properties {
    pub max_methods: u32,
    pub max_subpackets: u32,
    pub max_packet_size: u32,
    pub max_packets: u32,
    pub max_com_packet_size: u32,
    pub max_response_com_packet_size: u32,
    pub max_ind_token_size: u32,
    pub max_agg_token_size: u32,
    pub max_sessions: u32,
    pub max_read_sessions: u32,
    pub max_authentications: u32,
    pub max_trans_timeout: u32,
    pub def_session_timeout: u32,
    pub max_com_id_time: u32,
    pub continued_tokens: bool,
    pub sequence_numbers: bool,
    pub ack_nak: bool,
    pub asynchronous: bool,
}

/// Fixed minimums the TCG Core specification prescribes; a peer
/// proposing less than this MUST be treated as proposing exactly this
/// (spec §3).
pub const MINIMUM: Properties = Properties {
    max_methods: 1,
    max_subpackets: 1,
    max_packet_size: 2048,
    max_packets: 1,
    max_com_packet_size: 2048,
    max_response_com_packet_size: 2048,
    max_ind_token_size: 968,
    max_agg_token_size: 968,
    max_sessions: 1,
    max_read_sessions: 1,
    max_authentications: 1,
    max_trans_timeout: 0,
    def_session_timeout: 0,
    max_com_id_time: 0,
    continued_tokens: false,
    sequence_numbers: false,
    ack_nak: false,
    asynchronous: false,
};

impl Default for Properties {
    /// The host's proposal when the caller doesn't override anything:
    /// the TCG minimums, bumped only where a larger default is
    /// harmless and commonly accepted (`MaxComPacketSize`).
    fn default() -> Self {
        Properties { max_com_packet_size: 1 << 20, max_packet_size: 1 << 16, ..MINIMUM }
    }
}

macro_rules! numeric_fields {
    ($($name:literal => $field:ident),+ $(,)?) => {
        /// Serializes as the flat `StartName name value EndName …`
        /// sequence spec §4.F's Properties call expects (not wrapped
        /// in its own list -- the caller supplies that).
        pub fn push_named(&self, out: &mut Vec<Value>) {
            $(
                out.push(Value::Token(Token::StartName));
                out.push(Value::Bytes($name.as_bytes().to_vec()));
                out.push(Value::Uint(self.$field as u64));
                out.push(Value::Token(Token::EndName));
            )+
            push_bool(out, "ContinuedTokens", self.continued_tokens);
            push_bool(out, "SequenceNumbers", self.sequence_numbers);
            push_bool(out, "AckNAK", self.ack_nak);
            push_bool(out, "Asynchronous", self.asynchronous);
        }

        /// Parses the flat name/value sequence back into a
        /// [`Properties`], starting from [`MINIMUM`] and overriding
        /// only the names actually present.
        pub fn from_values(values: &[Value]) -> Result<Self> {
            let mut props = MINIMUM;
            let mut i = 0;
            while i < values.len() {
                if values[i].eq_token(Token::StartName) {
                    let name = values
                        .get(i + 1)
                        .and_then(Value::as_bytes)
                        .ok_or_else(|| Error::InvalidPropertiesResponse("missing name".into()))?;
                    let name = String::from_utf8_lossy(name).into_owned();
                    let value = values.get(i + 2).ok_or_else(|| {
                        Error::InvalidPropertiesResponse("missing value".into())
                    })?;
                    match name.as_str() {
                        $(
                            $name => {
                                let v = value.as_uint().ok_or_else(|| {
                                    Error::InvalidPropertiesResponse(format!("{} not a uint", $name))
                                })?;
                                props.$field = v.max(MINIMUM.$field as u64) as u32;
                            },
                        )+
                        "ContinuedTokens" => props.continued_tokens = as_bool(value)?,
                        "SequenceNumbers" => props.sequence_numbers = as_bool(value)?,
                        "AckNAK" => props.ack_nak = as_bool(value)?,
                        "Asynchronous" => props.asynchronous = as_bool(value)?,
                        _ => {},
                    }
                    i += 4;
                } else {
                    i += 1;
                }
            }
            Ok(props)
        }
    };
}

fn push_bool(out: &mut Vec<Value>, name: &str, v: bool) {
    out.push(Value::Token(Token::StartName));
    out.push(Value::Bytes(name.as_bytes().to_vec()));
    out.push(Value::Uint(v as u64));
    out.push(Value::Token(Token::EndName));
}

fn as_bool(v: &Value) -> Result<bool> {
    v.as_uint()
        .map(|u| u != 0)
        .ok_or_else(|| Error::InvalidPropertiesResponse("expected a boolean (0/1) value".into()))
}

impl Properties {
    numeric_fields! {
        "MaxMethods" => max_methods,
        "MaxSubpackets" => max_subpackets,
        "MaxPacketSize" => max_packet_size,
        "MaxPackets" => max_packets,
        "MaxComPacketSize" => max_com_packet_size,
        "MaxResponseComPacketSize" => max_response_com_packet_size,
        "MaxIndTokenSize" => max_ind_token_size,
        "MaxAggTokenSize" => max_agg_token_size,
        "MaxSessions" => max_sessions,
        "MaxReadSessions" => max_read_sessions,
        "MaxAuthentications" => max_authentications,
        "MaxTransTimeout" => max_trans_timeout,
        "DefSessionTimeout" => def_session_timeout,
        "MaxComIDTime" => max_com_id_time,
    }

    /// Clamps a caller-supplied proposal up to the TCG minimums before
    /// it is ever put on the wire (spec §3: "any caller-requested value
    /// below a minimum must be treated as the minimum").
    pub fn clamped(mut self) -> Self {
        self.max_methods = self.max_methods.max(MINIMUM.max_methods);
        self.max_subpackets = self.max_subpackets.max(MINIMUM.max_subpackets);
        self.max_packet_size = self.max_packet_size.max(MINIMUM.max_packet_size);
        self.max_packets = self.max_packets.max(MINIMUM.max_packets);
        self.max_com_packet_size = self.max_com_packet_size.max(MINIMUM.max_com_packet_size);
        self.max_response_com_packet_size =
            self.max_response_com_packet_size.max(MINIMUM.max_response_com_packet_size);
        self.max_ind_token_size = self.max_ind_token_size.max(MINIMUM.max_ind_token_size);
        self.max_agg_token_size = self.max_agg_token_size.max(MINIMUM.max_agg_token_size);
        self.max_sessions = self.max_sessions.max(MINIMUM.max_sessions);
        self.max_read_sessions = self.max_read_sessions.max(MINIMUM.max_read_sessions);
        self.max_authentications = self.max_authentications.max(MINIMUM.max_authentications);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_scenario_four_properties_echo() {
        let mut values = Vec::new();
        values.push(Value::Token(Token::StartName));
        values.push(Value::Bytes(b"MaxComPacketSize".to_vec()));
        values.push(Value::Uint(2048));
        values.push(Value::Token(Token::EndName));

        let props = Properties::from_values(&values).expect("parse");
        assert_eq!(props.max_com_packet_size, 2048);
    }

    #[test]
    fn push_then_parse_roundtrips_known_fields() {
        let original = Properties::default();
        let mut values = Vec::new();
        original.push_named(&mut values);
        let parsed = Properties::from_values(&values).expect("parse");
        assert_eq!(parsed.max_com_packet_size, original.max_com_packet_size);
        assert_eq!(parsed.sequence_numbers, original.sequence_numbers);
    }

    #[test]
    fn below_minimum_request_is_clamped() {
        let requested = Properties { max_sessions: 0, ..Properties::default() };
        let clamped = requested.clamped();
        assert_eq!(clamped.max_sessions, MINIMUM.max_sessions);
    }
}
