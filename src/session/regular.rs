// SPDX-License-Identifier: AGPL-3.0-or-later

//! `Session`: opened against a specific SP, inherits ComID/properties
//! from its `ControlSession` (spec §3, §4.F).

use rand::{Rng, rng};
use tracing::debug;

use crate::{
    error::{Error, Result},
    method::{MethodCall, MethodStatus, ProtocolLevel, parse_response},
    session::{
        control::ControlSession,
        state::{close, execute},
    },
    transport::Transport,
    uid::{self, Uid},
    wire::{Token, Value},
};

/// Builder options for [`Session::new`] (spec §4.F).
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    hsn: Option<u32>,
    read_only: bool,
}

impl SessionOptions {
    pub fn with_hsn(mut self, hsn: u32) -> Self {
        self.hsn = Some(hsn);
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

const ENTERPRISE_SESSION_TIMEOUT_MS: u64 = 30_000;

/// A session opened against a particular SP (spec §3). Borrows its
/// parent [`ControlSession`] for ComID/properties/protocol level but
/// owns its own (HSN, TSN) identity and sequence counter.
pub struct Session<'a> {
    control: &'a ControlSession,
    sp: Uid,
    hsn: u32,
    tsn: u32,
    read_only: bool,
    seq_last_xmit: u32,
    closed: bool,
}

impl<'a> Session<'a> {
    pub fn new(
        control: &'a ControlSession,
        transport: &mut dyn Transport,
        sp: Uid,
        options: SessionOptions,
    ) -> Result<Self> {
        let hsn = options.hsn.unwrap_or_else(|| rng().random());
        let enterprise = control.protocol() == ProtocolLevel::Enterprise;

        let mut seq_last_xmit = 0u32;
        let data =
            match Self::start_session_call(control, transport, &mut seq_last_xmit, hsn, sp, &options, enterprise) {
                Err(Error::MethodStatus(MethodStatus::InvalidParameter)) if enterprise => {
                    Self::start_session_call(control, transport, &mut seq_last_xmit, hsn, sp, &options, false)?
                },
                other => other?,
            };

        let args = parse_response(&data)?;
        if args.len() < 4 {
            return Err(Error::InvalidStartSessionResponse("reply too short".into()));
        }
        if !args[0].eq_token(Token::Call)
            || args[1].as_bytes() != Some(uid::SMUID.as_bytes().as_slice())
            || args[2].as_bytes()
                != Some(uid::method::session_manager::SYNC_SESSION.as_bytes().as_slice())
        {
            return Err(Error::InvalidStartSessionResponse("missing SyncSession envelope".into()));
        }
        // `[HSN, TSN, ...]`, nested one level deeper than the envelope,
        // the same shape as the Properties/SyncProperties reply.
        let ids = args[3]
            .as_list()
            .ok_or_else(|| Error::InvalidStartSessionResponse("missing [HSN, TSN] list".into()))?;
        let echoed_hsn = ids
            .first()
            .and_then(Value::as_uint)
            .ok_or_else(|| Error::InvalidStartSessionResponse("HSN not a uint".into()))?;
        if echoed_hsn != hsn as u64 {
            return Err(Error::InvalidStartSessionResponse(format!(
                "echoed HSN {echoed_hsn} does not match requested {hsn}"
            )));
        }
        let tsn = ids
            .get(1)
            .and_then(Value::as_uint)
            .ok_or_else(|| Error::InvalidStartSessionResponse("TSN not a uint".into()))?
            as u32;

        debug!(hsn, tsn, read_only = options.read_only, "session started");

        Ok(Self { control, sp, hsn, tsn, read_only: options.read_only, seq_last_xmit, closed: false })
    }

    #[allow(clippy::too_many_arguments)]
    fn start_session_call(
        control: &ControlSession,
        transport: &mut dyn Transport,
        seq_last_xmit: &mut u32,
        hsn: u32,
        sp: Uid,
        options: &SessionOptions,
        with_timeout: bool,
    ) -> Result<Vec<u8>> {
        let mut call = MethodCall::new(
            uid::SMUID,
            uid::method::session_manager::START_SESSION,
            control.protocol(),
        );
        call.uint(hsn as u64).uid(&sp).bool_(!options.read_only);
        if with_timeout {
            call.start_optional_param(5, "SessionTimeout");
            call.uint(ENTERPRISE_SESSION_TIMEOUT_MS);
            call.end_optional_param();
        }
        let payload = call.finish()?;

        let params = control.exchange_params(0, 0);
        execute(transport, &params, seq_last_xmit, &payload)
    }

    pub fn sp(&self) -> Uid {
        self.sp
    }

    pub fn hsn(&self) -> u32 {
        self.hsn
    }

    pub fn tsn(&self) -> u32 {
        self.tsn
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn protocol(&self) -> ProtocolLevel {
        self.control.protocol()
    }

    /// Sends a method payload built by [`MethodCall`] and returns its
    /// decoded argument list (spec §4.G).
    pub fn execute(&mut self, transport: &mut dyn Transport, payload: &[u8]) -> Result<Vec<Value>> {
        if self.closed {
            return Err(Error::SessionAlreadyClosed);
        }
        let params = self.control.exchange_params(self.tsn, self.hsn);
        let data = execute(transport, &params, &mut self.seq_last_xmit, payload)?;
        parse_response(&data)
    }

    /// Closes the session (spec §4.F): sends `EndOfSession`, then
    /// requires the reply be exactly `EndOfSession`.
    pub fn close(&mut self, transport: &mut dyn Transport) -> Result<()> {
        if self.closed {
            return Err(Error::SessionAlreadyClosed);
        }
        let params = self.control.exchange_params(self.tsn, self.hsn);
        close(transport, &params, &mut self.seq_last_xmit)?;
        self.closed = true;
        Ok(())
    }
}
