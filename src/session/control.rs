// SPDX-License-Identifier: AGPL-3.0-or-later

//! `ControlSession`: owned per ComID, HSN=0/TSN=0 (spec §3, §4.F).

use tracing::{debug, warn};

use crate::{
    comid::{ComId, get_comid, make_comid, stack_reset},
    discovery::Level0Discovery,
    error::{Error, Result},
    method::{MethodCall, ProtocolLevel, parse_response},
    session::{
        properties::{self, Properties},
        state::{ExchangeParams, ReceiveTimeout, execute},
    },
    transport::Transport,
    uid,
    wire::{Token, Value},
};

/// Builder options for [`ControlSession::new`] (spec §4.F).
#[derive(Debug, Clone)]
pub struct ControlSessionOptions {
    comid: Option<ComId>,
    max_com_packet_size: u32,
    receive_timeout: ReceiveTimeout,
}

impl Default for ControlSessionOptions {
    fn default() -> Self {
        Self { comid: None, max_com_packet_size: 1 << 20, receive_timeout: ReceiveTimeout::default() }
    }
}

impl ControlSessionOptions {
    pub fn with_comid(mut self, comid: ComId) -> Self {
        self.comid = Some(comid);
        self
    }

    pub fn with_max_com_packet_size(mut self, size: u32) -> Self {
        self.max_com_packet_size = size;
        self
    }

    pub fn with_receive_timeout(mut self, retries: u32, interval: std::time::Duration) -> Self {
        self.receive_timeout = ReceiveTimeout { retries, interval };
        self
    }
}

/// Owns the active properties and protocol level for one ComID (spec
/// §3). Regular [`crate::session::Session`]s borrow these.
pub struct ControlSession {
    comid: ComId,
    comid_ext: u16,
    protocol: ProtocolLevel,
    host_properties: Properties,
    tper_properties: Properties,
    host_max_com_packet_size: u32,
    receive_timeout: ReceiveTimeout,
    seq_last_xmit: u32,
}

impl ControlSession {
    pub fn new(
        transport: &mut dyn Transport,
        discovery: &Level0Discovery,
        options: ControlSessionOptions,
    ) -> Result<Self> {
        let tper = discovery.tper.ok_or(Error::TPerSyncNotSupported)?;
        if !tper.sync_supported {
            return Err(Error::TPerSyncNotSupported);
        }
        if tper.buffer_mgmt_supported {
            return Err(Error::TPerBufferManagementNotSupported);
        }

        let protocol =
            if discovery.enterprise.is_some() { ProtocolLevel::Enterprise } else { ProtocolLevel::Core };

        let comid = match options.comid {
            Some(c) => c,
            None => match get_comid(transport) {
                Ok(c) => c,
                Err(_) => {
                    let base = discovery.base_comid().ok_or(Error::NotSupported)?;
                    make_comid(base, 0)
                },
            },
        };

        if let Err(e) = stack_reset(transport, comid) {
            warn!(error = %e, comid, "best-effort StackReset failed, continuing");
        }

        let mut session = Self {
            comid,
            comid_ext: 0,
            protocol,
            host_properties: Properties::default(),
            tper_properties: properties::MINIMUM,
            host_max_com_packet_size: options.max_com_packet_size,
            receive_timeout: options.receive_timeout,
            seq_last_xmit: 0,
        };
        session.exchange_properties(transport)?;
        Ok(session)
    }

    pub fn comid(&self) -> ComId {
        self.comid
    }

    pub fn protocol(&self) -> ProtocolLevel {
        self.protocol
    }

    pub fn host_properties(&self) -> Properties {
        self.host_properties
    }

    pub fn tper_properties(&self) -> Properties {
        self.tper_properties
    }

    pub(crate) fn exchange_params(&self, tsn: u32, hsn: u32) -> ExchangeParams {
        ExchangeParams {
            comid: self.comid,
            comid_ext: self.comid_ext,
            tsn,
            hsn,
            tper_max_com_packet_size: self.tper_properties.max_com_packet_size,
            tper_max_packet_size: self.tper_properties.max_packet_size,
            host_max_com_packet_size: self.host_max_com_packet_size,
            sequence_numbers: self.host_properties.sequence_numbers && self.tper_properties.sequence_numbers,
            timeout: self.receive_timeout,
        }
    }

    pub(crate) fn execute_raw(&mut self, transport: &mut dyn Transport, tsn: u32, hsn: u32, payload: &[u8]) -> Result<Vec<u8>> {
        let params = self.exchange_params(tsn, hsn);
        execute(transport, &params, &mut self.seq_last_xmit, payload)
    }

    /// Issues `Properties`, parses the `SyncProperties` reply, and
    /// rebinds this session's `TPerProperties` to the negotiated caps
    /// (spec §4.F).
    fn exchange_properties(&mut self, transport: &mut dyn Transport) -> Result<()> {
        let host = Properties::default().clamped();
        let mut host_values = Vec::new();
        host.push_named(&mut host_values);

        let mut call = MethodCall::new(uid::SMUID, uid::method::session_manager::PROPERTIES, self.protocol);
        call.start_optional_param(0, "HostProperties");
        call.start_list();
        call.values(&host_values);
        call.end_list();
        call.end_optional_param();
        let payload = call.finish()?;

        let data = self.execute_raw(transport, 0, 0, &payload)?;
        let args = parse_response(&data)?;

        if args.len() < 4 || !args[0].eq_token(Token::Call) {
            return Err(Error::InvalidPropertiesResponse("missing Call envelope".into()));
        }
        if args[1].as_bytes() != Some(uid::SMUID.as_bytes().as_slice()) {
            return Err(Error::InvalidPropertiesResponse("echoed InvokingID is not SMUID".into()));
        }
        if args[2].as_bytes()
            != Some(uid::method::session_manager::SYNC_PROPERTIES.as_bytes().as_slice())
        {
            return Err(Error::InvalidPropertiesResponse("echoed MethodID is not SyncProperties".into()));
        }
        let outer = args[3]
            .as_list()
            .ok_or_else(|| Error::InvalidPropertiesResponse("missing properties group list".into()))?;
        let tper_list: &[Value] = outer
            .first()
            .and_then(Value::as_list)
            .ok_or_else(|| Error::InvalidPropertiesResponse("missing TPerProperties list".into()))?;

        self.tper_properties = Properties::from_values(tper_list)?;
        self.host_properties = host;
        debug!(
            max_com_packet_size = self.tper_properties.max_com_packet_size,
            max_packet_size = self.tper_properties.max_packet_size,
            sequence_numbers = self.tper_properties.sequence_numbers,
            "negotiated TPer properties"
        );
        Ok(())
    }

    /// A control session has a no-op close (spec §4.F).
    pub fn close(&mut self) {}
}
