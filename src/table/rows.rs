// SPDX-License-Identifier: AGPL-3.0-or-later

//! Well-known row/table UIDs and decoders for the rows this crate's
//! callers actually need (spec §4.H, §6).
//!
//! Column layouts below follow the Core/Enterprise SSC "Reference
//! Tables" appendix; only the columns this crate exposes are decoded,
//! everything else in a row's `RowValues` is ignored.

use crate::{
    error::{Error, Result},
    session::Session,
    table::ops,
    transport::Transport,
    uid::Uid,
    wire::Value,
};

const C_PIN_PREFIX: [u8; 4] = [0, 0, 0, 0x0B];
const TPER_INFO_PREFIX: [u8; 4] = [0, 0, 2, 1];
const LOCKING_INFO_PREFIX: [u8; 4] = [0, 0, 8, 1];
const MBR_CONTROL_PREFIX: [u8; 4] = [0, 0, 0, 8];
const LOCKING_RANGE_PREFIX: [u8; 4] = [0, 0, 8, 2];

/// `C_PIN[MSID]` row UID -- holds the factory Media-Selectable ID PIN.
pub fn c_pin_msid_uid() -> Uid {
    Uid::row(C_PIN_PREFIX, 0x8402)
}

/// `C_PIN[SID]` row UID -- the Admin SP's `SID` authority PIN.
pub fn c_pin_sid_uid() -> Uid {
    Uid::row(C_PIN_PREFIX, 0x0001)
}

/// `C_PIN[Admin1]` row UID.
pub fn c_pin_admin1_uid() -> Uid {
    Uid::row(C_PIN_PREFIX, 0x0001_0001)
}

fn find<'a>(values: &'a [(String, Value)], name: &str) -> Option<&'a Value> {
    values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
}

fn find_uint(values: &[(String, Value)], name: &str) -> Result<u64> {
    find(values, name)
        .and_then(Value::as_uint)
        .ok_or_else(|| Error::MalformedMethodResponse(format!("row missing column {name}")))
}

fn find_bytes(values: &[(String, Value)], name: &str) -> Result<Vec<u8>> {
    find(values, name)
        .and_then(Value::as_bytes)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| Error::MalformedMethodResponse(format!("row missing column {name}")))
}

fn find_bool(values: &[(String, Value)], name: &str) -> Result<bool> {
    Ok(find_uint(values, name)? != 0)
}

/// Decodes a `Set`-typed column (e.g. `SSC` names) as a list of byte
/// strings, read lossily as UTF-8.
fn find_name_list(values: &[(String, Value)], name: &str) -> Vec<String> {
    find(values, name)
        .and_then(Value::as_list)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_bytes)
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .collect()
        })
        .unwrap_or_default()
}

/// `C_PIN` row -- just the `PIN` column, which is all this crate needs
/// from `MSID`/`SID`/`Admin1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CPinRow {
    pub pin: Vec<u8>,
}

/// Reads a `C_PIN` row's `PIN` column (column index 3).
pub fn read_c_pin(session: &mut Session, transport: &mut dyn Transport, row: Uid) -> Result<CPinRow> {
    let values = ops::get(session, transport, row, Some(3), Some(3))?;
    Ok(CPinRow { pin: find_bytes(&values, "PIN")? })
}

/// Sets a `C_PIN` row's `PIN` column, e.g. `Admin_C_PIN_SIDRow` ->
/// `Set` with `[StartName, OpalPIN(=3), bytes, EndName]` (spec §4.H).
pub fn write_c_pin(session: &mut Session, transport: &mut dyn Transport, row: Uid, pin: &[u8]) -> Result<()> {
    ops::set(session, transport, row, &[("PIN".to_string(), Value::Bytes(pin.to_vec()))])
}

/// `Admin_TPerInfoObj` row (Admin SP, single row), decoded into the full
/// typed record (spec §4.H).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TPerInfoRow {
    pub bytes: Vec<u8>,
    pub gudid: Vec<u8>,
    pub generation: u64,
    pub firmware_version: Vec<u8>,
    pub protocol_version: Vec<u8>,
    pub space_for_issuance: u64,
    pub ssc_names: Vec<String>,
    pub programmatic_reset_enable: bool,
}

pub fn tper_info_uid() -> Uid {
    Uid::row(TPER_INFO_PREFIX, 1)
}

pub fn read_tper_info(session: &mut Session, transport: &mut dyn Transport) -> Result<TPerInfoRow> {
    let values = ops::get_full_row(session, transport, tper_info_uid())?;
    Ok(TPerInfoRow {
        bytes: find_bytes(&values, "Bytes").unwrap_or_default(),
        gudid: find_bytes(&values, "GUDID").unwrap_or_default(),
        generation: find_uint(&values, "Generation").unwrap_or(0),
        firmware_version: find_bytes(&values, "FirmwareVersion").unwrap_or_default(),
        protocol_version: find_bytes(&values, "ProtocolVersion").unwrap_or_default(),
        space_for_issuance: find_uint(&values, "SpaceForIssuance").unwrap_or(0),
        ssc_names: find_name_list(&values, "SSC"),
        programmatic_reset_enable: find_bool(&values, "ProgrammaticResetEnable").unwrap_or(false),
    })
}

/// `LockingInfo` / `EnterpriseLockingInfo` row (Locking SP, single row),
/// decoded into the full typed record (spec §4.H).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockingInfoRow {
    pub name: Vec<u8>,
    pub version: u64,
    pub encrypt_supported: bool,
    pub max_ranges: u64,
    pub max_re_encryptions: u64,
    pub keys_available_cfg: u64,
    pub alignment_required: bool,
    pub alignment_granularity: u64,
    pub logical_block_size: u64,
    pub lowest_aligned_lba: u64,
}

pub fn locking_info_uid() -> Uid {
    Uid::row(LOCKING_INFO_PREFIX, 1)
}

pub fn read_locking_info(session: &mut Session, transport: &mut dyn Transport) -> Result<LockingInfoRow> {
    let values = ops::get_full_row(session, transport, locking_info_uid())?;
    Ok(LockingInfoRow {
        name: find_bytes(&values, "Name").unwrap_or_default(),
        version: find_uint(&values, "Version").unwrap_or(0),
        encrypt_supported: find_bool(&values, "EncryptSupport").unwrap_or(false),
        max_ranges: find_uint(&values, "MaxRanges").unwrap_or(0),
        max_re_encryptions: find_uint(&values, "MaxReEncryptions").unwrap_or(0),
        keys_available_cfg: find_uint(&values, "KeysAvailableCfg").unwrap_or(0),
        alignment_required: find_bool(&values, "AlignmentRequired").unwrap_or(false),
        alignment_granularity: find_uint(&values, "AlignmentGranularity").unwrap_or(0),
        logical_block_size: find_uint(&values, "LogicalBlockSize").unwrap_or(0),
        lowest_aligned_lba: find_uint(&values, "LowestAlignedLBA").unwrap_or(0),
    })
}

/// One `Locking` table row -- a single LBA range and its lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockingRangeRow {
    pub range_start: u64,
    pub range_length: u64,
    pub read_locked: bool,
    pub write_locked: bool,
    pub read_lock_enabled: bool,
    pub write_lock_enabled: bool,
}

/// The row UID for range `index` (`0` is the Global Range).
pub fn locking_range_uid(index: u32) -> Uid {
    Uid::row(LOCKING_RANGE_PREFIX, index)
}

/// The Global Range convenience row (index 0, spec §4.H impl note).
pub fn global_range_uid() -> Uid {
    locking_range_uid(0)
}

pub fn read_locking_range(
    session: &mut Session,
    transport: &mut dyn Transport,
    row: Uid,
) -> Result<LockingRangeRow> {
    let values = ops::get_full_row(session, transport, row)?;
    Ok(LockingRangeRow {
        range_start: find_uint(&values, "RangeStart").unwrap_or(0),
        range_length: find_uint(&values, "RangeLength").unwrap_or(0),
        read_locked: find_bool(&values, "ReadLocked").unwrap_or(false),
        write_locked: find_bool(&values, "WriteLocked").unwrap_or(false),
        read_lock_enabled: find_bool(&values, "ReadLockEnabled").unwrap_or(false),
        write_lock_enabled: find_bool(&values, "WriteLockEnabled").unwrap_or(false),
    })
}

pub fn write_locking_range(
    session: &mut Session,
    transport: &mut dyn Transport,
    row: Uid,
    read_locked: Option<bool>,
    write_locked: Option<bool>,
) -> Result<()> {
    let mut values = Vec::new();
    if let Some(v) = read_locked {
        values.push(("ReadLocked".to_string(), Value::Uint(v as u64)));
    }
    if let Some(v) = write_locked {
        values.push(("WriteLocked".to_string(), Value::Uint(v as u64)));
    }
    ops::set(session, transport, row, &values)
}

/// The Admin SP's own `LifeCycleState` (spec §4.H, `SP` table column 6).
/// Numbered per the Core spec's "Life Cycle State" table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeCycleState {
    Issued,
    IssuedDisabled,
    IssuedFrozen,
    IssuedFrozenLocked,
    IssuedFailed,
    ManufacturedInactive,
    Manufactured,
    ManufacturedDisabled,
    ManufacturedFrozen,
    ManufacturedFrozenLocked,
    ManufacturedFailed,
    Unknown(u64),
}

impl From<u64> for LifeCycleState {
    fn from(code: u64) -> Self {
        match code {
            0 => Self::Issued,
            1 => Self::IssuedDisabled,
            2 => Self::IssuedFrozen,
            3 => Self::IssuedFrozenLocked,
            4 => Self::IssuedFailed,
            8 => Self::ManufacturedInactive,
            9 => Self::Manufactured,
            10 => Self::ManufacturedDisabled,
            11 => Self::ManufacturedFrozen,
            12 => Self::ManufacturedFrozenLocked,
            13 => Self::ManufacturedFailed,
            other => Self::Unknown(other),
        }
    }
}

/// Reads an SP row's `LifeCycleState` column (column index 6).
pub fn read_life_cycle_state(session: &mut Session, transport: &mut dyn Transport, sp: Uid) -> Result<LifeCycleState> {
    let values = ops::get(session, transport, sp, Some(6), Some(6))?;
    Ok(LifeCycleState::from(find_uint(&values, "LifeCycleState")?))
}

/// `MBRControl` row (Locking SP, single row).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbrControlRow {
    pub enable: bool,
    pub done: bool,
}

pub fn mbr_control_uid() -> Uid {
    Uid::row(MBR_CONTROL_PREFIX, 1)
}

pub fn read_mbr_control(session: &mut Session, transport: &mut dyn Transport) -> Result<MbrControlRow> {
    let values = ops::get_full_row(session, transport, mbr_control_uid())?;
    Ok(MbrControlRow {
        enable: find_bool(&values, "Enable").unwrap_or(false),
        done: find_bool(&values, "Done").unwrap_or(false),
    })
}

pub fn write_mbr_control(
    session: &mut Session,
    transport: &mut dyn Transport,
    enable: Option<bool>,
    done: Option<bool>,
) -> Result<()> {
    let mut values = Vec::new();
    if let Some(v) = enable {
        values.push(("Enable".to_string(), Value::Uint(v as u64)));
    }
    if let Some(v) = done {
        values.push(("Done".to_string(), Value::Uint(v as u64)));
    }
    ops::set(session, transport, mbr_control_uid(), &values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_pin_rows_have_distinct_uids() {
        assert_ne!(c_pin_msid_uid(), c_pin_sid_uid());
        assert_ne!(c_pin_sid_uid(), c_pin_admin1_uid());
    }

    #[test]
    fn global_range_is_range_index_zero() {
        assert_eq!(global_range_uid(), locking_range_uid(0));
        assert_eq!(global_range_uid(), crate::uid::GLOBAL_RANGE);
    }

    #[test]
    fn life_cycle_state_decodes_known_and_unknown_codes() {
        assert_eq!(LifeCycleState::from(0), LifeCycleState::Issued);
        assert_eq!(LifeCycleState::from(9), LifeCycleState::Manufactured);
        assert_eq!(LifeCycleState::from(99), LifeCycleState::Unknown(99));
    }
}
