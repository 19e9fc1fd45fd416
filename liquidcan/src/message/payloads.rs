//! Payload bodies shared by the message kinds
//!
//! Every variable-length region is capped so that the kind byte, the fixed fields, the
//! length prefix, and the region itself never exceed the 64-byte payload limit. The caps
//! are enforced by the `heapless` field capacities: constructors fail on oversized input
//! instead of truncating it.

use heapless::Vec;
use liquidcan_core::{DataType, FieldId, GroupId, LockState, ParameterSetStatus};

use crate::wire::{DecodeError, Deserialize, ReadCursor, Serialize, WriteCursor};

pub const MAX_DEVICE_NAME_LENGTH: usize = 52;
pub const MAX_STATUS_TEXT_LENGTH: usize = 62;
pub const MAX_FIELD_NAME_LENGTH: usize = 60;
pub const MAX_GROUP_MEMBER_COUNT: usize = 61;
pub const MAX_GROUP_VALUE_LENGTH: usize = 61;
pub const MAX_VALUE_LENGTH: usize = 61;
pub const MAX_CONFIRMATION_VALUE_LENGTH: usize = 60;
pub const MAX_LOOKUP_NAME_LENGTH: usize = 61;

/// A variable-length argument does not fit its wire region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Overflow;

fn read_bounded<const N: usize>(cursor: &mut ReadCursor<'_>) -> Result<Vec<u8, N>, DecodeError> {
    let bytes = cursor.read_variable(N)?;
    Ok(unwrap!(Vec::from_slice(bytes)))
}

/// Identity of a node: field counts, build hashes, and a display name
///
/// Carried by both the info request and the announcement, so a request doubles as the
/// requester's own announcement and discovery stays symmetric. `protocol_hash` digests the
/// field table both ends compiled against; a mismatch means the shared id vocabulary drifted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub telemetry_count: u8,
    pub parameter_count: u8,
    pub firmware_hash: u32,
    pub protocol_hash: u32,
    pub device_name: Vec<u8, MAX_DEVICE_NAME_LENGTH>,
}

impl NodeInfo {
    pub fn new(
        telemetry_count: u8,
        parameter_count: u8,
        firmware_hash: u32,
        protocol_hash: u32,
        device_name: &str,
    ) -> Result<Self, Overflow> {
        Ok(Self {
            telemetry_count,
            parameter_count,
            firmware_hash,
            protocol_hash,
            device_name: Vec::from_slice(device_name.as_bytes()).map_err(|_| Overflow)?,
        })
    }
}

impl Serialize for NodeInfo {
    fn size_bytes(&self) -> usize {
        11 + self.device_name.len()
    }

    fn serialize(&self, cursor: &mut WriteCursor<'_>) {
        cursor.write_u8(self.telemetry_count);
        cursor.write_u8(self.parameter_count);
        cursor.write_u32(self.firmware_hash);
        cursor.write_u32(self.protocol_hash);
        cursor.write_u8(self.device_name.len() as u8);
        cursor.write_bytes(&self.device_name);
    }
}

impl Deserialize for NodeInfo {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            telemetry_count: cursor.read_u8()?,
            parameter_count: cursor.read_u8()?,
            firmware_hash: cursor.read_u32()?,
            protocol_hash: cursor.read_u32()?,
            device_name: read_bounded(cursor)?,
        })
    }
}

/// Free-form status text; the severity lives in the message kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusText {
    pub text: Vec<u8, MAX_STATUS_TEXT_LENGTH>,
}

impl StatusText {
    pub fn new(text: &str) -> Result<Self, Overflow> {
        Ok(Self {
            text: Vec::from_slice(text.as_bytes()).map_err(|_| Overflow)?,
        })
    }
}

impl Serialize for StatusText {
    fn size_bytes(&self) -> usize {
        1 + self.text.len()
    }

    fn serialize(&self, cursor: &mut WriteCursor<'_>) {
        cursor.write_u8(self.text.len() as u8);
        cursor.write_bytes(&self.text);
    }
}

impl Deserialize for StatusText {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            text: read_bounded(cursor)?,
        })
    }
}

/// Announces one entry of the sender's field table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRegistration {
    pub field_id: FieldId,
    pub data_type: DataType,
    pub field_name: Vec<u8, MAX_FIELD_NAME_LENGTH>,
}

impl FieldRegistration {
    pub fn new(field_id: FieldId, data_type: DataType, field_name: &str) -> Result<Self, Overflow> {
        Ok(Self {
            field_id,
            data_type,
            field_name: Vec::from_slice(field_name.as_bytes()).map_err(|_| Overflow)?,
        })
    }
}

impl Serialize for FieldRegistration {
    fn size_bytes(&self) -> usize {
        3 + self.field_name.len()
    }

    fn serialize(&self, cursor: &mut WriteCursor<'_>) {
        cursor.write_u8(self.field_id.into_u8());
        cursor.write_u8(self.data_type.into_u8());
        cursor.write_u8(self.field_name.len() as u8);
        cursor.write_bytes(&self.field_name);
    }
}

impl Deserialize for FieldRegistration {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            field_id: FieldId::new(cursor.read_u8()?),
            data_type: DataType::try_from(cursor.read_u8()?)?,
            field_name: read_bounded(cursor)?,
        })
    }
}

/// Declares which telemetry fields a group update packs, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDefinition {
    pub group_id: GroupId,
    pub member_ids: Vec<FieldId, MAX_GROUP_MEMBER_COUNT>,
}

impl GroupDefinition {
    pub fn new(group_id: GroupId, member_ids: &[FieldId]) -> Result<Self, Overflow> {
        Ok(Self {
            group_id,
            member_ids: Vec::from_slice(member_ids).map_err(|_| Overflow)?,
        })
    }
}

impl Serialize for GroupDefinition {
    fn size_bytes(&self) -> usize {
        2 + self.member_ids.len()
    }

    fn serialize(&self, cursor: &mut WriteCursor<'_>) {
        cursor.write_u8(self.group_id.into_u8());
        cursor.write_u8(self.member_ids.len() as u8);
        for member in &self.member_ids {
            cursor.write_u8(member.into_u8());
        }
    }
}

impl Deserialize for GroupDefinition {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DecodeError> {
        let group_id = GroupId::new(cursor.read_u8()?);
        let bytes = cursor.read_variable(MAX_GROUP_MEMBER_COUNT)?;
        let mut member_ids = Vec::new();
        for &byte in bytes {
            unwrap!(member_ids.push(FieldId::new(byte)));
        }
        Ok(Self {
            group_id,
            member_ids,
        })
    }
}

/// One sample of every member of a group, packed back to back in member order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupUpdate {
    pub group_id: GroupId,
    pub values: Vec<u8, MAX_GROUP_VALUE_LENGTH>,
}

impl GroupUpdate {
    pub fn new(group_id: GroupId, values: &[u8]) -> Result<Self, Overflow> {
        Ok(Self {
            group_id,
            values: Vec::from_slice(values).map_err(|_| Overflow)?,
        })
    }
}

impl Serialize for GroupUpdate {
    fn size_bytes(&self) -> usize {
        2 + self.values.len()
    }

    fn serialize(&self, cursor: &mut WriteCursor<'_>) {
        cursor.write_u8(self.group_id.into_u8());
        cursor.write_u8(self.values.len() as u8);
        cursor.write_bytes(&self.values);
    }
}

impl Deserialize for GroupUpdate {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            group_id: GroupId::new(cursor.read_u8()?),
            values: read_bounded(cursor)?,
        })
    }
}

/// Liveness probe counter, echoed verbatim by the responder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Heartbeat {
    pub counter: u32,
}

impl Serialize for Heartbeat {
    fn size_bytes(&self) -> usize {
        4
    }

    fn serialize(&self, cursor: &mut WriteCursor<'_>) {
        cursor.write_u32(self.counter);
    }
}

impl Deserialize for Heartbeat {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            counter: cursor.read_u32()?,
        })
    }
}

/// Asks the peer to write a parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSet {
    pub parameter_id: FieldId,
    pub value: Vec<u8, MAX_VALUE_LENGTH>,
}

impl ParameterSet {
    pub fn new(parameter_id: FieldId, value: &[u8]) -> Result<Self, Overflow> {
        Ok(Self {
            parameter_id,
            value: Vec::from_slice(value).map_err(|_| Overflow)?,
        })
    }
}

impl Serialize for ParameterSet {
    fn size_bytes(&self) -> usize {
        2 + self.value.len()
    }

    fn serialize(&self, cursor: &mut WriteCursor<'_>) {
        cursor.write_u8(self.parameter_id.into_u8());
        cursor.write_u8(self.value.len() as u8);
        cursor.write_bytes(&self.value);
    }
}

impl Deserialize for ParameterSet {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            parameter_id: FieldId::new(cursor.read_u8()?),
            value: read_bounded(cursor)?,
        })
    }
}

/// Outcome of a set request; echoes the applied value on success
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSetConfirmation {
    pub parameter_id: FieldId,
    pub status: ParameterSetStatus,
    pub value: Vec<u8, MAX_CONFIRMATION_VALUE_LENGTH>,
}

impl ParameterSetConfirmation {
    pub fn new(
        parameter_id: FieldId,
        status: ParameterSetStatus,
        value: &[u8],
    ) -> Result<Self, Overflow> {
        Ok(Self {
            parameter_id,
            status,
            value: Vec::from_slice(value).map_err(|_| Overflow)?,
        })
    }
}

impl Serialize for ParameterSetConfirmation {
    fn size_bytes(&self) -> usize {
        3 + self.value.len()
    }

    fn serialize(&self, cursor: &mut WriteCursor<'_>) {
        cursor.write_u8(self.parameter_id.into_u8());
        cursor.write_u8(self.status.into_u8());
        cursor.write_u8(self.value.len() as u8);
        cursor.write_bytes(&self.value);
    }
}

impl Deserialize for ParameterSetConfirmation {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            parameter_id: FieldId::new(cursor.read_u8()?),
            status: ParameterSetStatus::try_from(cursor.read_u8()?)?,
            value: read_bounded(cursor)?,
        })
    }
}

/// Asks the peer to lock or unlock a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LockRequest {
    pub parameter_id: FieldId,
    pub lock_state: LockState,
}

impl Serialize for LockRequest {
    fn size_bytes(&self) -> usize {
        2
    }

    fn serialize(&self, cursor: &mut WriteCursor<'_>) {
        cursor.write_u8(self.parameter_id.into_u8());
        cursor.write_u8(self.lock_state.into_u8());
    }
}

impl Deserialize for LockRequest {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            parameter_id: FieldId::new(cursor.read_u8()?),
            lock_state: LockState::try_from(cursor.read_u8()?)?,
        })
    }
}

/// Outcome of a lock request; echoes the requested state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LockConfirmation {
    pub parameter_id: FieldId,
    pub lock_state: LockState,
    pub status: ParameterSetStatus,
}

impl Serialize for LockConfirmation {
    fn size_bytes(&self) -> usize {
        3
    }

    fn serialize(&self, cursor: &mut WriteCursor<'_>) {
        cursor.write_u8(self.parameter_id.into_u8());
        cursor.write_u8(self.lock_state.into_u8());
        cursor.write_u8(self.status.into_u8());
    }
}

impl Deserialize for LockConfirmation {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            parameter_id: FieldId::new(cursor.read_u8()?),
            lock_state: LockState::try_from(cursor.read_u8()?)?,
            status: ParameterSetStatus::try_from(cursor.read_u8()?)?,
        })
    }
}

/// Asks the peer for its last known value of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldGet {
    pub field_id: FieldId,
}

impl Serialize for FieldGet {
    fn size_bytes(&self) -> usize {
        1
    }

    fn serialize(&self, cursor: &mut WriteCursor<'_>) {
        cursor.write_u8(self.field_id.into_u8());
    }
}

impl Deserialize for FieldGet {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            field_id: FieldId::new(cursor.read_u8()?),
        })
    }
}

/// Carries the requested field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldGetResponse {
    pub field_id: FieldId,
    pub value: Vec<u8, MAX_VALUE_LENGTH>,
}

impl FieldGetResponse {
    pub fn new(field_id: FieldId, value: &[u8]) -> Result<Self, Overflow> {
        Ok(Self {
            field_id,
            value: Vec::from_slice(value).map_err(|_| Overflow)?,
        })
    }
}

impl Serialize for FieldGetResponse {
    fn size_bytes(&self) -> usize {
        2 + self.value.len()
    }

    fn serialize(&self, cursor: &mut WriteCursor<'_>) {
        cursor.write_u8(self.field_id.into_u8());
        cursor.write_u8(self.value.len() as u8);
        cursor.write_bytes(&self.value);
    }
}

impl Deserialize for FieldGetResponse {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            field_id: FieldId::new(cursor.read_u8()?),
            value: read_bounded(cursor)?,
        })
    }
}

/// Resolves a field name to its numeric id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIdLookup {
    pub field_name: Vec<u8, MAX_LOOKUP_NAME_LENGTH>,
}

impl FieldIdLookup {
    pub fn new(field_name: &str) -> Result<Self, Overflow> {
        Ok(Self {
            field_name: Vec::from_slice(field_name.as_bytes()).map_err(|_| Overflow)?,
        })
    }
}

impl Serialize for FieldIdLookup {
    fn size_bytes(&self) -> usize {
        1 + self.field_name.len()
    }

    fn serialize(&self, cursor: &mut WriteCursor<'_>) {
        cursor.write_u8(self.field_name.len() as u8);
        cursor.write_bytes(&self.field_name);
    }
}

impl Deserialize for FieldIdLookup {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            field_name: read_bounded(cursor)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldIdLookupResponse {
    pub field_id: FieldId,
    pub data_type: DataType,
}

impl Serialize for FieldIdLookupResponse {
    fn size_bytes(&self) -> usize {
        2
    }

    fn serialize(&self, cursor: &mut WriteCursor<'_>) {
        cursor.write_u8(self.field_id.into_u8());
        cursor.write_u8(self.data_type.into_u8());
    }
}

impl Deserialize for FieldIdLookupResponse {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            field_id: FieldId::new(cursor.read_u8()?),
            data_type: DataType::try_from(cursor.read_u8()?)?,
        })
    }
}
