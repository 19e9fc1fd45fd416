use heapless::{String, Vec};
use liquidcan_core::{DataType, FieldId, FieldKind, GroupId, LockState, StatusLevel, TypedValue};

use crate::message::payloads::{
    MAX_DEVICE_NAME_LENGTH, MAX_FIELD_NAME_LENGTH, MAX_GROUP_MEMBER_COUNT, MAX_GROUP_VALUE_LENGTH,
    MAX_STATUS_TEXT_LENGTH,
};

/// Events the engine buffers for the host; once full, the oldest is dropped.
pub const MAX_PENDING_EVENT_COUNT: usize = 8;

/// What the peer announced about itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub device_name: String<MAX_DEVICE_NAME_LENGTH>,
    pub telemetry_count: u8,
    pub parameter_count: u8,
    pub firmware_hash: u32,
    pub protocol_hash: u32,
}

/// Peer-initiated activity surfaced to the host
///
/// Everything here already happened; the engine replied or updated its state before
/// queueing the event. Hosts that ignore the queue lose history but not correctness.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// The peer introduced itself, by request or spontaneously.
    PeerInfo(PeerInfo),
    /// The peer reported a status line.
    StatusReceived {
        level: StatusLevel,
        text: String<MAX_STATUS_TEXT_LENGTH>,
    },
    /// The peer announced one entry of its field table.
    PeerFieldAnnounced {
        field_id: FieldId,
        data_type: DataType,
        kind: FieldKind,
        name: String<MAX_FIELD_NAME_LENGTH>,
    },
    /// The peer defined a telemetry group.
    PeerGroupDefined {
        group_id: GroupId,
        member_ids: Vec<FieldId, MAX_GROUP_MEMBER_COUNT>,
    },
    /// A group update arrived; values are packed in member order.
    GroupUpdateReceived {
        group_id: GroupId,
        values: Vec<u8, MAX_GROUP_VALUE_LENGTH>,
    },
    /// The peer probed liveness; the engine already echoed the counter.
    HeartbeatRequested { counter: u32 },
    /// The peer wrote one of the parameters; the value is already cached.
    ParameterSetRemotely {
        parameter_id: FieldId,
        value: TypedValue,
    },
    /// A parameter's lock state changed over the bus.
    ParameterLockChanged {
        parameter_id: FieldId,
        lock_state: LockState,
    },
}
