//! Application messages and their wire form
//!
//! A message is one payload: the kind byte first, then the fixed fields of the body in
//! little-endian order, then any variable-length region prefixed by its length byte.
//! [`Message::encode`] and [`Message::decode`] are the only code that touches the kind
//! byte; the bodies live in [`payloads`].

pub mod payloads;

use liquidcan_driver::frame::Payload;

pub use payloads::{
    FieldGet, FieldGetResponse, FieldIdLookup, FieldIdLookupResponse, FieldRegistration,
    GroupDefinition, GroupUpdate, Heartbeat, LockConfirmation, LockRequest, NodeInfo, Overflow,
    ParameterSet, ParameterSetConfirmation, StatusText,
};

use crate::wire::{DecodeError, Deserialize, ReadCursor, Serialize, WriteCursor};

/// Discriminates the message kinds on the wire
///
/// The codes are grouped by concern with gaps left for additions, so the numbering is
/// part of the protocol and must not be compacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MessageKind {
    NodeInfoRequest = 0,
    NodeInfoAnnouncement = 1,
    InfoStatus = 10,
    WarningStatus = 11,
    ErrorStatus = 12,
    TelemetryValueRegistration = 20,
    ParameterRegistration = 21,
    TelemetryGroupDefinition = 30,
    TelemetryGroupUpdate = 31,
    HeartbeatRequest = 40,
    HeartbeatResponse = 41,
    ParameterSetRequest = 50,
    ParameterSetConfirmation = 51,
    ParameterSetLockRequest = 52,
    ParameterSetLockConfirmation = 53,
    FieldGetRequest = 60,
    FieldGetResponse = 61,
    FieldIdLookupRequest = 62,
    FieldIdLookupResponse = 63,
}

impl MessageKind {
    pub const fn try_from_u8(value: u8) -> Option<Self> {
        let kind = match value {
            0 => Self::NodeInfoRequest,
            1 => Self::NodeInfoAnnouncement,
            10 => Self::InfoStatus,
            11 => Self::WarningStatus,
            12 => Self::ErrorStatus,
            20 => Self::TelemetryValueRegistration,
            21 => Self::ParameterRegistration,
            30 => Self::TelemetryGroupDefinition,
            31 => Self::TelemetryGroupUpdate,
            40 => Self::HeartbeatRequest,
            41 => Self::HeartbeatResponse,
            50 => Self::ParameterSetRequest,
            51 => Self::ParameterSetConfirmation,
            52 => Self::ParameterSetLockRequest,
            53 => Self::ParameterSetLockConfirmation,
            60 => Self::FieldGetRequest,
            61 => Self::FieldGetResponse,
            62 => Self::FieldIdLookupRequest,
            63 => Self::FieldIdLookupResponse,
            _ => return None,
        };
        Some(kind)
    }

    pub const fn into_u8(self) -> u8 {
        self as u8
    }
}

impl From<MessageKind> for u8 {
    fn from(kind: MessageKind) -> Self {
        kind.into_u8()
    }
}

/// A decoded application message
///
/// Requests and their responses share body types where the layout is identical; the kind
/// alone tells them apart. An info request carries the requester's own [`NodeInfo`] so a
/// single exchange acquaints both nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    NodeInfoRequest(NodeInfo),
    NodeInfoAnnouncement(NodeInfo),
    InfoStatus(StatusText),
    WarningStatus(StatusText),
    ErrorStatus(StatusText),
    TelemetryValueRegistration(FieldRegistration),
    ParameterRegistration(FieldRegistration),
    TelemetryGroupDefinition(GroupDefinition),
    TelemetryGroupUpdate(GroupUpdate),
    HeartbeatRequest(Heartbeat),
    HeartbeatResponse(Heartbeat),
    ParameterSetRequest(ParameterSet),
    ParameterSetConfirmation(ParameterSetConfirmation),
    ParameterSetLockRequest(LockRequest),
    ParameterSetLockConfirmation(LockConfirmation),
    FieldGetRequest(FieldGet),
    FieldGetResponse(FieldGetResponse),
    FieldIdLookupRequest(FieldIdLookup),
    FieldIdLookupResponse(FieldIdLookupResponse),
}

impl Message {
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::NodeInfoRequest(_) => MessageKind::NodeInfoRequest,
            Self::NodeInfoAnnouncement(_) => MessageKind::NodeInfoAnnouncement,
            Self::InfoStatus(_) => MessageKind::InfoStatus,
            Self::WarningStatus(_) => MessageKind::WarningStatus,
            Self::ErrorStatus(_) => MessageKind::ErrorStatus,
            Self::TelemetryValueRegistration(_) => MessageKind::TelemetryValueRegistration,
            Self::ParameterRegistration(_) => MessageKind::ParameterRegistration,
            Self::TelemetryGroupDefinition(_) => MessageKind::TelemetryGroupDefinition,
            Self::TelemetryGroupUpdate(_) => MessageKind::TelemetryGroupUpdate,
            Self::HeartbeatRequest(_) => MessageKind::HeartbeatRequest,
            Self::HeartbeatResponse(_) => MessageKind::HeartbeatResponse,
            Self::ParameterSetRequest(_) => MessageKind::ParameterSetRequest,
            Self::ParameterSetConfirmation(_) => MessageKind::ParameterSetConfirmation,
            Self::ParameterSetLockRequest(_) => MessageKind::ParameterSetLockRequest,
            Self::ParameterSetLockConfirmation(_) => MessageKind::ParameterSetLockConfirmation,
            Self::FieldGetRequest(_) => MessageKind::FieldGetRequest,
            Self::FieldGetResponse(_) => MessageKind::FieldGetResponse,
            Self::FieldIdLookupRequest(_) => MessageKind::FieldIdLookupRequest,
            Self::FieldIdLookupResponse(_) => MessageKind::FieldIdLookupResponse,
        }
    }

    /// Encodes the message into a single payload.
    ///
    /// The body capacities are sized so that every possible message fits [`Payload::MAX`]
    /// bytes including the kind byte, so encoding cannot fail.
    pub fn encode(&self) -> Payload {
        let mut buffer = [0u8; Payload::MAX];
        let mut cursor = WriteCursor::new(&mut buffer);
        cursor.write_u8(self.kind().into_u8());
        match self {
            Self::NodeInfoRequest(body) | Self::NodeInfoAnnouncement(body) => {
                body.serialize(&mut cursor)
            }
            Self::InfoStatus(body) | Self::WarningStatus(body) | Self::ErrorStatus(body) => {
                body.serialize(&mut cursor)
            }
            Self::TelemetryValueRegistration(body) | Self::ParameterRegistration(body) => {
                body.serialize(&mut cursor)
            }
            Self::TelemetryGroupDefinition(body) => body.serialize(&mut cursor),
            Self::TelemetryGroupUpdate(body) => body.serialize(&mut cursor),
            Self::HeartbeatRequest(body) | Self::HeartbeatResponse(body) => {
                body.serialize(&mut cursor)
            }
            Self::ParameterSetRequest(body) => body.serialize(&mut cursor),
            Self::ParameterSetConfirmation(body) => body.serialize(&mut cursor),
            Self::ParameterSetLockRequest(body) => body.serialize(&mut cursor),
            Self::ParameterSetLockConfirmation(body) => body.serialize(&mut cursor),
            Self::FieldGetRequest(body) => body.serialize(&mut cursor),
            Self::FieldGetResponse(body) => body.serialize(&mut cursor),
            Self::FieldIdLookupRequest(body) => body.serialize(&mut cursor),
            Self::FieldIdLookupResponse(body) => body.serialize(&mut cursor),
        }
        let length = cursor.position();
        unwrap!(Payload::new(&buffer[..length]))
    }

    /// Decodes one payload.
    ///
    /// Bytes past the decoded body are ignored; transports that quantize frame lengths
    /// may leave zero padding behind.
    pub fn decode(payload: &Payload) -> Result<Self, DecodeError> {
        let mut cursor = ReadCursor::new(payload);
        let kind =
            MessageKind::try_from_u8(cursor.read_u8()?).ok_or(DecodeError::UnknownKind)?;
        let message = match kind {
            MessageKind::NodeInfoRequest => Self::NodeInfoRequest(NodeInfo::deserialize(&mut cursor)?),
            MessageKind::NodeInfoAnnouncement => {
                Self::NodeInfoAnnouncement(NodeInfo::deserialize(&mut cursor)?)
            }
            MessageKind::InfoStatus => Self::InfoStatus(StatusText::deserialize(&mut cursor)?),
            MessageKind::WarningStatus => Self::WarningStatus(StatusText::deserialize(&mut cursor)?),
            MessageKind::ErrorStatus => Self::ErrorStatus(StatusText::deserialize(&mut cursor)?),
            MessageKind::TelemetryValueRegistration => {
                Self::TelemetryValueRegistration(FieldRegistration::deserialize(&mut cursor)?)
            }
            MessageKind::ParameterRegistration => {
                Self::ParameterRegistration(FieldRegistration::deserialize(&mut cursor)?)
            }
            MessageKind::TelemetryGroupDefinition => {
                Self::TelemetryGroupDefinition(GroupDefinition::deserialize(&mut cursor)?)
            }
            MessageKind::TelemetryGroupUpdate => {
                Self::TelemetryGroupUpdate(GroupUpdate::deserialize(&mut cursor)?)
            }
            MessageKind::HeartbeatRequest => {
                Self::HeartbeatRequest(Heartbeat::deserialize(&mut cursor)?)
            }
            MessageKind::HeartbeatResponse => {
                Self::HeartbeatResponse(Heartbeat::deserialize(&mut cursor)?)
            }
            MessageKind::ParameterSetRequest => {
                Self::ParameterSetRequest(ParameterSet::deserialize(&mut cursor)?)
            }
            MessageKind::ParameterSetConfirmation => {
                Self::ParameterSetConfirmation(ParameterSetConfirmation::deserialize(&mut cursor)?)
            }
            MessageKind::ParameterSetLockRequest => {
                Self::ParameterSetLockRequest(LockRequest::deserialize(&mut cursor)?)
            }
            MessageKind::ParameterSetLockConfirmation => {
                Self::ParameterSetLockConfirmation(LockConfirmation::deserialize(&mut cursor)?)
            }
            MessageKind::FieldGetRequest => Self::FieldGetRequest(FieldGet::deserialize(&mut cursor)?),
            MessageKind::FieldGetResponse => {
                Self::FieldGetResponse(FieldGetResponse::deserialize(&mut cursor)?)
            }
            MessageKind::FieldIdLookupRequest => {
                Self::FieldIdLookupRequest(FieldIdLookup::deserialize(&mut cursor)?)
            }
            MessageKind::FieldIdLookupResponse => {
                Self::FieldIdLookupResponse(FieldIdLookupResponse::deserialize(&mut cursor)?)
            }
        };
        Ok(message)
    }
}
