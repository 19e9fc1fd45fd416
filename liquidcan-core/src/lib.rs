//! LiquidCan protocol core data types
//!
//! This crate provides basic data type definitions used by other LiquidCan crates.
//! LiquidCan users should not depend on this crate directly. Use `liquidcan::core` reexport instead.
#![no_std]

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidValue;

/// Scalar type of a field value
///
/// The type has explicit numeric encoding matching the wire tag used by field registrations,
/// lookup responses, and the value regions they describe. Values of every type are carried
/// little-endian and occupy exactly [`DataType::width`] bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DataType {
    /// IEEE 754 binary32, 4 bytes
    Float32 = 0,
    /// Signed 32-bit integer, 4 bytes
    Int32 = 1,
    /// Signed 16-bit integer, 2 bytes
    Int16 = 2,
    /// Signed 8-bit integer, 1 byte
    Int8 = 3,
    /// Unsigned 32-bit integer, 4 bytes
    Uint32 = 4,
    /// Unsigned 16-bit integer, 2 bytes
    Uint16 = 5,
    /// Unsigned 8-bit integer, 1 byte
    Uint8 = 6,
    /// Single byte holding 0 or 1
    Boolean = 7,
}

impl DataType {
    pub const MIN: DataType = DataType::Float32;
    pub const MAX: DataType = DataType::Boolean;

    pub const fn try_from_u8(code: u8) -> Option<DataType> {
        if code <= Self::MAX.into_u8() {
            Some(DataType::from_u8_truncating(code))
        } else {
            None
        }
    }

    pub const fn from_u8_truncating(code: u8) -> DataType {
        match code & 0x7 {
            0 => DataType::Float32,
            1 => DataType::Int32,
            2 => DataType::Int16,
            3 => DataType::Int8,
            4 => DataType::Uint32,
            5 => DataType::Uint16,
            6 => DataType::Uint8,
            7 => DataType::Boolean,
            _ => unreachable!(),
        }
    }

    pub const fn into_u8(self) -> u8 {
        self as u8
    }

    /// Encoded value width in bytes
    pub const fn width(self) -> usize {
        match self {
            DataType::Float32 => 4,
            DataType::Int32 => 4,
            DataType::Int16 => 2,
            DataType::Int8 => 1,
            DataType::Uint32 => 4,
            DataType::Uint16 => 2,
            DataType::Uint8 => 1,
            DataType::Boolean => 1,
        }
    }
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for DataType {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from_u8(value).ok_or(InvalidValue)
    }
}

/// A field value together with its scalar type
///
/// The variant set mirrors [`DataType`] one to one. Conversions to and from wire bytes are
/// little-endian and length-exact: a value of type `T` always occupies `T.width()` bytes.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TypedValue {
    Float32(f32),
    Int32(i32),
    Int16(i16),
    Int8(i8),
    Uint32(u32),
    Uint16(u16),
    Uint8(u8),
    Boolean(bool),
}

impl TypedValue {
    /// The longest encoded value width in bytes
    pub const MAX_WIDTH: usize = 4;

    pub const fn data_type(&self) -> DataType {
        match self {
            TypedValue::Float32(_) => DataType::Float32,
            TypedValue::Int32(_) => DataType::Int32,
            TypedValue::Int16(_) => DataType::Int16,
            TypedValue::Int8(_) => DataType::Int8,
            TypedValue::Uint32(_) => DataType::Uint32,
            TypedValue::Uint16(_) => DataType::Uint16,
            TypedValue::Uint8(_) => DataType::Uint8,
            TypedValue::Boolean(_) => DataType::Boolean,
        }
    }

    pub const fn width(&self) -> usize {
        self.data_type().width()
    }

    /// Writes the little-endian encoding into the start of `buffer` and returns its width.
    ///
    /// Panics if `buffer` is shorter than the value width.
    pub fn write_le(&self, buffer: &mut [u8]) -> usize {
        let width = self.width();
        assert!(buffer.len() >= width);
        match *self {
            TypedValue::Float32(value) => buffer[..4].copy_from_slice(&value.to_le_bytes()),
            TypedValue::Int32(value) => buffer[..4].copy_from_slice(&value.to_le_bytes()),
            TypedValue::Int16(value) => buffer[..2].copy_from_slice(&value.to_le_bytes()),
            TypedValue::Int8(value) => buffer[..1].copy_from_slice(&value.to_le_bytes()),
            TypedValue::Uint32(value) => buffer[..4].copy_from_slice(&value.to_le_bytes()),
            TypedValue::Uint16(value) => buffer[..2].copy_from_slice(&value.to_le_bytes()),
            TypedValue::Uint8(value) => buffer[..1].copy_from_slice(&value.to_le_bytes()),
            TypedValue::Boolean(value) => buffer[0] = value as u8,
        }
        width
    }

    /// Decodes a value of the given type from its exact little-endian encoding.
    ///
    /// Fails when `bytes` does not match the type width, or when a boolean byte
    /// holds anything other than 0 or 1.
    pub fn read_le(data_type: DataType, bytes: &[u8]) -> Result<Self, InvalidValue> {
        if bytes.len() != data_type.width() {
            return Err(InvalidValue);
        }
        let value = match data_type {
            DataType::Float32 => {
                TypedValue::Float32(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            DataType::Int32 => {
                TypedValue::Int32(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            DataType::Int16 => TypedValue::Int16(i16::from_le_bytes([bytes[0], bytes[1]])),
            DataType::Int8 => TypedValue::Int8(bytes[0] as i8),
            DataType::Uint32 => {
                TypedValue::Uint32(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            DataType::Uint16 => TypedValue::Uint16(u16::from_le_bytes([bytes[0], bytes[1]])),
            DataType::Uint8 => TypedValue::Uint8(bytes[0]),
            DataType::Boolean => match bytes[0] {
                0 => TypedValue::Boolean(false),
                1 => TypedValue::Boolean(true),
                _ => return Err(InvalidValue),
            },
        };
        Ok(value)
    }
}

/// Outcome of a parameter set or lock request, reported by the responding node
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ParameterSetStatus {
    /// The request was applied.
    Success = 0,
    /// The id does not name a parameter on the responding node.
    InvalidParameterId = 1,
    /// The parameter is locked and bus writes are rejected.
    ParameterLocked = 2,
    /// The change was applied on behalf of another node. Confirmations with this status
    /// arrive without a matching request and exist to keep observers consistent.
    NodeToNodeModification = 3,
}

impl ParameterSetStatus {
    pub const MIN: ParameterSetStatus = ParameterSetStatus::Success;
    pub const MAX: ParameterSetStatus = ParameterSetStatus::NodeToNodeModification;

    pub const fn try_from_u8(code: u8) -> Option<ParameterSetStatus> {
        match code {
            0 => Some(ParameterSetStatus::Success),
            1 => Some(ParameterSetStatus::InvalidParameterId),
            2 => Some(ParameterSetStatus::ParameterLocked),
            3 => Some(ParameterSetStatus::NodeToNodeModification),
            _ => None,
        }
    }

    pub const fn into_u8(self) -> u8 {
        self as u8
    }
}

impl From<ParameterSetStatus> for u8 {
    fn from(value: ParameterSetStatus) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for ParameterSetStatus {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from_u8(value).ok_or(InvalidValue)
    }
}

/// Severity of a status broadcast
///
/// Each severity maps to its own message kind on the wire, so the level survives
/// even when the text is ignored.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// Role of a registered field
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldKind {
    /// Published by the owning node; read-only for the peer.
    Telemetry,
    /// Writable over the bus through set requests, subject to lock arbitration.
    Parameter,
}

/// Lock state of a parameter
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LockState {
    Unlocked = 0,
    Locked = 1,
}

impl LockState {
    pub const fn try_from_u8(code: u8) -> Option<LockState> {
        match code {
            0 => Some(LockState::Unlocked),
            1 => Some(LockState::Locked),
            _ => None,
        }
    }

    pub const fn into_u8(self) -> u8 {
        self as u8
    }

    pub const fn is_locked(self) -> bool {
        matches!(self, LockState::Locked)
    }
}

impl From<bool> for LockState {
    fn from(locked: bool) -> Self {
        if locked {
            LockState::Locked
        } else {
            LockState::Unlocked
        }
    }
}

impl From<LockState> for u8 {
    fn from(value: LockState) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for LockState {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from_u8(value).ok_or(InvalidValue)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldId(u8);

impl FieldId {
    pub const MAX: FieldId = FieldId(u8::MAX);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }
}

impl From<u8> for FieldId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<FieldId> for u8 {
    fn from(value: FieldId) -> Self {
        value.into_u8()
    }
}

impl From<FieldId> for usize {
    fn from(value: FieldId) -> Self {
        u8::from(value).into()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GroupId(u8);

impl GroupId {
    pub const MAX: GroupId = GroupId(u8::MAX);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }
}

impl From<u8> for GroupId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<GroupId> for u8 {
    fn from(value: GroupId) -> Self {
        value.into_u8()
    }
}

impl From<GroupId> for usize {
    fn from(value: GroupId) -> Self {
        u8::from(value).into()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProcessId(u8);

impl ProcessId {
    /// ProcessId assigned to the first process after start-up
    pub const FIRST: ProcessId = ProcessId(0);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }

    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl Default for ProcessId {
    fn default() -> Self {
        Self::FIRST
    }
}

impl From<u8> for ProcessId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<ProcessId> for u8 {
    fn from(value: ProcessId) -> Self {
        value.into_u8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_codes() {
        for code in 0..=7u8 {
            let data_type = DataType::try_from_u8(code).unwrap();
            assert_eq!(data_type.into_u8(), code);
        }
        assert!(DataType::try_from_u8(8).is_none());
        assert!(DataType::try_from_u8(255).is_none());
    }

    #[test]
    fn test_data_type_widths() {
        assert_eq!(DataType::Float32.width(), 4);
        assert_eq!(DataType::Int32.width(), 4);
        assert_eq!(DataType::Int16.width(), 2);
        assert_eq!(DataType::Int8.width(), 1);
        assert_eq!(DataType::Uint32.width(), 4);
        assert_eq!(DataType::Uint16.width(), 2);
        assert_eq!(DataType::Uint8.width(), 1);
        assert_eq!(DataType::Boolean.width(), 1);
    }

    #[test]
    fn test_typed_value_round_trip() {
        let values = [
            TypedValue::Float32(-12.5),
            TypedValue::Int32(-70_000),
            TypedValue::Int16(-513),
            TypedValue::Int8(-3),
            TypedValue::Uint32(0xdead_beef),
            TypedValue::Uint16(0xa55a),
            TypedValue::Uint8(0x42),
            TypedValue::Boolean(true),
            TypedValue::Boolean(false),
        ];

        for value in values {
            let mut buffer = [0u8; TypedValue::MAX_WIDTH];
            let width = value.write_le(&mut buffer);
            assert_eq!(width, value.width());

            let decoded = TypedValue::read_le(value.data_type(), &buffer[..width]).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn test_typed_value_endianness() {
        let mut buffer = [0u8; 4];
        TypedValue::Uint32(0x0403_0201).write_le(&mut buffer);
        assert_eq!(buffer, [0x01, 0x02, 0x03, 0x04]);

        TypedValue::Uint16(0x0201).write_le(&mut buffer[..2]);
        assert_eq!(buffer[..2], [0x01, 0x02]);
    }

    #[test]
    fn test_typed_value_rejects_wrong_length() {
        assert!(TypedValue::read_le(DataType::Uint32, &[1, 2, 3]).is_err());
        assert!(TypedValue::read_le(DataType::Uint8, &[]).is_err());
        assert!(TypedValue::read_le(DataType::Int16, &[1, 2, 3]).is_err());
    }

    #[test]
    fn test_typed_value_rejects_bad_boolean() {
        assert!(TypedValue::read_le(DataType::Boolean, &[2]).is_err());
        assert_eq!(
            TypedValue::read_le(DataType::Boolean, &[1]).unwrap(),
            TypedValue::Boolean(true)
        );
    }

    #[test]
    fn test_parameter_set_status_codes() {
        for code in 0..=3u8 {
            let status = ParameterSetStatus::try_from_u8(code).unwrap();
            assert_eq!(status.into_u8(), code);
        }
        assert!(ParameterSetStatus::try_from_u8(4).is_none());
    }

    #[test]
    fn test_lock_state() {
        assert_eq!(LockState::try_from_u8(0), Some(LockState::Unlocked));
        assert_eq!(LockState::try_from_u8(1), Some(LockState::Locked));
        assert!(LockState::try_from_u8(2).is_none());
        assert!(LockState::from(true).is_locked());
        assert!(!LockState::from(false).is_locked());
    }

    #[test]
    fn test_process_id_wraps() {
        let id = ProcessId::new(u8::MAX);
        assert_eq!(id.next(), ProcessId::FIRST);
    }
}
