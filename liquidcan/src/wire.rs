//! Byte cursors and (de)serialization contracts for wire payloads
//!
//! All fixed-width numerics are little-endian. Variable-length regions are written as a
//! single length byte followed by exactly that many bytes; decoding validates the declared
//! length against both the remaining payload and the region's capacity.

use liquidcan_core::InvalidValue;

/// Why an inbound payload could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// The leading kind byte does not name a known message kind.
    UnknownKind,
    /// A fixed field or a declared variable region runs past the payload end,
    /// or a declared length exceeds what the message kind allows.
    Truncated,
    /// An enum-coded byte holds a value outside its closed set.
    InvalidEnumValue,
}

impl From<InvalidValue> for DecodeError {
    fn from(_: InvalidValue) -> Self {
        DecodeError::InvalidEnumValue
    }
}

/// Forward-only writer over a scratch buffer
///
/// Writing past the end panics. Serializers stay within their declared
/// [`Serialize::size_bytes`], which payload capacities keep below the frame limit.
pub struct WriteCursor<'a> {
    bytes: &'a mut [u8],
    position: usize,
}

impl<'a> WriteCursor<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Number of bytes written so far
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes[self.position] = value;
        self.position += 1;
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let end = self.position + bytes.len();
        self.bytes[self.position..end].copy_from_slice(bytes);
        self.position = end;
    }
}

/// Forward-only reader over a received payload
pub struct ReadCursor<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ReadCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Number of unread bytes
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = *self.bytes.get(self.position).ok_or(DecodeError::Truncated)?;
        self.position += 1;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8], DecodeError> {
        if length > self.remaining() {
            return Err(DecodeError::Truncated);
        }
        let start = self.position;
        self.position += length;
        Ok(&self.bytes[start..self.position])
    }

    /// Reads a length-prefixed variable region of at most `max` bytes.
    pub fn read_variable(&mut self, max: usize) -> Result<&'a [u8], DecodeError> {
        let length = usize::from(self.read_u8()?);
        if length > max {
            return Err(DecodeError::Truncated);
        }
        self.read_bytes(length)
    }
}

pub trait Serialize {
    /// Exact number of bytes `serialize` writes
    fn size_bytes(&self) -> usize;
    fn serialize(&self, cursor: &mut WriteCursor<'_>);
}

pub trait Deserialize {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DecodeError>
    where
        Self: Sized;
}
