//! Application payload object

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidLength;

/// A single LiquidCan payload unit
///
/// Every protocol message fits one payload of at most [`Payload::MAX`] bytes. The container
/// stores exact byte lengths; mapping them onto the quantized lengths a CAN-FD data length
/// code can express (and stripping the padding again on reception) is the driver's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Payload {
    length: u8,
    bytes: [u8; Payload::MAX],
}

impl Payload {
    /// The largest payload a single frame can carry
    pub const MAX: usize = 64;

    /// Creates a new payload from a slice of compatible length.
    pub fn new(data: &[u8]) -> Result<Self, InvalidLength> {
        if data.len() > Self::MAX {
            return Err(InvalidLength);
        }
        let mut bytes = [0; Self::MAX];
        bytes[..data.len()].copy_from_slice(data);

        Ok(Self {
            length: data.len() as u8,
            bytes,
        })
    }

    pub const fn len(&self) -> usize {
        self.length as usize
    }

    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl core::ops::Deref for Payload {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes[..self.len()]
    }
}

impl core::ops::DerefMut for Payload {
    fn deref_mut(&mut self) -> &mut Self::Target {
        let length = self.len();
        &mut self.bytes[..length]
    }
}

impl<'a> TryFrom<&'a [u8]> for Payload {
    type Error = InvalidLength;

    fn try_from(data: &'a [u8]) -> Result<Self, Self::Error> {
        Self::new(data)
    }
}
