//! Transport access trait

use crate::frame::Payload;

/// Poll-style bus access consumed by the protocol engine
///
/// Both directions are non-blocking. `send` hands one payload to the driver and fails fast
/// when the driver cannot accept it; the engine treats a failed send as a lost frame and
/// leaves recovery to its request timeouts. `receive` pulls the next pending inbound payload,
/// so received frames sit in the driver until the engine is polled.
///
/// Implementations deliver whole reassembled payloads. Frame padding required by the
/// underlying data length codes must be stripped before a payload is surfaced here.
pub trait Transport {
    type Error;

    fn send(&mut self, payload: &Payload) -> Result<(), Self::Error>;
    fn receive(&mut self) -> Option<Payload>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn send(&mut self, payload: &Payload) -> Result<(), Self::Error> {
        T::send(self, payload)
    }

    fn receive(&mut self) -> Option<Payload> {
        T::receive(self)
    }
}
