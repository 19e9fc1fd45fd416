//! In-memory transport for host-side tests

use heapless::Deque;

use crate::frame::Payload;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Saturated;

/// Transport double backed by two bounded queues
///
/// The test drives the peer side directly: payloads pushed with [`MockTransport::push_inbound`]
/// are what the engine will `receive`, and everything the engine `send`s can be drained with
/// [`MockTransport::pop_outbound`].
#[derive(Default)]
pub struct MockTransport {
    inbound: Deque<Payload, { MockTransport::DEPTH }>,
    outbound: Deque<Payload, { MockTransport::DEPTH }>,
}

impl MockTransport {
    /// Queue depth per direction
    pub const DEPTH: usize = 32;

    pub const fn new() -> Self {
        Self {
            inbound: Deque::new(),
            outbound: Deque::new(),
        }
    }

    /// Queues a payload for the engine to receive.
    pub fn push_inbound(&mut self, payload: Payload) -> Result<(), Saturated> {
        self.inbound.push_back(payload).map_err(|_| Saturated)
    }

    /// Takes the oldest payload the engine has sent.
    pub fn pop_outbound(&mut self) -> Option<Payload> {
        self.outbound.pop_front()
    }

    pub fn outbound_len(&self) -> usize {
        self.outbound.len()
    }
}

impl Transport for MockTransport {
    type Error = Saturated;

    fn send(&mut self, payload: &Payload) -> Result<(), Self::Error> {
        self.outbound.push_back(*payload).map_err(|_| Saturated)
    }

    fn receive(&mut self) -> Option<Payload> {
        self.inbound.pop_front()
    }
}
