//! LiquidCan driver interface
//!
//! The crate provides an interface between a CAN device driver and the LiquidCan stack.
//! Limited scope facilitates compatibility across versions.
//! Driver crates should depend on this crate. LiquidCan stack users should depend on
//! the `liquidcan` crate instead.
//!
//! A driver exposes the bus through the [`transport::Transport`] trait: a non-blocking
//! `send` for outgoing payloads and a non-blocking `receive` pull for reassembled inbound
//! ones. The stack never blocks on the bus and never owns a clock; drivers and host code
//! decide when the engine runs by polling it.
//!
//! A LiquidCan payload is at most 64 bytes and uses exact lengths. Buses whose data length
//! codes quantize frame sizes must pad on transmission and strip the padding on reception
//! before handing payloads to the stack.

#![no_std]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod frame;
#[cfg(feature = "mock-transport")]
pub mod mock;
pub mod transport;

pub mod time {
    pub use embassy_time::{Duration, Instant};
}
