//! # LiquidCan
//!
//! This library implements the LiquidCan application protocol: telemetry, parameters,
//! and status exchanged between two embedded nodes over a point-to-point CAN-style
//! link. It targets no_std environments and allocates nothing; every table, queue, and
//! payload is bounded at compile time.
//!
//! The engine is poll-driven and never blocks: requests return a process handle
//! immediately and settle asynchronously, which suits interrupt-driven and cooperative
//! schedulers alike.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────┐  requests,     ┌────────────────┐
//! │ Host ├───────────────►│      Node      │
//! │ task │◄───────────────┤ ┌────────────┐ │
//! └──────┘  results,      │ │  Registry  │ │
//!           events        │ ├────────────┤ │
//!                         │ │ Processes  │ │
//!                         │ └────────────┘ │
//!                         └───┬────────▲───┘
//!                      send   │        │   receive
//!                         ┌───▼────────┴───┐
//!                         │   Transport    │
//!                         └────────────────┘
//! ```
//! Components:
//! * _Node_ is the facade. It owns the transport, issues requests, answers the peer's
//!   requests, and settles pending processes inside `poll`.
//! * _FieldRegistry_ is the field table both ends compile against: names, data types,
//!   parameter lock flags, and the last value seen per field.
//! * _ProcessTable_ tracks requests in flight and matches inbound responses to them by
//!   expected kind and field id; nothing travels on the wire for correlation.
//! * _Message_ is the closed wire catalogue. Every message fits one 64-byte payload,
//!   enforced by the capacity of each variable region.
//! * _Transport_ is the host-provided frame channel below the engine; it never blocks
//!   the engine and may drop frames, which request timeouts absorb.
//!
//! ## Concurrency model
//!
//! The whole engine is plain mutable state driven from one logical thread of control:
//! facade calls and `poll` must come from the same context. There is no internal
//! locking and no clock access; time enters exclusively through the `now` arguments, so
//! hosts control cadence and tests control time. A multi-threaded host wraps the whole
//! `Node` in one mutual-exclusion boundary; the structures are small enough that
//! coarse locking costs little.
//!
//! ## Limitations
//!
//! * Point-to-point only: no node addressing, one peer per link.
//! * Both ends must compile in the same field table; registration announcements verify
//!   agreement but do not populate the peer's table.
//! * One payload per message; segmentation below 64 bytes is the transport's concern.
#![no_std]

pub use liquidcan_core as core;
pub use liquidcan_driver::{frame, time, transport};

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod message;
pub mod node;
pub mod process;
pub mod registry;
pub mod wire;
