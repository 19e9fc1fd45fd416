//! LiquidCan node engine
//!
//! [`Node`] composes the wire model, the field registry, and the process table into the
//! facade application code talks to. The host registers its fields, initializes, then
//! alternates between issuing requests and calling [`Node::poll`] from its bus task.
//!
//! ## Examples
//!
//! ```
//! use liquidcan::core::{DataType, TypedValue};
//! use liquidcan::node::{Node, NodeConfig};
//! use liquidcan::time::Instant;
//! use liquidcan_driver::mock::MockTransport;
//!
//! let mut config = NodeConfig::default();
//! config.device_name = "pump-controller";
//!
//! // Up to 8 fields, up to 4 requests in flight.
//! let mut node: Node<_, 8, 4> = Node::new(config, MockTransport::new());
//! assert_eq!(node.config().device_name, "pump-controller");
//!
//! let flow = node.register_telemetry("flow_rate", DataType::Float32).unwrap();
//! let rpm = node.register_parameter("target_rpm", DataType::Uint16).unwrap();
//! node.initialize().unwrap();
//!
//! node.update_telemetry(flow, TypedValue::Float32(12.5)).unwrap();
//! let process = node.set_parameter(rpm, TypedValue::Uint16(1500), Instant::from_ticks(0)).unwrap();
//!
//! node.poll(Instant::from_ticks(0)).unwrap();
//! assert!(node.is_active(process));
//! ```

mod config;
mod engine;
mod events;

pub use config::NodeConfig;
pub use engine::{Node, NodeError};
pub use events::{NodeEvent, PeerInfo, MAX_PENDING_EVENT_COUNT};
