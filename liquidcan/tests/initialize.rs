use liquidcan::core::{DataType, FieldId};
use liquidcan::message::{Message, NodeInfo};
use liquidcan::node::{Node, NodeConfig, NodeEvent};
use liquidcan::time::Instant;
use liquidcan_driver::mock::MockTransport;

type TestNode = Node<MockTransport, 8, 4>;

const FIRMWARE_HASH: u32 = 0x0BAD_F00D;
const PROTOCOL_HASH: u32 = 0xC0FF_EE00;

fn configured() -> TestNode {
    let mut config = NodeConfig::default();
    config.device_name = "pump-controller";
    config.firmware_hash = FIRMWARE_HASH;
    config.protocol_hash = PROTOCOL_HASH;
    Node::new(config, MockTransport::new())
}

#[test]
fn test_initialize_announces_node_then_fields() {
    let mut node = configured();
    node.register_telemetry("flow_rate", DataType::Float32)
        .unwrap();
    node.register_parameter("gain", DataType::Float32).unwrap();
    node.initialize().unwrap();

    let payload = node.transport_mut().pop_outbound().unwrap();
    match Message::decode(&payload).unwrap() {
        Message::NodeInfoAnnouncement(info) => {
            assert_eq!(info.telemetry_count, 1);
            assert_eq!(info.parameter_count, 1);
            assert_eq!(info.firmware_hash, FIRMWARE_HASH);
            assert_eq!(info.protocol_hash, PROTOCOL_HASH);
            assert_eq!(&info.device_name[..], b"pump-controller");
        }
        other => panic!("expected the announcement, got {:?}", other.kind()),
    }

    let payload = node.transport_mut().pop_outbound().unwrap();
    match Message::decode(&payload).unwrap() {
        Message::TelemetryValueRegistration(registration) => {
            assert_eq!(registration.field_id, FieldId::new(0));
            assert_eq!(registration.data_type, DataType::Float32);
            assert_eq!(&registration.field_name[..], b"flow_rate");
        }
        other => panic!("expected the telemetry registration, got {:?}", other.kind()),
    }

    let payload = node.transport_mut().pop_outbound().unwrap();
    match Message::decode(&payload).unwrap() {
        Message::ParameterRegistration(registration) => {
            assert_eq!(registration.field_id, FieldId::new(1));
            assert_eq!(registration.data_type, DataType::Float32);
            assert_eq!(&registration.field_name[..], b"gain");
        }
        other => panic!("expected the parameter registration, got {:?}", other.kind()),
    }

    assert!(node.transport_mut().pop_outbound().is_none());
    assert!(node.is_initialized());
}

#[test]
fn test_info_request_is_answered_with_an_announcement() {
    let mut node = configured();
    node.register_telemetry("flow_rate", DataType::Float32)
        .unwrap();
    node.initialize().unwrap();
    while node.transport_mut().pop_outbound().is_some() {}

    // A request doubles as the requester's own announcement.
    let peer = NodeInfo::new(2, 1, 0x1111_2222, PROTOCOL_HASH, "pump").unwrap();
    node.transport_mut()
        .push_inbound(Message::NodeInfoRequest(peer).encode())
        .unwrap();
    node.poll(Instant::from_ticks(0)).unwrap();

    match node.poll_event() {
        Some(NodeEvent::PeerInfo(info)) => {
            assert_eq!(info.device_name.as_str(), "pump");
            assert_eq!(info.telemetry_count, 2);
            assert_eq!(info.parameter_count, 1);
            assert_eq!(info.firmware_hash, 0x1111_2222);
            assert_eq!(info.protocol_hash, PROTOCOL_HASH);
        }
        other => panic!("expected peer info, got {:?}", other),
    }

    let payload = node.transport_mut().pop_outbound().unwrap();
    match Message::decode(&payload).unwrap() {
        Message::NodeInfoAnnouncement(info) => {
            assert_eq!(&info.device_name[..], b"pump-controller");
            assert_eq!(info.telemetry_count, 1);
        }
        other => panic!("expected our announcement, got {:?}", other.kind()),
    }
    assert!(node.transport_mut().pop_outbound().is_none());
}

#[test]
fn test_spontaneous_announcement_is_recorded_but_not_answered() {
    let mut node = configured();
    node.register_telemetry("flow_rate", DataType::Float32)
        .unwrap();
    node.initialize().unwrap();
    while node.transport_mut().pop_outbound().is_some() {}

    // A differing protocol hash is reported in the event, not rejected.
    let peer = NodeInfo::new(0, 0, 1, 0xDEAD_0000, "imposter").unwrap();
    node.transport_mut()
        .push_inbound(Message::NodeInfoAnnouncement(peer).encode())
        .unwrap();
    node.poll(Instant::from_ticks(0)).unwrap();

    match node.poll_event() {
        Some(NodeEvent::PeerInfo(info)) => {
            assert_eq!(info.protocol_hash, 0xDEAD_0000);
        }
        other => panic!("expected peer info, got {:?}", other),
    }
    assert!(node.transport_mut().pop_outbound().is_none());
}
