use liquidcan::core::{DataType, FieldId, GroupId, TypedValue};
use liquidcan::message::{GroupDefinition, GroupUpdate, Message};
use liquidcan::node::{Node, NodeConfig, NodeError, NodeEvent};
use liquidcan::registry::RegistryError;
use liquidcan::time::Instant;
use liquidcan_driver::mock::MockTransport;

type TestNode = Node<MockTransport, 8, 4>;

const FLOW_RATE: FieldId = FieldId::new(0);
const TANK_LEVEL: FieldId = FieldId::new(1);
const GAIN: FieldId = FieldId::new(2);

fn node(name: &'static str) -> TestNode {
    let mut config = NodeConfig::default();
    config.device_name = name;
    let mut node = Node::new(config, MockTransport::new());
    node.register_telemetry("flow_rate", DataType::Float32)
        .unwrap();
    node.register_telemetry("tank_level", DataType::Uint16)
        .unwrap();
    node.register_parameter("gain", DataType::Float32).unwrap();
    node.initialize().unwrap();
    while node.transport_mut().pop_outbound().is_some() {}
    node
}

fn deliver(from: &mut TestNode, to: &mut TestNode, now: Instant) {
    while let Some(payload) = from.transport_mut().pop_outbound() {
        to.transport_mut().push_inbound(payload).unwrap();
    }
    to.poll(now).unwrap();
}

fn sample_values() -> [u8; 6] {
    let mut values = [0u8; 6];
    values[..4].copy_from_slice(&12.5f32.to_le_bytes());
    values[4..].copy_from_slice(&870u16.to_le_bytes());
    values
}

#[test]
fn test_group_update_reaches_the_peers_cache() {
    let mut sensor = node("sensor");
    let mut display = node("display");
    let t0 = Instant::from_ticks(0);

    let group = sensor
        .define_telemetry_group(&[FLOW_RATE, TANK_LEVEL])
        .unwrap();
    deliver(&mut sensor, &mut display, t0);
    match display.poll_event() {
        Some(NodeEvent::PeerGroupDefined {
            group_id,
            member_ids,
        }) => {
            assert_eq!(group_id, group);
            assert_eq!(&member_ids[..], [FLOW_RATE, TANK_LEVEL]);
        }
        other => panic!("expected the group definition, got {:?}", other),
    }

    sensor
        .update_telemetry(FLOW_RATE, TypedValue::Float32(12.5))
        .unwrap();
    sensor
        .update_telemetry(TANK_LEVEL, TypedValue::Uint16(870))
        .unwrap();
    sensor.publish_group_update(group).unwrap();
    deliver(&mut sensor, &mut display, t0);

    // Values are split per member into the cache, and the raw update is kept.
    assert_eq!(
        display.registry().value(FLOW_RATE),
        Some(TypedValue::Float32(12.5))
    );
    assert_eq!(
        display.registry().value(TANK_LEVEL),
        Some(TypedValue::Uint16(870))
    );
    match display.poll_event() {
        Some(NodeEvent::GroupUpdateReceived { group_id, values }) => {
            assert_eq!(group_id, group);
            assert_eq!(&values[..], sample_values());
        }
        other => panic!("expected the raw update, got {:?}", other),
    }
}

#[test]
fn test_group_update_requires_every_member_value() {
    let mut sensor = node("sensor");
    let group = sensor
        .define_telemetry_group(&[FLOW_RATE, TANK_LEVEL])
        .unwrap();
    sensor
        .update_telemetry(FLOW_RATE, TypedValue::Float32(1.0))
        .unwrap();

    assert_eq!(
        sensor.publish_group_update(group),
        Err(NodeError::ValueUnset)
    );

    sensor
        .update_telemetry(TANK_LEVEL, TypedValue::Uint16(1))
        .unwrap();
    sensor.publish_group_update(group).unwrap();
}

#[test]
fn test_group_members_must_be_registered_telemetry() {
    let mut sensor = node("sensor");
    assert_eq!(
        sensor.define_telemetry_group(&[FLOW_RATE, GAIN]),
        Err(NodeError::Registry(RegistryError::NotTelemetry))
    );
    assert_eq!(
        sensor.define_telemetry_group(&[FieldId::new(9)]),
        Err(NodeError::Registry(RegistryError::UnknownId))
    );
    // Nothing was defined or sent.
    assert!(sensor.registry().groups().is_empty());
    assert_eq!(sensor.transport().outbound_len(), 0);
}

#[test]
fn test_update_without_a_definition_stays_raw() {
    let mut display = node("display");
    let t0 = Instant::from_ticks(0);

    let update = GroupUpdate::new(GroupId::new(5), &sample_values()).unwrap();
    display
        .transport_mut()
        .push_inbound(Message::TelemetryGroupUpdate(update).encode())
        .unwrap();
    display.poll(t0).unwrap();

    // Without a layout the bytes cannot be split, but the host still sees them.
    assert_eq!(display.registry().value(FLOW_RATE), None);
    match display.poll_event() {
        Some(NodeEvent::GroupUpdateReceived { group_id, values }) => {
            assert_eq!(group_id, GroupId::new(5));
            assert_eq!(&values[..], sample_values());
        }
        other => panic!("expected the raw update, got {:?}", other),
    }
}

#[test]
fn test_redefinition_replaces_the_stored_layout() {
    let mut display = node("display");
    let t0 = Instant::from_ticks(0);
    let group = GroupId::new(0);

    for members in [&[FLOW_RATE, TANK_LEVEL][..], &[TANK_LEVEL][..]] {
        let definition = GroupDefinition::new(group, members).unwrap();
        display
            .transport_mut()
            .push_inbound(Message::TelemetryGroupDefinition(definition).encode())
            .unwrap();
    }
    display.poll(t0).unwrap();

    // An update shaped for the second layout lands on the right member.
    let update = GroupUpdate::new(group, &870u16.to_le_bytes()).unwrap();
    display
        .transport_mut()
        .push_inbound(Message::TelemetryGroupUpdate(update).encode())
        .unwrap();
    display.poll(t0).unwrap();

    assert_eq!(
        display.registry().value(TANK_LEVEL),
        Some(TypedValue::Uint16(870))
    );
    assert_eq!(display.registry().value(FLOW_RATE), None);
}
