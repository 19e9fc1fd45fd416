use embassy_time::{Duration, Instant, MockDriver};
use liquidcan::core::{DataType, FieldId, ParameterSetStatus, StatusLevel, TypedValue};
use liquidcan::message::{Message, ParameterSetConfirmation};
use liquidcan::node::{Node, NodeConfig, NodeEvent};
use liquidcan::process::ProcessFailure;
use liquidcan_driver::mock::MockTransport;

type TestNode = Node<MockTransport, 8, 4>;

const GAIN: FieldId = FieldId::new(0);
const RESPONSE_TIMEOUT: Duration = Duration::from_millis(250);

fn node(name: &'static str) -> TestNode {
    let mut config = NodeConfig::default();
    config.device_name = name;
    let mut node = Node::new(config, MockTransport::new());
    node.register_parameter("gain", DataType::Float32).unwrap();
    node.initialize().unwrap();
    while node.transport_mut().pop_outbound().is_some() {}
    node
}

fn confirmation(value: f32) -> Message {
    let confirmation =
        ParameterSetConfirmation::new(GAIN, ParameterSetStatus::Success, &value.to_le_bytes())
            .unwrap();
    Message::ParameterSetConfirmation(confirmation)
}

#[test]
fn test_lost_response_settles_by_timeout() {
    let mut controller = node("controller");
    let t0 = Instant::from_ticks(0);

    let process = controller
        .set_parameter(GAIN, TypedValue::Float32(1.0), t0)
        .unwrap();
    // The request vanishes on the wire.
    controller.transport_mut().pop_outbound().unwrap();

    controller
        .poll(t0 + RESPONSE_TIMEOUT - Duration::from_millis(1))
        .unwrap();
    assert!(controller.is_active(process));

    controller.poll(t0 + RESPONSE_TIMEOUT).unwrap();
    assert!(controller.is_failed(process));
    assert_eq!(
        controller.take_failure(process),
        Some(ProcessFailure::TimedOut)
    );
    // The write never took effect locally.
    assert_eq!(controller.registry().value(GAIN), None);
}

#[test]
fn test_refused_send_leaves_the_process_live() {
    let mut controller = node("controller");
    let t0 = Instant::from_ticks(0);

    // Saturate the outbound queue so the next request frame is refused.
    while controller.send_status(StatusLevel::Info, "filler").is_ok() {}

    let process = controller
        .set_parameter(GAIN, TypedValue::Float32(1.0), t0)
        .unwrap();
    // A refused send is indistinguishable from a frame lost on the wire;
    // the process stays live and settles by timeout like any other.
    assert!(controller.is_active(process));

    controller.poll(t0 + RESPONSE_TIMEOUT).unwrap();
    assert_eq!(
        controller.take_failure(process),
        Some(ProcessFailure::TimedOut)
    );
}

#[test]
fn test_cancelled_process_ignores_the_late_response() {
    let mut controller = node("controller");
    let t0 = Instant::from_ticks(0);

    let process = controller
        .set_parameter(GAIN, TypedValue::Float32(2.0), t0)
        .unwrap();
    controller.transport_mut().pop_outbound().unwrap();

    controller.cancel(process, t0).unwrap();
    assert!(controller.is_failed(process));
    assert_eq!(
        controller.take_failure(process),
        Some(ProcessFailure::Cancelled)
    );

    // The response still arrives; with no process waiting it takes the
    // unsolicited route and only refreshes the cache.
    controller
        .transport_mut()
        .push_inbound(confirmation(2.0).encode())
        .unwrap();
    controller.poll(t0).unwrap();
    assert_eq!(
        controller.registry().value(GAIN),
        Some(TypedValue::Float32(2.0))
    );
    assert_eq!(
        controller.poll_event(),
        Some(NodeEvent::ParameterSetRemotely {
            parameter_id: GAIN,
            value: TypedValue::Float32(2.0),
        })
    );
}

#[test]
fn test_unharvested_results_are_reclaimed() {
    let mut controller = node("controller");
    let t0 = Instant::from_ticks(0);

    let process = controller
        .set_parameter(GAIN, TypedValue::Float32(1.5), t0)
        .unwrap();
    controller.transport_mut().pop_outbound().unwrap();
    controller
        .transport_mut()
        .push_inbound(confirmation(1.5).encode())
        .unwrap();
    controller.poll(t0).unwrap();
    assert!(controller.is_ready(process));

    // The host never harvests; the slot frees itself after the reclaim window.
    controller.poll(t0 + Duration::from_secs(5)).unwrap();
    assert_eq!(controller.process_status(process), None);

    // The correlation key is free again.
    let now = t0 + Duration::from_secs(5);
    controller
        .set_parameter(GAIN, TypedValue::Float32(2.5), now)
        .unwrap();
}

#[test]
fn test_timeouts_follow_the_mock_clock() {
    let time = MockDriver::get();
    let mut controller = node("controller");

    let process = controller
        .set_parameter(GAIN, TypedValue::Float32(1.0), Instant::now())
        .unwrap();
    controller.transport_mut().pop_outbound().unwrap();

    time.advance(RESPONSE_TIMEOUT / 2);
    controller.poll(Instant::now()).unwrap();
    assert!(controller.is_active(process));

    time.advance(RESPONSE_TIMEOUT);
    controller.poll(Instant::now()).unwrap();
    assert!(controller.is_failed(process));
}
