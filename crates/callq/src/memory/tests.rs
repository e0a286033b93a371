//! Unit tests for the in-process broker.

use std::time::Duration;

use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::envelope::wire::decode_response;

const REQUESTS: &str = "some-user-req";
const RESPONSES: &str = "some-user-resp";
const SHORT: Duration = Duration::from_millis(20);

#[fixture]
fn broker() -> MemoryBroker {
    let broker = MemoryBroker::new();
    broker.add_queue(REQUESTS);
    broker.add_queue(RESPONSES);
    broker
}

fn settings() -> BrokerSettings {
    BrokerSettings::new("localhost", 61613, REQUESTS, RESPONSES, SHORT).expect("valid settings")
}

fn connect(broker: &MemoryBroker) -> MemoryTransport {
    broker.connector().connect(&settings()).expect("memory broker connects")
}

#[rstest]
fn receive_times_out_on_empty_queue(broker: MemoryBroker) {
    let mut transport = connect(&broker);
    let next = transport.receive(SHORT).expect("receive succeeds");
    assert!(next.is_none());
}

#[rstest]
fn delivered_message_stays_counted_until_acknowledged(broker: MemoryBroker) {
    broker.send_text(REQUESTS, r#"{"method":"add","params":[1,2],"id":"X1"}"#);
    let mut transport = connect(&broker);

    let request = transport
        .receive(SHORT)
        .expect("receive succeeds")
        .expect("request available");
    assert_eq!(broker.queue_size(REQUESTS), 1);

    transport
        .respond(request, &Response::success("X1", json!(3)))
        .expect("respond succeeds");
    assert_eq!(broker.queue_size(REQUESTS), 0);
    assert_eq!(broker.queue_size(RESPONSES), 1);
}

#[rstest]
fn published_response_uses_wire_format(broker: MemoryBroker) {
    broker.send_text(REQUESTS, r#"{"method":"add","params":[1,2],"id":"X1"}"#);
    let mut transport = connect(&broker);
    let request = transport.receive(SHORT).expect("receive").expect("request");

    transport
        .respond(request, &Response::success("X1", json!(3)))
        .expect("respond succeeds");

    let contents = broker.message_contents(RESPONSES);
    assert_eq!(contents.len(), 1);
    let response = decode_response(&contents[0]).expect("valid response JSON");
    assert_eq!(response, Response::success("X1", json!(3)));
}

#[rstest]
fn missing_id_falls_back_to_message_id(broker: MemoryBroker) {
    let message_id = broker.send_text(REQUESTS, r#"{"method":"ping"}"#);
    let mut transport = connect(&broker);
    let request = transport.receive(SHORT).expect("receive").expect("request");
    assert_eq!(request.id(), message_id);
    assert_eq!(request.handle().as_str(), message_id);
}

#[rstest]
fn dropping_transport_redelivers_unacknowledged_messages(broker: MemoryBroker) {
    broker.send_text(REQUESTS, r#"{"method":"a","id":"1"}"#);
    broker.send_text(REQUESTS, r#"{"method":"b","id":"2"}"#);

    {
        let mut transport = connect(&broker);
        let first = transport.receive(SHORT).expect("receive").expect("request");
        assert_eq!(first.id(), "1");
    }

    assert_eq!(broker.queue_size(REQUESTS), 2);
    let mut transport = connect(&broker);
    let again = transport.receive(SHORT).expect("receive").expect("request");
    assert_eq!(again.id(), "1");
}

#[rstest]
fn malformed_message_is_left_unacknowledged(broker: MemoryBroker) {
    broker.send_text(REQUESTS, "not json");
    {
        let mut transport = connect(&broker);
        let error = transport.receive(SHORT).expect_err("malformed body");
        assert!(matches!(error, TransportError::Envelope(_)));
    }
    assert_eq!(broker.message_contents(REQUESTS), vec!["not json"]);
}

#[rstest]
fn unavailable_broker_refuses_connections(broker: MemoryBroker) {
    broker.set_unavailable(true);
    let error = broker
        .connector()
        .connect(&settings())
        .expect_err("broker is down");
    assert!(error.is_connect_failure());
    assert!(error.to_string().contains("localhost:61613"));
}

#[rstest]
fn injected_publish_failure_skips_acknowledgment(broker: MemoryBroker) {
    broker.send_text(REQUESTS, r#"{"method":"add","id":"X1"}"#);
    broker.fail_next_publish("queue full");
    let mut transport = connect(&broker);
    let request = transport.receive(SHORT).expect("receive").expect("request");

    let error = transport
        .respond(request, &Response::success("X1", json!(1)))
        .expect_err("publish fails");
    assert_eq!(error.to_string(), "broker reported an error: queue full");
    assert_eq!(broker.queue_size(RESPONSES), 0);
    assert_eq!(broker.queue_size(REQUESTS), 1);
}

#[rstest]
fn purge_discards_pending_messages(broker: MemoryBroker) {
    broker.send_text(REQUESTS, "one");
    broker.send_text(REQUESTS, "two");
    broker.purge(REQUESTS);
    assert_eq!(broker.queue_size(REQUESTS), 0);
}
