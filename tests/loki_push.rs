//! Push contract tests against a mock Loki endpoint: one POST per push,
//! 204-or-drop, caller survives every failure mode.

use camera_service_monitor::shipper::{EventBatch, LabelSet, Level, LogEntry, LokiClient};
use mockito::Matcher;

fn base_labels() -> LabelSet {
    LabelSet::new()
        .with("job", "pi_camera_monitor")
        .with("host", "pi1")
        .with("service", "mediamtx")
}

fn client_for(server: &mockito::Server) -> LokiClient {
    LokiClient::new(format!("{}/loki/api/v1/push", server.url()), base_labels()).expect("client")
}

#[test]
fn accepted_push_returns_ok_and_sends_one_post() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/loki/api/v1/push")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Regex(
            r#""stream":\{"host":"pi1","job":"pi_camera_monitor","level":"info","service":"mediamtx"\}"#
                .to_string(),
        ))
        .with_status(204)
        .expect(1)
        .create();

    let client = client_for(&server);
    let entries = [
        LogEntry::new(Level::Info, "segment opened"),
        LogEntry::new(Level::Info, "segment closed"),
    ];
    assert!(client.push(&entries).is_ok());
    mock.assert();
}

#[test]
fn values_carry_nanosecond_string_timestamps() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/loki/api/v1/push")
        .match_body(Matcher::Regex(
            r#""values":\[\["\d+","hello"\]\]"#.to_string(),
        ))
        .with_status(204)
        .expect(1)
        .create();

    let client = client_for(&server);
    assert!(client.push(&[LogEntry::new(Level::Info, "hello")]).is_ok());
    mock.assert();
}

#[test]
fn rejected_push_is_an_error_and_the_client_keeps_working() {
    let mut server = mockito::Server::new();
    let reject = server
        .mock("POST", "/loki/api/v1/push")
        .with_status(500)
        .expect(1)
        .create();

    let client = client_for(&server);
    let err = client
        .push(&[LogEntry::new(Level::Info, "dropped")])
        .expect_err("500 must surface as an error");
    assert_eq!(err.code(), "CSM-2101");
    reject.assert();

    // Same client instance recovers as soon as the backend does.
    let accept = server
        .mock("POST", "/loki/api/v1/push")
        .with_status(204)
        .expect(1)
        .create();
    assert!(client.push(&[LogEntry::new(Level::Info, "delivered")]).is_ok());
    accept.assert();
}

#[test]
fn unreachable_backend_is_a_transport_error_not_a_panic() {
    // Nothing listens on port 1.
    let client =
        LokiClient::new("http://127.0.0.1:1/loki/api/v1/push", base_labels()).expect("client");
    let err = client
        .push(&[LogEntry::new(Level::Error, "lost")])
        .expect_err("refused connection must surface as an error");
    assert_eq!(err.code(), "CSM-2102");
}

#[test]
fn batch_push_shares_one_timestamp_across_per_label_streams() {
    let mut server = mockito::Server::new();
    // Two streams, each tagged with its object label; timestamps are equal,
    // which the regex checks via a backreference-free repeat of the shape.
    let mock = server
        .mock("POST", "/loki/api/v1/push")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""object":"person""#.to_string()),
            Matcher::Regex(r#""object":"dog""#.to_string()),
            Matcher::Regex(r#"Detection: person \(conf: 0\.91\)"#.to_string()),
        ]))
        .with_status(204)
        .expect(1)
        .create();

    let client = client_for(&server);
    let batch = EventBatch::new(vec![
        ("person".to_string(), 0.91),
        ("dog".to_string(), 0.74),
    ]);
    assert!(client.push_batch(&batch).is_ok());
    mock.assert();
}

#[test]
fn distinct_label_sets_become_distinct_streams_in_one_post() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/loki/api/v1/push")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""level":"error""#.to_string()),
            Matcher::Regex(r#""level":"info""#.to_string()),
            Matcher::Regex(r#""action":"restart""#.to_string()),
        ]))
        .with_status(204)
        .expect(1)
        .create();

    let client = client_for(&server);
    let entries = [
        LogEntry::new(Level::Error, "restarting").with_label("action", "restart"),
        LogEntry::new(Level::Info, "steady"),
    ];
    assert!(client.push(&entries).is_ok());
    mock.assert();
}
