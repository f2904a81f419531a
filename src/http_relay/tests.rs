//! Integration tests for the HTTP relay.

use std::io::Write;
use std::net::{SocketAddr, TcpListener};
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};
use tempfile::NamedTempFile;

use crate::builder::RelayBuilder;
use crate::formatter::{FormatError, JsonPayloadFormatter, PayloadFormatter, SharedFormatter};
use crate::strategy::{DeliveryStrategy, RelayError};
use crate::test_utils::{CapturedRequest, refused_addr, spawn_endpoint};

use super::{HttpRelay, RETRY_INTERVAL, RetryState};

const LONG_RETRY: Duration = Duration::from_secs(3600);
const SHORT_RETRY: Duration = Duration::from_millis(50);
const RECV_TIMEOUT: Duration = Duration::from_secs(5);
const QUIET_PERIOD: Duration = Duration::from_millis(200);

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

#[fixture]
fn tcp_listener() -> TcpListener {
    TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener")
}

#[fixture]
fn credentials() -> NamedTempFile {
    write_credentials("reader-7:s3cr3t")
}

fn write_credentials(record: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create credential file");
    file.write_all(record.as_bytes()).expect("write credentials");
    file
}

fn build_relay(
    addr: SocketAddr,
    credentials: &Path,
    retry_interval: Duration,
    formatter: SharedFormatter,
) -> HttpRelay {
    RelayBuilder::new()
        .with_url(format!("http://{addr}/events"))
        .with_credentials_path(credentials)
        .with_connect_timeout_ms(2_000)
        .with_request_timeout_ms(2_000)
        .with_retry_interval(retry_interval)
        .build(formatter)
        .expect("build relay")
}

fn json_relay(addr: SocketAddr, credentials: &Path, retry_interval: Duration) -> HttpRelay {
    build_relay(
        addr,
        credentials,
        retry_interval,
        SharedFormatter::new(JsonPayloadFormatter),
    )
}

fn recv_body(rx: &mpsc::Receiver<CapturedRequest>) -> String {
    rx.recv_timeout(RECV_TIMEOUT).expect("request").body
}

#[rstest]
fn posts_payload_with_auth_headers(tcp_listener: TcpListener, credentials: NamedTempFile) {
    let (addr, rx) = spawn_endpoint(tcp_listener, vec![200]);
    let relay = json_relay(addr, credentials.path(), LONG_RETRY);
    relay.enqueue("P1".into()).expect("enqueue");

    let captured = rx.recv_timeout(RECV_TIMEOUT).expect("request");
    assert_eq!(captured.method, "POST");
    assert_eq!(captured.path, "/events");
    assert_eq!(captured.header("content-type"), Some("application/json"));
    assert_eq!(captured.header("fm-auth-id"), Some("reader-7"));
    assert_eq!(captured.header("fm-auth-code"), Some("s3cr3t"));
    assert_eq!(captured.body, "P1");

    assert!(relay.flush());
    assert_eq!(relay.pending_len(), 0);
    assert_eq!(relay.retry_state(), RetryState::Idle);
}

#[rstest]
fn unreachable_endpoint_keeps_payload_and_arms_retry(credentials: NamedTempFile) {
    let relay = json_relay(refused_addr(), credentials.path(), LONG_RETRY);
    relay.enqueue("P1".into()).expect("enqueue");

    assert!(relay.flush());
    assert_eq!(relay.pending(), vec!["P1".to_string()]);
    assert_eq!(relay.retry_state(), RetryState::Armed);
}

#[rstest]
#[case(503)]
#[case(500)]
#[case(401)]
fn error_status_counts_as_failure(
    tcp_listener: TcpListener,
    credentials: NamedTempFile,
    #[case] status: u16,
) {
    let (addr, rx) = spawn_endpoint(tcp_listener, vec![status]);
    let relay = json_relay(addr, credentials.path(), LONG_RETRY);
    relay.enqueue("P1".into()).expect("enqueue");

    assert_eq!(recv_body(&rx), "P1");
    assert!(relay.flush());
    assert_eq!(relay.pending(), vec!["P1".to_string()]);
    assert_eq!(relay.retry_state(), RetryState::Armed);
}

#[rstest]
fn retry_tick_resends_head_until_accepted(tcp_listener: TcpListener, credentials: NamedTempFile) {
    let (addr, rx) = spawn_endpoint(tcp_listener, vec![503, 503, 200]);
    let relay = json_relay(addr, credentials.path(), SHORT_RETRY);
    relay.enqueue("P1".into()).expect("enqueue");

    for _ in 0..3 {
        assert_eq!(recv_body(&rx), "P1");
    }
    assert!(wait_until(RECV_TIMEOUT, || relay.pending_len() == 0
        && relay.retry_state() == RetryState::Idle));
}

#[rstest]
fn delivers_in_arrival_order(tcp_listener: TcpListener, credentials: NamedTempFile) {
    let (addr, rx) = spawn_endpoint(tcp_listener, vec![200, 200, 200]);
    let relay = json_relay(addr, credentials.path(), LONG_RETRY);
    for payload in ["P1", "P2", "P3"] {
        relay.enqueue(payload.into()).expect("enqueue");
    }

    let bodies: Vec<String> = (0..3).map(|_| recv_body(&rx)).collect();
    assert_eq!(bodies, ["P1", "P2", "P3"]);
    assert!(relay.flush());
    assert_eq!(relay.pending_len(), 0);
}

#[rstest]
fn enqueue_while_armed_waits_for_retry(tcp_listener: TcpListener, credentials: NamedTempFile) {
    let (addr, rx) = spawn_endpoint(tcp_listener, vec![503, 200]);
    let relay = json_relay(addr, credentials.path(), LONG_RETRY);
    relay.enqueue("P1".into()).expect("enqueue");
    assert_eq!(recv_body(&rx), "P1");
    assert!(relay.flush());
    assert_eq!(relay.retry_state(), RetryState::Armed);

    relay.enqueue("P2".into()).expect("enqueue");
    assert!(relay.flush());
    assert!(rx.recv_timeout(QUIET_PERIOD).is_err());
    assert_eq!(relay.pending(), vec!["P1".to_string(), "P2".to_string()]);
    assert_eq!(relay.retry_state(), RetryState::Armed);
}

#[rstest]
fn burst_before_failure_sends_one_request(tcp_listener: TcpListener, credentials: NamedTempFile) {
    let (addr, rx) = spawn_endpoint(tcp_listener, vec![503, 200, 200, 200]);
    let relay = json_relay(addr, credentials.path(), LONG_RETRY);
    for payload in ["P1", "P2", "P3"] {
        relay.enqueue(payload.into()).expect("enqueue");
    }

    assert_eq!(recv_body(&rx), "P1");
    assert!(relay.flush());
    assert!(rx.recv_timeout(QUIET_PERIOD).is_err());
    assert_eq!(relay.pending(), ["P1", "P2", "P3"].map(String::from).to_vec());
    assert_eq!(relay.retry_state(), RetryState::Armed);
}

#[rstest]
fn builder_without_override_keeps_fixed_retry_period(
    tcp_listener: TcpListener,
    credentials: NamedTempFile,
) {
    let builder = RelayBuilder::new()
        .with_url(format!("http://{}/events", tcp_listener.local_addr().expect("addr")))
        .with_credentials_path(credentials.path());
    assert_eq!(
        builder.build_config().expect("valid").retry_interval(),
        RETRY_INTERVAL
    );

    let (_, rx) = spawn_endpoint(tcp_listener, vec![503, 200]);
    let relay = builder
        .build(SharedFormatter::new(JsonPayloadFormatter))
        .expect("build relay");
    relay.enqueue("P1".into()).expect("enqueue");

    assert_eq!(recv_body(&rx), "P1");
    assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());
    assert_eq!(relay.retry_state(), RetryState::Armed);
    assert_eq!(relay.pending_len(), 1);
}

#[rstest]
fn payloads_queued_while_armed_drain_after_recovery(
    tcp_listener: TcpListener,
    credentials: NamedTempFile,
) {
    let (addr, rx) = spawn_endpoint(tcp_listener, vec![503, 200, 200]);
    let relay = json_relay(addr, credentials.path(), SHORT_RETRY);
    relay.enqueue("P1".into()).expect("enqueue");
    assert_eq!(recv_body(&rx), "P1");
    relay.enqueue("P2".into()).expect("enqueue");

    assert_eq!(recv_body(&rx), "P1");
    assert_eq!(recv_body(&rx), "P2");
    assert!(wait_until(RECV_TIMEOUT, || relay.pending_len() == 0
        && relay.retry_state() == RetryState::Idle));
}

#[rstest]
#[case::missing(None)]
#[case::too_many_fields(Some("reader-7:s3cr3t:extra"))]
#[case::single_field(Some("reader-7"))]
fn credential_failure_leaves_state_untouched(
    tcp_listener: TcpListener,
    #[case] record: Option<&str>,
) {
    let (addr, rx) = spawn_endpoint(tcp_listener, vec![200]);
    let dir = tempfile::TempDir::new().expect("temp dir");
    let file = record.map(write_credentials);
    let path = file
        .as_ref()
        .map_or_else(|| dir.path().join("absent.txt"), |f| f.path().to_path_buf());
    let relay = json_relay(addr, &path, LONG_RETRY);
    relay.enqueue("P1".into()).expect("enqueue");

    assert!(relay.flush());
    assert!(rx.recv_timeout(QUIET_PERIOD).is_err());
    assert_eq!(relay.pending(), vec!["P1".to_string()]);
    assert_eq!(relay.retry_state(), RetryState::Idle);
}

#[rstest]
fn credentials_are_reloaded_for_every_attempt(tcp_listener: TcpListener) {
    let (addr, rx) = spawn_endpoint(tcp_listener, vec![200, 200]);
    let file = write_credentials("reader-7:first");
    let relay = json_relay(addr, file.path(), LONG_RETRY);

    relay.enqueue("P1".into()).expect("enqueue");
    let first = rx.recv_timeout(RECV_TIMEOUT).expect("first request");
    assert_eq!(first.header("fm-auth-code"), Some("first"));
    assert!(relay.flush());

    std::fs::write(file.path(), "reader-8:second").expect("rewrite credentials");
    relay.enqueue("P2".into()).expect("enqueue");
    let second = rx.recv_timeout(RECV_TIMEOUT).expect("second request");
    assert_eq!(second.header("fm-auth-id"), Some("reader-8"));
    assert_eq!(second.header("fm-auth-code"), Some("second"));
}

#[rstest]
fn event_entry_points_format_payloads(tcp_listener: TcpListener, credentials: NamedTempFile) {
    let (addr, rx) = spawn_endpoint(tcp_listener, vec![200, 200]);
    let relay = json_relay(addr, credentials.path(), LONG_RETRY);

    relay.handle_uid_event(&[0x04, 0xa2, 0x3f]).expect("uid event");
    relay.handle_error_event(b"antenna fault").expect("error event");

    assert_eq!(recv_body(&rx), r#"{"type":"uid","uid":"04a23f"}"#);
    assert_eq!(
        recv_body(&rx),
        r#"{"type":"error","message":"antenna fault"}"#
    );
}

struct RejectingFormatter;

impl PayloadFormatter for RejectingFormatter {
    fn payload(&self, _uid: &[u8]) -> Result<String, FormatError> {
        Err(FormatError::new("identifier too long"))
    }

    fn payload_for_error(&self, _error: &[u8]) -> Result<String, FormatError> {
        Err(FormatError::new("unsupported error code"))
    }
}

#[rstest]
fn formatter_errors_propagate_without_queueing(credentials: NamedTempFile) {
    let relay = build_relay(
        refused_addr(),
        credentials.path(),
        LONG_RETRY,
        SharedFormatter::new(RejectingFormatter),
    );

    let err = relay.handle_uid_event(b"x").expect_err("formatter error");
    assert!(matches!(err, RelayError::Format(_)));
    let err = relay.handle_error_event(b"x").expect_err("formatter error");
    assert!(matches!(err, RelayError::Format(_)));
    assert_eq!(relay.pending_len(), 0);
    assert_eq!(relay.retry_state(), RetryState::Idle);
}

#[rstest]
fn closed_relay_rejects_events(credentials: NamedTempFile) {
    let mut relay = json_relay(refused_addr(), credentials.path(), LONG_RETRY);
    relay.close();

    assert!(matches!(
        relay.enqueue("P1".into()),
        Err(RelayError::Closed)
    ));
    assert!(!relay.flush());
    assert_eq!(relay.pending_len(), 0);
}

#[rstest]
fn close_returns_while_retry_is_armed(credentials: NamedTempFile) {
    let mut relay = json_relay(refused_addr(), credentials.path(), SHORT_RETRY);
    relay.enqueue("P1".into()).expect("enqueue");
    assert!(relay.flush());
    assert_eq!(relay.retry_state(), RetryState::Armed);

    let started = Instant::now();
    relay.close();
    assert!(started.elapsed() < RECV_TIMEOUT);
    assert_eq!(relay.pending(), vec!["P1".to_string()]);
}

#[rstest]
fn relays_are_independent(credentials: NamedTempFile) {
    let failing = json_relay(refused_addr(), credentials.path(), LONG_RETRY);
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
    let (addr, rx) = spawn_endpoint(listener, vec![200]);
    let healthy = json_relay(addr, credentials.path(), LONG_RETRY);

    failing.enqueue("F1".into()).expect("enqueue");
    healthy.enqueue("H1".into()).expect("enqueue");

    assert_eq!(recv_body(&rx), "H1");
    assert!(failing.flush());
    assert!(healthy.flush());
    assert_eq!(failing.retry_state(), RetryState::Armed);
    assert_eq!(healthy.retry_state(), RetryState::Idle);
    assert_eq!(healthy.pending_len(), 0);
}
