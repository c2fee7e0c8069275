//! End-to-end runs against the real file watcher and a mock Pushgateway
//!
//! Each test starts a run on a temporary result file, optionally rewrites the
//! file, and checks what reached the gateway.

use speedtest_pusher::{
    app::{RunLoop, RunOutcome},
    error::AppError,
    logging::Logger,
    models::RunOptions,
    pusher::PushGatewayClient,
    watcher::NotifySource,
};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VALID: &str = r#"{
    "server": {"id": "1234", "sponsor": "ACME", "name": "Springfield"},
    "client": {"ip": "1.2.3.4", "country": "US", "isp": "Example ISP"},
    "download": 123456789.0,
    "upload": 987654.0,
    "ping": 12.3,
    "timestamp": "2024-01-01T00:00:00Z"
}"#;

/// Give the watcher time to register before the file is touched
const SETTLE: Duration = Duration::from_millis(300);

fn options(file: &NamedTempFile, gateway: &MockServer, timeout_seconds: u64) -> RunOptions {
    let mut options = RunOptions::new(file.path().canonicalize().unwrap(), gateway.uri());
    options.timeout_seconds = timeout_seconds;
    options
}

fn start(options: RunOptions) -> tokio::task::JoinHandle<speedtest_pusher::Result<RunOutcome>> {
    let (logger, _logs) = Logger::buffered("TEST");
    let client = PushGatewayClient::new(logger.named("PUSH")).unwrap();
    tokio::spawn(RunLoop::new(options, NotifySource::new(), client, logger).run())
}

/// Write in place with a single call so no event sees a half-empty file
fn rewrite(path: &Path, contents: &str) {
    let mut file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.sync_all().unwrap();
}

async fn mount_gateway(status: u16, expected_calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/metrics/job/speedtest"))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected_calls)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_no_modification_times_out_without_push() {
    let gateway = mount_gateway(200, 0).await;
    let file = NamedTempFile::new().unwrap();

    let outcome = start(options(&file, &gateway, 1)).await.unwrap().unwrap();

    assert_eq!(outcome, RunOutcome::TimedOut);
}

#[tokio::test]
async fn test_valid_result_is_pushed_once() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/metrics/job/speedtest"))
        .and(body_string_contains("speedtest_download_bytes_per_sec"))
        .and(body_string_contains("speedtest_upload_bytes_per_sec"))
        .and(body_string_contains("speedtest_ping_msec"))
        .and(body_string_contains(r#"id="1234""#))
        .and(body_string_contains(r#"ip="1.2.3.4""#))
        .and(body_string_contains(r#"country="US""#))
        .and(body_string_contains(r#"sponsor="ACME""#))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let file = NamedTempFile::new().unwrap();
    let run = start(options(&file, &server, 10));

    tokio::time::sleep(SETTLE).await;
    rewrite(file.path(), VALID);

    let outcome = run.await.unwrap().unwrap();
    assert_eq!(outcome, RunOutcome::Pushed);

    // A later rewrite goes unnoticed: the subscription is gone
    rewrite(file.path(), VALID);
    tokio::time::sleep(SETTLE).await;
}

#[tokio::test]
async fn test_malformed_result_is_not_pushed() {
    let gateway = mount_gateway(200, 0).await;
    let file = NamedTempFile::new().unwrap();
    let run = start(options(&file, &gateway, 10));

    tokio::time::sleep(SETTLE).await;
    rewrite(
        file.path(),
        r#"{"server":{"id":"1234","sponsor":"ACME"},"client":{"ip":"1.2.3.4","country":"US"},"download":1.0,"upload":2.0}"#,
    );

    let error = run.await.unwrap().unwrap_err();
    assert!(matches!(error, AppError::MalformedResult(_)));
    assert!(error.to_string().contains("ping"));
}

#[tokio::test]
async fn test_gateway_failure_is_reported() {
    let gateway = mount_gateway(500, 1).await;
    let file = NamedTempFile::new().unwrap();
    let run = start(options(&file, &gateway, 10));

    tokio::time::sleep(SETTLE).await;
    rewrite(file.path(), VALID);

    let error = run.await.unwrap().unwrap_err();
    assert!(matches!(error, AppError::Delivery(_)));
    assert_eq!(error.exit_code(), 2);
}

#[tokio::test]
async fn test_unreachable_gateway_is_delivery_error() {
    // Bind and drop a listener to get a port nobody is serving
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let file = NamedTempFile::new().unwrap();
    let mut options = RunOptions::new(file.path().canonicalize().unwrap(), format!("127.0.0.1:{}", port));
    options.timeout_seconds = 10;
    let run = start(options);

    tokio::time::sleep(SETTLE).await;
    rewrite(file.path(), VALID);

    let error = run.await.unwrap().unwrap_err();
    assert!(matches!(error, AppError::Delivery(_)));
    assert_ne!(error.exit_code(), 0);
}

#[tokio::test]
async fn test_sibling_file_does_not_trigger() {
    let gateway = mount_gateway(200, 0).await;
    let dir = tempfile::TempDir::new().unwrap();
    let target = dir.path().join("result.json");
    let sibling = dir.path().join("other.json");
    std::fs::write(&target, "").unwrap();
    std::fs::write(&sibling, "").unwrap();

    let mut options = RunOptions::new(target.canonicalize().unwrap(), gateway.uri());
    options.timeout_seconds = 1;
    let run = start(options);

    tokio::time::sleep(SETTLE).await;
    rewrite(&sibling, VALID);

    let outcome = run.await.unwrap().unwrap();
    assert_eq!(outcome, RunOutcome::TimedOut);
}
