//! ServiceWatcher end to end: real subprocesses and a real HTTP socket
//!
//! A shell script stands in for the orchestrator CLI; a bare TCP listener
//! stands in for the service's HTTP API.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use settle_core::application::{JsonCheck, JsonExpectation, ServiceWatcher};
use settle_core::domain::PollConfig;
use settle_core::port::{ServiceController, SystemTimeProvider};
use settle_core::PollingExecutor;
use settle_infra_system::{CliServiceController, ReqwestHttpClient, SubprocessRunner};

/// Fake CLI: `endpoints` fails once, then reports one broker, then three.
/// Every invocation is appended to `calls`.
const FAKE_CLI: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
echo "$*" >> "$dir/calls"
case "$1 $2" in
  "package uninstall") echo "package not installed" >&2; exit 1 ;;
  "package install") exit 0 ;;
esac
n=$(cat "$dir/count" 2>/dev/null || echo 0)
n=$((n + 1))
echo "$n" > "$dir/count"
if [ "$n" -eq 1 ]; then
  echo "scheduler not ready" >&2
  exit 1
elif [ "$n" -eq 2 ]; then
  echo '{"native": ["b0:9092"]}'
else
  echo '{"native": ["b0:9092", "b1:9092", "b2:9092"]}'
fi
"#;

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("settle-e2e-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn install_fake_cli(dir: &Path) -> PathBuf {
    let path = dir.join("fake-cli");
    std::fs::write(&path, FAKE_CLI).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn watcher(binary: &Path, dir: &Path, config: PollConfig) -> ServiceWatcher {
    let runner = SubprocessRunner::new(Arc::new(SystemTimeProvider)).with_timeout(Duration::from_secs(10));
    let controller = CliServiceController::new(binary.display().to_string(), runner).with_scratch_dir(dir);
    ServiceWatcher::new(
        Arc::new(controller),
        Arc::new(ReqwestHttpClient::new(Duration::from_secs(5)).unwrap()),
        Arc::new(PollingExecutor::system(config)),
    )
}

#[tokio::test]
async fn test_wait_for_brokers_through_cli() {
    let dir = scratch("brokers");
    let cli = install_fake_cli(&dir);
    let w = watcher(
        &cli,
        &dir,
        PollConfig::new(Duration::from_secs(20), Duration::from_millis(20)).with_label("kafka"),
    );
    let expectation = JsonExpectation::new("/native", JsonCheck::Len(3)).unwrap();

    let doc = w
        .wait_for_service_json("kafka", &["endpoints", "broker"], &expectation)
        .await
        .unwrap();

    assert_eq!(doc["native"][2], "b2:9092");
    let count = std::fs::read_to_string(dir.join("count")).unwrap();
    assert_eq!(count.trim(), "3");

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_strict_mode_surfaces_cli_failure() {
    let dir = scratch("strict");
    let cli = install_fake_cli(&dir);
    let w = watcher(
        &cli,
        &dir,
        PollConfig::new(Duration::from_secs(20), Duration::from_millis(20)).with_ignore_errors(false),
    );

    let err = w
        .wait_for_service_json("kafka", &["endpoints", "broker"], &JsonExpectation::document_truthy())
        .await
        .unwrap_err();

    assert!(!err.is_timeout());
    assert!(err.to_string().contains("scheduler not ready"), "got: {}", err);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_reinstall_passes_options_file() {
    let dir = scratch("reinstall");
    let cli = install_fake_cli(&dir);
    let w = watcher(&cli, &dir, PollConfig::default());

    w.reinstall("hello-world", Some(&json!({"service": {"name": "hello"}})))
        .await
        .unwrap();

    let calls = std::fs::read_to_string(dir.join("calls")).unwrap();
    let lines: Vec<&str> = calls.lines().collect();
    assert_eq!(lines[0], "package uninstall hello-world --yes");
    assert!(lines[1].starts_with("package install hello-world --yes --options="));

    // Options file is removed once the command returns
    let leftovers: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with("-options.json"))
        .collect();
    assert!(leftovers.is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_uninstall_error_from_cli() {
    let dir = scratch("uninstall");
    let cli = install_fake_cli(&dir);
    let runner = SubprocessRunner::new(Arc::new(SystemTimeProvider));
    let controller = CliServiceController::new(cli.display().to_string(), runner);

    let err = controller.uninstall("hello-world").await.unwrap_err();
    assert!(err.to_string().contains("package not installed"));

    let _ = std::fs::remove_dir_all(&dir);
}

/// Serve 503 twice, then a plan that is still running, then a finished one
async fn spawn_plan_server() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;

            let (status, body) = match n {
                1 | 2 => ("503 Service Unavailable", String::from("starting")),
                3 => ("200 OK", json!({"status": "IN_PROGRESS"}).to_string()),
                _ => ("200 OK", json!({"status": "COMPLETE"}).to_string()),
            };
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}/v1/plan", addr), hits)
}

#[tokio::test]
async fn test_wait_for_http_plan_complete() {
    let (url, hits) = spawn_plan_server().await;
    let dir = scratch("http");
    let w = watcher(
        Path::new("true"),
        &dir,
        PollConfig::new(Duration::from_secs(20), Duration::from_millis(20)),
    );
    let expectation = JsonExpectation::new("/status", JsonCheck::Equals(json!("COMPLETE"))).unwrap();

    let response = w.wait_for_http(&url, 200, Some(&expectation)).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.json().unwrap()["status"], "COMPLETE");
    assert_eq!(hits.load(Ordering::SeqCst), 4);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_wait_for_http_connection_refused_times_out() {
    // Bind then drop to get a port nobody listens on
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let dir = scratch("refused");
    let w = watcher(
        Path::new("true"),
        &dir,
        PollConfig::new(Duration::from_millis(300), Duration::from_millis(50)),
    );

    let err = w
        .wait_for_http(&format!("http://{}/health", addr), 200, None)
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(err.reason().starts_with("exception: "), "got: {}", err.reason());

    let _ = std::fs::remove_dir_all(&dir);
}
