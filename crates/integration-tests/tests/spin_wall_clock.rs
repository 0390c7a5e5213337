//! Poll loop against the real clock and real sleeps
//!
//! Bounds are loose on the upper side; CI machines stall.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use settle_core::domain::{format_duration, PollConfig};
use settle_core::{spin, time_wait_return, PollingExecutor};

fn config(timeout_ms: u64, interval_ms: u64) -> PollConfig {
    PollConfig::new(
        Duration::from_millis(timeout_ms),
        Duration::from_millis(interval_ms),
    )
}

/// Never satisfied: gives up no earlier than the timeout and within one
/// interval (plus slack) after it
#[test]
fn test_timeout_bounds() {
    let started = Instant::now();
    let err = spin(|| Ok::<_, String>(0), |_| (false, "not ready"), &config(300, 50)).unwrap_err();
    let elapsed = started.elapsed();

    let timeout = err.timeout().expect("should time out");
    assert_eq!(timeout.reason, "not ready");
    assert_eq!(timeout.last_value, Some(0));
    assert!(elapsed >= Duration::from_millis(300), "gave up early: {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(300 + 50 + 500), "overran: {:?}", elapsed);
    assert!(timeout.attempts >= 2);

    println!("✅ timed out after {:?} and {} attempts", elapsed, timeout.attempts);
}

#[test]
fn test_success_on_third_call_with_zero_interval() {
    let calls = AtomicU32::new(0);
    let started = Instant::now();

    let value = spin(
        || Ok::<_, String>(calls.fetch_add(1, Ordering::SeqCst) + 1),
        |n| *n == 3,
        &config(5_000, 0),
    )
    .unwrap();

    assert_eq!(value, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_strict_error_returns_without_sleeping() {
    let started = Instant::now();
    let err = spin(
        || Err::<u8, _>(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused")),
        |_| true,
        &PollConfig::new(Duration::from_secs(30), Duration::from_secs(1)).with_ignore_errors(false),
    )
    .unwrap_err();

    let io_err = err.into_probe_error().expect("probe error, not a timeout");
    assert_eq!(io_err.kind(), std::io::ErrorKind::ConnectionRefused);
    assert!(started.elapsed() < Duration::from_millis(500));
}

/// A file written by another thread shows up before the deadline
#[test]
fn test_time_wait_return_sees_file_from_other_thread() {
    let dir = std::env::temp_dir().join(format!("settle-wall-clock-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let marker = dir.join("ready");
    let _ = std::fs::remove_file(&marker);

    let writer = {
        let marker = marker.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(150));
            std::fs::write(marker, "leader=broker-1").unwrap();
        })
    };

    let contents = time_wait_return(
        || Ok::<_, std::io::Error>(std::fs::read_to_string(&marker).ok()),
        &config(5_000, 25),
    )
    .unwrap();

    writer.join().unwrap();
    assert_eq!(contents.flatten().as_deref(), Some("leader=broker-1"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_time_wait_return_none_after_deadline() {
    let started = Instant::now();
    let value = time_wait_return(|| Ok::<Vec<u8>, String>(Vec::new()), &config(200, 50)).unwrap();

    assert!(value.is_none());
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_spin_async_does_not_block_runtime() {
    let executor = Arc::new(PollingExecutor::system(config(2_000, 20)));
    let flag = Arc::new(AtomicU32::new(0));

    let setter = {
        let flag = flag.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            flag.store(1, Ordering::SeqCst);
        })
    };

    let value = executor
        .spin_async(
            || {
                let flag = flag.clone();
                async move { Ok::<_, String>(flag.load(Ordering::SeqCst)) }
            },
            |v| (*v == 1, "flag not set"),
        )
        .await
        .unwrap();

    setter.await.unwrap();
    assert_eq!(value, 1);
}

#[test]
fn test_duration_formatting() {
    assert_eq!(format_duration(Duration::ZERO), "");
    assert_eq!(format_duration(Duration::from_secs_f64(5.5)), "5.5s");
    assert_eq!(format_duration(Duration::from_secs(65)), "1m5.0s");
    assert_eq!(format_duration(Duration::from_secs(90_065)), "1d1h1m5.0s");
}
