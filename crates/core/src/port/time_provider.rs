// Time Provider Port (for testability)

use async_trait::async_trait;
use std::time::Duration;

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64;
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Sleeper interface: the only suspension point of a poll loop
///
/// `sleep` blocks the calling thread; `sleep_async` yields to the runtime.
#[async_trait]
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);

    async fn sleep_async(&self, duration: Duration);
}

/// Real sleeper (production)
pub struct SystemSleeper;

#[async_trait]
impl Sleeper for SystemSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }

    async fn sleep_async(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Virtual clock: sleeping advances time instantly
    ///
    /// With `with_tick`, every `now_millis` call also advances the clock, which
    /// stands in for time spent inside probes.
    pub struct ManualClock {
        now: AtomicI64,
        tick_ms: i64,
        sleeps: Mutex<Vec<Duration>>,
        reads: AtomicUsize,
    }

    impl ManualClock {
        pub fn new(start_millis: i64) -> Self {
            Self {
                now: AtomicI64::new(start_millis),
                tick_ms: 0,
                sleeps: Mutex::new(Vec::new()),
                reads: AtomicUsize::new(0),
            }
        }

        pub fn with_tick(start_millis: i64, tick: Duration) -> Self {
            Self {
                tick_ms: tick.as_millis() as i64,
                ..Self::new(start_millis)
            }
        }

        pub fn advance(&self, duration: Duration) {
            self.now
                .fetch_add(duration.as_millis() as i64, Ordering::SeqCst);
        }

        pub fn current(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }

        /// Every sleep requested so far, in order
        pub fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }

        pub fn sleep_count(&self) -> usize {
            self.sleeps.lock().unwrap().len()
        }

        pub fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        fn record_sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
            self.advance(duration);
        }
    }

    impl TimeProvider for ManualClock {
        fn now_millis(&self) -> i64 {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.now.fetch_add(self.tick_ms, Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Sleeper for ManualClock {
        fn sleep(&self, duration: Duration) {
            self.record_sleep(duration);
        }

        async fn sleep_async(&self, duration: Duration) {
            self.record_sleep(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::ManualClock;
    use super::*;

    #[test]
    fn test_manual_clock_sleep_advances_time() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_millis(), 1_000);

        clock.sleep(Duration::from_millis(250));
        assert_eq!(clock.now_millis(), 1_250);
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(250)]);
    }

    #[test]
    fn test_manual_clock_tick_per_read() {
        let clock = ManualClock::with_tick(0, Duration::from_millis(10));
        assert_eq!(clock.now_millis(), 0);
        assert_eq!(clock.now_millis(), 10);
        assert_eq!(clock.current(), 20);
        assert_eq!(clock.reads(), 2);
    }

    #[tokio::test]
    async fn test_manual_clock_async_sleep() {
        let clock = ManualClock::new(0);
        clock.sleep_async(Duration::from_secs(2)).await;
        assert_eq!(clock.current(), 2_000);
        assert_eq!(clock.sleep_count(), 1);
    }

    #[test]
    fn test_system_time_provider_is_monotonic_enough() {
        let provider = SystemTimeProvider;
        let a = provider.now_millis();
        let b = provider.now_millis();
        assert!(b >= a);
    }
}
