// Application Layer - Use Cases

pub mod expectation;
pub mod spin;
pub mod watch;

// Re-exports
pub use expectation::{JsonCheck, JsonExpectation};
pub use spin::{spin, time_wait_return, PollingExecutor};
pub use watch::ServiceWatcher;
