// Settle Core - Poll loop, Domain & Ports
// NO process spawning, NO HTTP stack (hexagonal layout)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{spin, time_wait_return, PollingExecutor};
pub use domain::{PollConfig, PollTimeoutError, SpinError, Truthy, Verdict};
pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
