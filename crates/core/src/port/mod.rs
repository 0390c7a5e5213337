// Port Layer - Interfaces for external dependencies

pub mod http_client;
pub mod poll_logger;
pub mod service_controller;
pub mod time_provider; // For deterministic testing

// Re-exports
pub use http_client::{HttpClient, HttpError, HttpResponse};
pub use poll_logger::{PollLogger, TracingPollLogger};
pub use service_controller::{ServiceController, ServiceError};
pub use time_provider::{Sleeper, SystemSleeper, SystemTimeProvider, TimeProvider};
