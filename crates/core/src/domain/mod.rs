// Domain Layer - Poll loop vocabulary

pub mod duration_format;
pub mod error;
pub mod outcome;
pub mod poll;
pub mod truthy;

// Re-exports
pub use duration_format::{display_duration, format_duration, format_seconds};
pub use error::DomainError;
pub use outcome::{PollTimeoutError, SpinError};
pub use poll::{
    Deadline, PollConfig, PollState, Verdict, DEFAULT_LABEL, DEFAULT_POLL_INTERVAL,
    DEFAULT_TIMEOUT, NO_ATTEMPT_REASON,
};
pub use truthy::Truthy;
