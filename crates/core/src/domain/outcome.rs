// Poll outcomes: timeout and propagated probe errors

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::domain::duration_format::display_duration;

/// Deadline exceeded before the success predicate held
///
/// Carries the last diagnostic reason and the last value the probe produced
/// (absent when every attempt failed or none ran).
#[derive(Error, Debug)]
#[error(
    "{label}: timed out after {} ({attempts} attempts): {reason}",
    human(.timeout)
)]
pub struct PollTimeoutError<V: fmt::Debug> {
    pub label: String,
    pub reason: String,
    pub last_value: Option<V>,
    pub attempts: u32,
    pub elapsed: Duration,
    pub timeout: Duration,
}

fn human(duration: &Duration) -> String {
    display_duration(*duration)
}

impl<V: fmt::Debug> PollTimeoutError<V> {
    pub fn into_last_value(self) -> Option<V> {
        self.last_value
    }
}

/// Terminal failure of a spin
///
/// `Probe` holds the probe's own error, untouched, when errors are not ignored.
#[derive(Error, Debug)]
pub enum SpinError<V: fmt::Debug, E: fmt::Display + fmt::Debug> {
    #[error("{0}")]
    TimedOut(PollTimeoutError<V>),

    #[error("{0}")]
    Probe(E),
}

impl<V: fmt::Debug, E: fmt::Display + fmt::Debug> SpinError<V, E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SpinError::TimedOut(_))
    }

    pub fn timeout(&self) -> Option<&PollTimeoutError<V>> {
        match self {
            SpinError::TimedOut(t) => Some(t),
            SpinError::Probe(_) => None,
        }
    }

    pub fn into_probe_error(self) -> Option<E> {
        match self {
            SpinError::Probe(e) => Some(e),
            SpinError::TimedOut(_) => None,
        }
    }

    /// Last diagnostic reason, or the probe error's message
    pub fn reason(&self) -> String {
        match self {
            SpinError::TimedOut(t) => t.reason.clone(),
            SpinError::Probe(e) => e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout_error() -> PollTimeoutError<u32> {
        PollTimeoutError {
            label: "brokers".to_string(),
            reason: "waiting for 3 brokers".to_string(),
            last_value: Some(2),
            attempts: 4,
            elapsed: Duration::from_secs(65),
            timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_timeout_display() {
        assert_eq!(
            timeout_error().to_string(),
            "brokers: timed out after 1m (4 attempts): waiting for 3 brokers"
        );
    }

    #[test]
    fn test_spin_error_accessors() {
        let err: SpinError<u32, String> = SpinError::TimedOut(timeout_error());
        assert!(err.is_timeout());
        assert_eq!(err.reason(), "waiting for 3 brokers");
        assert_eq!(err.timeout().and_then(|t| t.last_value), Some(2));
        assert!(err.into_probe_error().is_none());

        let err: SpinError<u32, String> = SpinError::Probe("connection refused".to_string());
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(err.into_probe_error().as_deref(), Some("connection refused"));
    }
}
