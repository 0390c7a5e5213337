// Poll Domain Model

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::error::{DomainError, Result};

/// Default total deadline for a spin (15 minutes)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Default delay between unsuccessful attempts (1s)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default label used as a prefix for log lines
pub const DEFAULT_LABEL: &str = "spin";

/// Reason reported when the deadline passes before any attempt completed
pub const NO_ATTEMPT_REASON: &str = "timed out";

/// Poll loop state
///
/// `Running` is entered once per invocation. The three terminal states are
/// absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PollState {
    Running,
    Succeeded,
    TimedOut,
    Failed,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Running)
    }

    /// Move to `next`, rejecting any transition out of a terminal state
    pub fn transition(&mut self, next: PollState) -> Result<()> {
        if self.is_terminal() || next == PollState::Running {
            return Err(DomainError::InvalidStateTransition {
                from: self.to_string(),
                to: next.to_string(),
            });
        }
        *self = next;
        Ok(())
    }
}

impl std::fmt::Display for PollState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollState::Running => write!(f, "RUNNING"),
            PollState::Succeeded => write!(f, "SUCCEEDED"),
            PollState::TimedOut => write!(f, "TIMED_OUT"),
            PollState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Outcome of a success predicate: satisfied flag plus a human-readable reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub satisfied: bool,
    pub reason: String,
}

impl Verdict {
    pub fn satisfied() -> Self {
        Self {
            satisfied: true,
            reason: String::new(),
        }
    }

    pub fn pending(reason: impl Into<String>) -> Self {
        Self {
            satisfied: false,
            reason: reason.into(),
        }
    }
}

impl From<(bool, String)> for Verdict {
    fn from((satisfied, reason): (bool, String)) -> Self {
        Self { satisfied, reason }
    }
}

impl From<(bool, &str)> for Verdict {
    fn from((satisfied, reason): (bool, &str)) -> Self {
        Self {
            satisfied,
            reason: reason.to_string(),
        }
    }
}

impl From<bool> for Verdict {
    fn from(satisfied: bool) -> Self {
        if satisfied {
            Self::satisfied()
        } else {
            Self::pending("predicate not satisfied")
        }
    }
}

/// Absolute point in time (epoch millis) after which polling gives up
///
/// Computed once at loop entry and never moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    started_at: i64,
    expires_at: i64,
}

impl Deadline {
    /// Sub-millisecond remainders round up, so the deadline never lands early
    pub fn starting_at(now_millis: i64, timeout: Duration) -> Self {
        let timeout_ms = i64::try_from(timeout.as_nanos().div_ceil(1_000_000)).unwrap_or(i64::MAX);
        Self {
            started_at: now_millis,
            expires_at: now_millis.saturating_add(timeout_ms),
        }
    }

    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn is_expired(&self, now_millis: i64) -> bool {
        now_millis >= self.expires_at
    }

    pub fn elapsed(&self, now_millis: i64) -> Duration {
        millis_to_duration(now_millis - self.started_at)
    }

    pub fn remaining(&self, now_millis: i64) -> Duration {
        millis_to_duration(self.expires_at - now_millis)
    }
}

fn millis_to_duration(ms: i64) -> Duration {
    Duration::from_millis(ms.max(0) as u64)
}

/// Options recognized by the polling executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Total deadline for the loop
    pub timeout: Duration,
    /// Sleep between unsuccessful attempts
    pub poll_interval: Duration,
    /// Log probe errors and keep polling instead of aborting
    pub ignore_errors: bool,
    /// Prefix for log lines
    pub label: String,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            ignore_errors: true,
            label: DEFAULT_LABEL.to_string(),
        }
    }
}

impl PollConfig {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_ignore_errors(mut self, ignore_errors: bool) -> Self {
        self.ignore_errors = ignore_errors;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Build from fractional seconds, as read from flags or config files
    pub fn from_secs_f64(timeout_secs: f64, poll_interval_secs: f64) -> Result<Self> {
        if !timeout_secs.is_finite() || timeout_secs <= 0.0 {
            return Err(DomainError::InvalidPollConfig(format!(
                "timeout must be a positive number of seconds, got {}",
                timeout_secs
            )));
        }
        if !poll_interval_secs.is_finite() || poll_interval_secs < 0.0 {
            return Err(DomainError::InvalidPollConfig(format!(
                "poll interval must be zero or more seconds, got {}",
                poll_interval_secs
            )));
        }
        Ok(Self::new(
            Duration::from_secs_f64(timeout_secs),
            Duration::from_secs_f64(poll_interval_secs),
        ))
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(DomainError::InvalidPollConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if self.label.trim().is_empty() {
            return Err(DomainError::InvalidPollConfig(
                "label cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
