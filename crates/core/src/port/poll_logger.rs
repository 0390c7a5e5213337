// Poll Logger Port
// Progress lines go through an injected collaborator so tests can capture them

/// Sink for poll loop progress lines
pub trait PollLogger: Send + Sync {
    fn info(&self, msg: &str);

    /// Swallowed probe errors and other anomalies
    fn warn(&self, msg: &str);
}

/// Forwards to `tracing` (production)
pub struct TracingPollLogger;

impl PollLogger for TracingPollLogger {
    fn info(&self, msg: &str) {
        tracing::info!(target: "settle_core::spin", "{}", msg);
    }

    fn warn(&self, msg: &str) {
        tracing::warn!(target: "settle_core::spin", "{}", msg);
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum LogLevel {
        Info,
        Warn,
    }

    /// Captures every line instead of printing it
    #[derive(Default)]
    pub struct RecordingLogger {
        lines: Mutex<Vec<(LogLevel, String)>>,
    }

    impl RecordingLogger {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn lines(&self) -> Vec<(LogLevel, String)> {
            self.lines.lock().unwrap().clone()
        }

        pub fn infos(&self) -> Vec<String> {
            self.filtered(LogLevel::Info)
        }

        pub fn warnings(&self) -> Vec<String> {
            self.filtered(LogLevel::Warn)
        }

        pub fn contains(&self, needle: &str) -> bool {
            self.lines
                .lock()
                .unwrap()
                .iter()
                .any(|(_, line)| line.contains(needle))
        }

        fn filtered(&self, level: LogLevel) -> Vec<String> {
            self.lines
                .lock()
                .unwrap()
                .iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, line)| line.clone())
                .collect()
        }
    }

    impl PollLogger for RecordingLogger {
        fn info(&self, msg: &str) {
            self.lines
                .lock()
                .unwrap()
                .push((LogLevel::Info, msg.to_string()));
        }

        fn warn(&self, msg: &str) {
            self.lines
                .lock()
                .unwrap()
                .push((LogLevel::Warn, msg.to_string()));
        }
    }
}
