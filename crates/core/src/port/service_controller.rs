// Service Controller Port
// Install/uninstall a framework package and run its CLI subcommands

use async_trait::async_trait;
use thiserror::Error;

/// Service controller errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Command `{command}` exited with {exit_code:?}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Command timeout after {0}ms")]
    Timeout(i64),

    #[error("Invalid output: {0}")]
    InvalidOutput(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Service controller trait
///
/// Implementations:
/// - CliServiceController: shells out to the orchestrator CLI
/// - MockServiceController: scripted responses for tests
#[async_trait]
pub trait ServiceController: Send + Sync {
    /// Install a package, optionally with an options document
    async fn install(
        &self,
        package: &str,
        options: Option<&serde_json::Value>,
    ) -> Result<(), ServiceError>;

    /// Uninstall a package
    async fn uninstall(&self, package: &str) -> Result<(), ServiceError>;

    /// Run a CLI command and return its stdout
    ///
    /// # Errors
    /// - ServiceError::CommandFailed on a non-zero exit status
    async fn run_cli(&self, args: &[String]) -> Result<String, ServiceError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted controller
    ///
    /// `run_cli` pops responses in order; the last one repeats once the script
    /// is exhausted.
    #[derive(Default)]
    pub struct MockServiceController {
        responses: Mutex<VecDeque<Result<String, ServiceError>>>,
        last: Mutex<Option<Result<String, ServiceError>>>,
        calls: Mutex<Vec<Vec<String>>>,
        installs: Mutex<Vec<(String, Option<serde_json::Value>)>>,
        uninstalls: Mutex<Vec<String>>,
        fail_uninstall: bool,
    }

    impl MockServiceController {
        pub fn new(responses: Vec<Result<String, ServiceError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Default::default()
            }
        }

        pub fn always(output: impl Into<String>) -> Self {
            Self::new(vec![Ok(output.into())])
        }

        pub fn with_failing_uninstall(mut self) -> Self {
            self.fail_uninstall = true;
            self
        }

        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn installs(&self) -> Vec<(String, Option<serde_json::Value>)> {
            self.installs.lock().unwrap().clone()
        }

        pub fn uninstalls(&self) -> Vec<String> {
            self.uninstalls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ServiceController for MockServiceController {
        async fn install(
            &self,
            package: &str,
            options: Option<&serde_json::Value>,
        ) -> Result<(), ServiceError> {
            self.installs
                .lock()
                .unwrap()
                .push((package.to_string(), options.cloned()));
            Ok(())
        }

        async fn uninstall(&self, package: &str) -> Result<(), ServiceError> {
            self.uninstalls.lock().unwrap().push(package.to_string());
            if self.fail_uninstall {
                return Err(ServiceError::CommandFailed {
                    command: format!("package uninstall {}", package),
                    exit_code: Some(1),
                    stderr: "package not installed".to_string(),
                });
            }
            Ok(())
        }

        async fn run_cli(&self, args: &[String]) -> Result<String, ServiceError> {
            self.calls.lock().unwrap().push(args.to_vec());

            let next = self.responses.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            match next {
                Some(response) => {
                    *last = Some(response.clone());
                    response
                }
                None => last.clone().unwrap_or_else(|| {
                    Err(ServiceError::InvalidOutput("no scripted response".to_string()))
                }),
            }
        }
    }
}
