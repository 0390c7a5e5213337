// Subprocess runner
// reason: tokio for async process management with an optional per-command timeout
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use settle_core::port::{ServiceError, TimeProvider};

/// Captured result of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: i64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Spawns child processes and waits for their output
///
/// The poll loop has no per-call timeout of its own; `command_timeout` is the
/// guard against a probe command that never returns.
pub struct SubprocessRunner {
    time_provider: Arc<dyn TimeProvider>,
    command_timeout: Option<Duration>,
    env_allowlist: Option<Vec<String>>,
}

impl SubprocessRunner {
    /// Create a runner that inherits the parent environment
    ///
    /// # Example
    /// ```ignore
    /// let runner = SubprocessRunner::new(Arc::new(SystemTimeProvider))
    ///     .with_timeout(Duration::from_secs(30));
    /// ```
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            time_provider,
            command_timeout: None,
            env_allowlist: None,
        }
    }

    pub fn with_timeout(mut self, command_timeout: Duration) -> Self {
        self.command_timeout = Some(command_timeout);
        self
    }

    /// Only pass these variables to children
    pub fn with_env_allowlist(mut self, allowlist: Vec<String>) -> Self {
        self.env_allowlist = Some(allowlist);
        self
    }

    fn filtered_env(&self, allowlist: &[String]) -> HashMap<String, String> {
        std::env::vars()
            .filter(|(k, _)| allowlist.contains(k))
            .collect()
    }

    /// Spawn child process and wait for output
    async fn spawn_and_wait(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<std::process::Output, ServiceError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(allowlist) = &self.env_allowlist {
            command.env_clear().envs(self.filtered_env(allowlist));
        }

        let child = command
            .spawn()
            .map_err(|e| ServiceError::SpawnFailed(format!("{}: {}", program, e)))?;

        match self.command_timeout {
            Some(limit) => match timeout(limit, child.wait_with_output()).await {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(e)) => Err(ServiceError::IoError(e.to_string())),
                Err(_) => Err(ServiceError::Timeout(limit.as_millis() as i64)),
            },
            None => child
                .wait_with_output()
                .await
                .map_err(|e| ServiceError::IoError(e.to_string())),
        }
    }

    /// Run a program to completion; a non-zero exit is still `Ok`
    pub async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ServiceError> {
        let start_time = self.time_provider.now_millis();

        debug!(
            program = %program,
            args = ?args,
            timeout_ms = ?self.command_timeout.map(|t| t.as_millis()),
            "Starting subprocess"
        );

        let output = self.spawn_and_wait(program, args).await?;
        let duration_ms = self.time_provider.now_millis() - start_time;

        let result = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
        };

        info!(
            program = %program,
            duration_ms = %duration_ms,
            exit_code = ?result.exit_code,
            "Subprocess completed"
        );

        Ok(result)
    }

    /// Run a program and require exit status 0
    ///
    /// # Errors
    /// - ServiceError::CommandFailed with stderr on a non-zero exit
    pub async fn run_checked(&self, program: &str, args: &[String]) -> Result<String, ServiceError> {
        let output = self.run(program, args).await?;
        if !output.success() {
            return Err(ServiceError::CommandFailed {
                command: render_command(program, args),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

/// Space-joined command line for error messages
pub fn render_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
