// CLI-backed ServiceController
// Shells out to the orchestrator CLI (`dcos` by default)
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

use settle_core::port::{ServiceController, ServiceError};

use crate::subprocess_runner::SubprocessRunner;

pub const DEFAULT_CLI_BINARY: &str = "dcos";

/// Distinguishes option files of concurrent installs within one process
static OPTIONS_SEQ: AtomicU64 = AtomicU64::new(0);

pub struct CliServiceController {
    binary: String,
    runner: SubprocessRunner,
    scratch_dir: PathBuf,
}

impl CliServiceController {
    /// # Arguments
    /// * `binary` - CLI executable, resolved through PATH
    /// * `runner` - Subprocess runner (carries the per-command timeout)
    pub fn new(binary: impl Into<String>, runner: SubprocessRunner) -> Self {
        Self {
            binary: binary.into(),
            runner,
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Directory for install option files
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn options_path(&self, package: &str) -> PathBuf {
        let seq = OPTIONS_SEQ.fetch_add(1, Ordering::Relaxed);
        self.scratch_dir.join(format!(
            "settle-{}-{}-{}-options.json",
            package,
            std::process::id(),
            seq
        ))
    }

    /// Write options where `package install --options=` can read them
    fn write_options(&self, package: &str, options: &serde_json::Value) -> Result<PathBuf, ServiceError> {
        let path = self.options_path(package);
        let body = serde_json::to_string_pretty(options)
            .map_err(|e| ServiceError::InvalidOutput(e.to_string()))?;
        std::fs::write(&path, body).map_err(|e| ServiceError::IoError(e.to_string()))?;
        Ok(path)
    }
}

#[async_trait]
impl ServiceController for CliServiceController {
    async fn install(
        &self,
        package: &str,
        options: Option<&serde_json::Value>,
    ) -> Result<(), ServiceError> {
        let mut args = vec![
            "package".to_string(),
            "install".to_string(),
            package.to_string(),
            "--yes".to_string(),
        ];

        let options_file = match options {
            Some(opts) => {
                let path = self.write_options(package, opts)?;
                args.push(format!("--options={}", path.display()));
                Some(path)
            }
            None => None,
        };

        let result = self.runner.run_checked(&self.binary, &args).await;

        if let Some(path) = options_file {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "Failed to remove options file");
            }
        }

        result?;
        info!(package = %package, "Install command accepted");
        Ok(())
    }

    async fn uninstall(&self, package: &str) -> Result<(), ServiceError> {
        let args = vec![
            "package".to_string(),
            "uninstall".to_string(),
            package.to_string(),
            "--yes".to_string(),
        ];
        self.runner.run_checked(&self.binary, &args).await?;
        info!(package = %package, "Uninstall command accepted");
        Ok(())
    }

    async fn run_cli(&self, args: &[String]) -> Result<String, ServiceError> {
        self.runner.run_checked(&self.binary, args).await
    }
}
