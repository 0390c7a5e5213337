//! Layered configuration
//!
//! Built-in defaults, then an optional TOML file, then `SETTLE_*` environment
//! variables. Command-line flags are applied on top by the caller.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use settle_core::domain::{PollConfig, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
use settle_infra_system::{DEFAULT_CLI_BINARY, DEFAULT_REQUEST_TIMEOUT};

const CONFIG_FILE_NAME: &str = "settle.toml";
const ENV_PREFIX: &str = "SETTLE";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub timeout_secs: f64,
    pub poll_interval_secs: f64,
    pub ignore_errors: bool,
    pub cli_binary: String,
    pub command_timeout_secs: Option<f64>,
    pub http_timeout_secs: f64,
}

impl Settings {
    /// Load with the usual lookup: explicit path, else the per-user config dir
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        let source = match explicit {
            Some(path) => Some((PathBuf::from(shellexpand::tilde(path).into_owned()), true)),
            None => default_config_path().map(|p| (p, false)),
        };
        Self::load_from(source, true)
    }

    /// # Arguments
    /// * `file` - Config file and whether it must exist
    /// * `with_env` - Read `SETTLE_*` overrides
    pub fn load_from(file: Option<(PathBuf, bool)>, with_env: bool) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("timeout_secs", DEFAULT_TIMEOUT.as_secs_f64())?
            .set_default("poll_interval_secs", DEFAULT_POLL_INTERVAL.as_secs_f64())?
            .set_default("ignore_errors", true)?
            .set_default("cli_binary", DEFAULT_CLI_BINARY)?
            .set_default("http_timeout_secs", DEFAULT_REQUEST_TIMEOUT.as_secs_f64())?;

        if let Some((path, required)) = file {
            builder = builder.add_source(File::from(path).required(required));
        }
        if with_env {
            builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));
        }

        let settings: Settings = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply command-line overrides
    pub fn override_with(
        mut self,
        timeout_secs: Option<f64>,
        poll_interval_secs: Option<f64>,
        strict: bool,
    ) -> Result<Self> {
        if let Some(t) = timeout_secs {
            self.timeout_secs = t;
        }
        if let Some(i) = poll_interval_secs {
            self.poll_interval_secs = i;
        }
        if strict {
            self.ignore_errors = false;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        self.poll_config("settle")?;
        for (name, value) in [
            ("command_timeout_secs", self.command_timeout_secs),
            ("http_timeout_secs", Some(self.http_timeout_secs)),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    anyhow::bail!("{} must be a positive number of seconds, got {}", name, v);
                }
            }
        }
        if self.cli_binary.trim().is_empty() {
            anyhow::bail!("cli_binary cannot be empty");
        }
        Ok(())
    }

    pub fn poll_config(&self, label: &str) -> Result<PollConfig> {
        let config = PollConfig::from_secs_f64(self.timeout_secs, self.poll_interval_secs)?
            .with_ignore_errors(self.ignore_errors)
            .with_label(label);
        config.validate()?;
        Ok(config)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs_f64)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.http_timeout_secs)
    }
}

fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "settle").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
