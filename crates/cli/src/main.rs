//! Settle CLI - wait for a command, a service or an endpoint to converge
//!
//! Exit status is 0 once the success condition holds, non-zero on timeout or
//! on a probe error in `--strict` mode.

mod logging;
mod probes;
mod settings;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use std::time::Instant;
use tabled::{Table, Tabled};
use tracing::info;

use settle_core::application::{JsonCheck, JsonExpectation, PollingExecutor, ServiceWatcher};
use settle_core::domain::{display_duration, SpinError};
use settle_core::port::{SystemTimeProvider, TimeProvider};
use settle_infra_system::{CliServiceController, ReqwestHttpClient, SubprocessRunner};

use settings::Settings;

#[derive(Parser)]
#[command(name = "settle")]
#[command(about = "Poll until a distributed service reaches the expected state", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Total deadline in seconds
    #[arg(long, global = true)]
    timeout: Option<f64>,

    /// Delay between unsuccessful attempts in seconds
    #[arg(long, global = true)]
    interval: Option<f64>,

    /// Abort on the first probe error instead of retrying
    #[arg(long, global = true)]
    strict: bool,

    /// Config file (TOML)
    #[arg(long, global = true, env = "SETTLE_CONFIG")]
    config: Option<String>,

    /// Only print the final value
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Args, Debug, Default)]
struct ExpectArgs {
    /// JSON pointer to check (e.g. /native)
    #[arg(long)]
    pointer: Option<String>,

    /// Expected length of the array, object or string at the pointer
    #[arg(long, conflicts_with_all = ["equals", "exists"])]
    len: Option<usize>,

    /// Expected value at the pointer (JSON, or a bare string)
    #[arg(long, conflicts_with_all = ["len", "exists"])]
    equals: Option<String>,

    /// Only require the pointer to exist
    #[arg(long, conflicts_with_all = ["len", "equals"])]
    exists: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command until it exits 0
    Exec {
        #[arg(required = true, last = true)]
        command: Vec<String>,
    },

    /// Run a command until its stdout is JSON matching the expectation
    Json {
        #[command(flatten)]
        expect: ExpectArgs,

        #[arg(required = true, last = true)]
        command: Vec<String>,
    },

    /// GET a URL until the status (and optionally the JSON body) matches
    Http {
        url: String,

        /// Expected status code
        #[arg(long, default_value_t = 200)]
        status: u16,

        #[command(flatten)]
        expect: ExpectArgs,
    },

    /// Run `<cli> <package> <subcommand...>` until its JSON matches
    Service {
        /// Package name, e.g. kafka
        package: String,

        #[command(flatten)]
        expect: ExpectArgs,

        #[arg(required = true, last = true)]
        subcommand: Vec<String>,
    },
}

impl ExpectArgs {
    fn is_empty(&self) -> bool {
        self.pointer.is_none() && self.len.is_none() && self.equals.is_none() && !self.exists
    }

    fn to_expectation(&self) -> Result<JsonExpectation> {
        let check = if let Some(n) = self.len {
            JsonCheck::Len(n)
        } else if let Some(raw) = &self.equals {
            JsonCheck::Equals(parse_expected(raw))
        } else if self.exists {
            JsonCheck::Exists
        } else {
            JsonCheck::Truthy
        };
        let pointer = self.pointer.clone().unwrap_or_default();
        Ok(JsonExpectation::new(pointer, check)?)
    }
}

/// `--equals 3` is a number, `--equals RUNNING` a string
fn parse_expected(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

#[derive(Tabled)]
struct Summary {
    label: String,
    outcome: String,
    elapsed: String,
    timeout: String,
}

fn print_summary(label: &str, outcome: &str, started: Instant, timeout: std::time::Duration) {
    let summary = Summary {
        label: label.to_string(),
        outcome: outcome.to_string(),
        elapsed: display_duration(started.elapsed()),
        timeout: display_duration(timeout),
    };
    eprintln!("{}", Table::new(vec![summary]));
}

/// Print the value on success; turn failures into an error for the exit status
fn finish<V, E>(
    result: std::result::Result<V, SpinError<V, E>>,
    render: impl Fn(&V) -> String,
    executor: &PollingExecutor,
    started: Instant,
    quiet: bool,
) -> Result<()>
where
    V: std::fmt::Debug + Send + Sync + 'static,
    E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
{
    let config = executor.config();
    match result {
        Ok(value) => {
            println!("{}", render(&value));
            if !quiet {
                eprintln!("{}", "✓ Success state reached".green().bold());
                print_summary(&config.label, "SUCCEEDED", started, config.timeout);
            }
            Ok(())
        }
        Err(SpinError::TimedOut(timeout)) => {
            if !quiet {
                eprintln!("{} {}", "✗".red(), timeout.to_string().red());
                if let Some(last) = &timeout.last_value {
                    eprintln!("  {} {}", "Last value:".bold(), render(last));
                }
                print_summary(&config.label, "TIMED_OUT", started, config.timeout);
            }
            Err(SpinError::<V, E>::TimedOut(timeout).into())
        }
        Err(SpinError::Probe(e)) => {
            if !quiet {
                eprintln!("{} {}", "✗ Probe failed:".red(), e);
                print_summary(&config.label, "FAILED", started, config.timeout);
            }
            Err(SpinError::<V, E>::Probe(e).into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Guard must outlive every log call
    let _log_guard = logging::init(cli.quiet)?;

    let settings = Settings::load(cli.config.as_deref())?.override_with(
        cli.timeout,
        cli.interval,
        cli.strict,
    )?;
    info!(?settings, "Settle v{} starting", settle_core::VERSION);

    // DI wiring
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let mut runner = SubprocessRunner::new(time_provider.clone());
    if let Some(limit) = settings.command_timeout() {
        runner = runner.with_timeout(limit);
    }

    let started = Instant::now();

    match cli.command {
        Commands::Exec { command } => {
            let executor = PollingExecutor::system(settings.poll_config(&command[0])?);
            let result = probes::wait_for_exit_zero(&executor, &runner, &command).await;
            finish(result, |out| out.stdout.trim_end().to_string(), &executor, started, cli.quiet)
        }

        Commands::Json { expect, command } => {
            let executor = PollingExecutor::system(settings.poll_config(&command[0])?);
            let expectation = expect.to_expectation()?;
            let result = probes::wait_for_json(&executor, &runner, &command, &expectation).await;
            finish(result, render_json, &executor, started, cli.quiet)
        }

        Commands::Http {
            url,
            status,
            expect,
        } => {
            let executor = Arc::new(PollingExecutor::system(settings.poll_config(&url)?));
            let expectation = if expect.is_empty() {
                None
            } else {
                Some(expect.to_expectation()?)
            };
            let watcher = ServiceWatcher::new(
                Arc::new(CliServiceController::new(settings.cli_binary.clone(), runner)),
                Arc::new(ReqwestHttpClient::new(settings.http_timeout())?),
                executor.clone(),
            );
            let result = watcher
                .wait_for_http(&url, status, expectation.as_ref())
                .await;
            finish(result, |r| r.body.clone(), &executor, started, cli.quiet)
        }

        Commands::Service {
            package,
            expect,
            subcommand,
        } => {
            let executor = Arc::new(PollingExecutor::system(settings.poll_config(&package)?));
            let expectation = expect.to_expectation()?;
            let watcher = ServiceWatcher::new(
                Arc::new(CliServiceController::new(settings.cli_binary.clone(), runner)),
                Arc::new(ReqwestHttpClient::new(settings.http_timeout())?),
                executor.clone(),
            );
            let args: Vec<&str> = subcommand.iter().map(String::as_str).collect();
            let result = watcher
                .wait_for_service_json(&package, &args, &expectation)
                .await;
            finish(result, render_json, &executor, started, cli.quiet)
        }
    }
}

fn render_json(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
