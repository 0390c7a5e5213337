//! Logging setup
//!
//! `SETTLE_LOG_FORMAT=json` switches to JSON lines; anything else is pretty.
//! `SETTLE_LOG_DIR` adds a file sink at `<dir>/settle.log`.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "settle=info,settle_core=info,settle_infra_system=info";
const LOG_FILE_NAME: &str = "settle.log";

/// Install the global subscriber
///
/// Keep the returned guard alive for the whole run, it flushes the file sink.
pub fn init(quiet: bool) -> Result<Option<WorkerGuard>> {
    let default_filter = if quiet { "warn" } else { DEFAULT_FILTER };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .context("Failed to create env filter")?;

    let json = std::env::var("SETTLE_LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let console = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().pretty().with_writer(std::io::stderr).boxed()
    };

    let (file_layer, guard) = match std::env::var("SETTLE_LOG_DIR") {
        Ok(dir) => {
            let dir = shellexpand::tilde(&dir).into_owned();
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {}", dir))?;
            let appender = tracing_appender::rolling::never(&dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer).boxed();
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
