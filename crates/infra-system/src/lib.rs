// Settle Infrastructure - System Adapters
// Implements: ServiceController, HttpClient, plus the subprocess runner they share

pub mod cli_service_controller;
pub mod reqwest_http_client;
pub mod subprocess_runner;

pub use cli_service_controller::{CliServiceController, DEFAULT_CLI_BINARY};
pub use reqwest_http_client::{ReqwestHttpClient, DEFAULT_REQUEST_TIMEOUT};
pub use subprocess_runner::{render_command, CommandOutput, SubprocessRunner};
