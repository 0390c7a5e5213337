// Service Watcher - waits on framework CLI output and HTTP endpoints
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::expectation::JsonExpectation;
use crate::application::spin::PollingExecutor;
use crate::domain::{SpinError, Verdict};
use crate::error::{AppError, Result};
use crate::port::{HttpClient, HttpResponse, ServiceController};

/// Waits for a deployed service to converge
///
/// Every wait goes through the shared `PollingExecutor`, so timeouts, poll
/// interval and error policy come from its config.
pub struct ServiceWatcher {
    controller: Arc<dyn ServiceController>,
    http: Arc<dyn HttpClient>,
    executor: Arc<PollingExecutor>,
}

impl ServiceWatcher {
    pub fn new(
        controller: Arc<dyn ServiceController>,
        http: Arc<dyn HttpClient>,
        executor: Arc<PollingExecutor>,
    ) -> Self {
        Self {
            controller,
            http,
            executor,
        }
    }

    pub fn executor(&self) -> &PollingExecutor {
        &self.executor
    }

    /// Run `<package> <subcommand...>` and parse stdout as JSON
    ///
    /// # Example
    /// ```text
    /// let endpoints = watcher.service_cli("kafka", &["endpoints", "broker"]).await?;
    /// ```
    pub async fn service_cli(&self, package: &str, subcommand: &[&str]) -> Result<Value> {
        let mut args = Vec::with_capacity(subcommand.len() + 1);
        args.push(package.to_string());
        args.extend(subcommand.iter().map(|s| s.to_string()));

        let stdout = self.controller.run_cli(&args).await?;
        debug!(package = %package, bytes = stdout.len(), "Service CLI returned");
        Ok(serde_json::from_str(stdout.trim())?)
    }

    /// Poll `service_cli` until its JSON satisfies `expectation`
    pub async fn wait_for_service_json(
        &self,
        package: &str,
        subcommand: &[&str],
        expectation: &JsonExpectation,
    ) -> std::result::Result<Value, SpinError<Value, AppError>> {
        info!(
            package = %package,
            subcommand = ?subcommand,
            pointer = %expectation.pointer,
            "Waiting for service output"
        );
        self.executor
            .spin_async(
                || self.service_cli(package, subcommand),
                |doc| expectation.evaluate(doc),
            )
            .await
    }

    /// Poll `url` until it answers `expected_status` and, when given, the body
    /// satisfies `expectation`
    pub async fn wait_for_http(
        &self,
        url: &str,
        expected_status: u16,
        expectation: Option<&JsonExpectation>,
    ) -> std::result::Result<HttpResponse, SpinError<HttpResponse, AppError>> {
        info!(url = %url, expected_status, "Waiting for HTTP endpoint");
        self.executor
            .spin_async(
                || async { self.http.get(url).await.map_err(AppError::from) },
                |response| http_verdict(response, expected_status, expectation),
            )
            .await
    }

    /// Uninstall (ignoring failures, the package may be absent) then install
    pub async fn reinstall(&self, package: &str, options: Option<&Value>) -> Result<()> {
        if let Err(e) = self.controller.uninstall(package).await {
            warn!(package = %package, error = %e, "Uninstall before install failed, continuing");
        }
        self.controller.install(package, options).await?;
        info!(package = %package, "Package installed");
        Ok(())
    }
}

fn http_verdict(
    response: &HttpResponse,
    expected_status: u16,
    expectation: Option<&JsonExpectation>,
) -> Verdict {
    if response.status != expected_status {
        return Verdict::pending(
            AppError::UnexpectedStatus {
                expected: expected_status,
                actual: response.status,
            }
            .to_string(),
        );
    }
    match expectation {
        None => Verdict::satisfied(),
        Some(exp) => match response.json() {
            Ok(doc) => exp.evaluate(&doc),
            Err(e) => Verdict::pending(e.to_string()),
        },
    }
}
