//! Command probes for `settle exec` and `settle json`

use serde_json::Value;

use settle_core::application::{JsonExpectation, PollingExecutor};
use settle_core::domain::{SpinError, Verdict};
use settle_core::port::ServiceError;
use settle_core::AppError;
use settle_infra_system::{CommandOutput, SubprocessRunner};

fn split(command: &[String]) -> (&str, &[String]) {
    match command.split_first() {
        Some((program, args)) => (program.as_str(), args),
        None => ("", &[]),
    }
}

/// Waiting reason for a command that did not exit 0
pub fn exit_verdict(output: &CommandOutput) -> Verdict {
    if output.success() {
        return Verdict::satisfied();
    }
    let status = match output.exit_code {
        Some(code) => format!("exit status {}", code),
        None => "killed by signal".to_string(),
    };
    let stderr = output.stderr.trim();
    if stderr.is_empty() {
        Verdict::pending(status)
    } else {
        Verdict::pending(format!("{}: {}", status, stderr))
    }
}

/// Rerun `command` until it exits 0
pub async fn wait_for_exit_zero(
    executor: &PollingExecutor,
    runner: &SubprocessRunner,
    command: &[String],
) -> Result<CommandOutput, SpinError<CommandOutput, ServiceError>> {
    let (program, args) = split(command);
    executor
        .spin_async(|| runner.run(program, args), exit_verdict)
        .await
}

async fn run_json(runner: &SubprocessRunner, program: &str, args: &[String]) -> Result<Value, AppError> {
    let stdout = runner.run_checked(program, args).await?;
    Ok(serde_json::from_str(stdout.trim())?)
}

/// Rerun `command` until its stdout parses as JSON satisfying `expectation`
pub async fn wait_for_json(
    executor: &PollingExecutor,
    runner: &SubprocessRunner,
    command: &[String],
    expectation: &JsonExpectation,
) -> Result<Value, SpinError<Value, AppError>> {
    let (program, args) = split(command);
    executor
        .spin_async(
            || run_json(runner, program, args),
            |doc| expectation.evaluate(doc),
        )
        .await
}
