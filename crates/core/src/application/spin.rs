// Polling Executor - bounded retry-until-condition loop
use std::fmt::{Debug, Display};
use std::future::Future;
use std::sync::Arc;

use crate::domain::{
    display_duration, Deadline, PollConfig, PollState, PollTimeoutError, SpinError, Truthy,
    Verdict, NO_ATTEMPT_REASON,
};
use crate::port::{
    PollLogger, Sleeper, SystemSleeper, SystemTimeProvider, TimeProvider, TracingPollLogger,
};

/// Repeatedly invokes a probe until a success predicate holds or the deadline passes
///
/// One executor can serve any number of spins; each call keeps its own state.
pub struct PollingExecutor {
    config: PollConfig,
    time_provider: Arc<dyn TimeProvider>,
    sleeper: Arc<dyn Sleeper>,
    logger: Arc<dyn PollLogger>,
}

/// What the loop does after one attempt
enum Step<V, E> {
    Done(V),
    Retry,
    Abort(E),
}

/// Per-invocation bookkeeping shared by the blocking and async loops
struct PollRun<'a, V> {
    executor: &'a PollingExecutor,
    deadline: Deadline,
    state: PollState,
    attempts: u32,
    last_reason: Option<String>,
    last_value: Option<V>,
}

impl<'a, V: Debug> PollRun<'a, V> {
    fn begin(executor: &'a PollingExecutor) -> Self {
        let now = executor.time_provider.now_millis();
        Self {
            executor,
            deadline: Deadline::starting_at(now, executor.config.timeout),
            state: PollState::Running,
            attempts: 0,
            last_reason: None,
            last_value: None,
        }
    }

    fn label(&self) -> &str {
        &self.executor.config.label
    }

    /// Check the deadline and log progress; false once time is up
    fn next_attempt(&self) -> bool {
        let now = self.executor.time_provider.now_millis();
        if self.deadline.is_expired(now) {
            return false;
        }
        self.executor.logger.info(&format!(
            "{}: [{} elapsed, {} left] attempt {}",
            self.label(),
            display_duration(self.deadline.elapsed(now)),
            display_duration(self.deadline.remaining(now)),
            self.attempts + 1
        ));
        true
    }

    fn observe<E, P, R>(&mut self, result: Result<V, E>, predicate: &mut P) -> Step<V, E>
    where
        E: Display + Debug,
        P: FnMut(&V) -> R,
        R: Into<Verdict>,
    {
        self.attempts += 1;

        let value = match result {
            Ok(value) => value,
            Err(e) if self.executor.config.ignore_errors => {
                self.executor.logger.warn(&format!(
                    "{}: attempt {} failed, will retry: {:?}",
                    self.label(),
                    self.attempts,
                    e
                ));
                self.last_reason = Some(format!("exception: {}", e));
                return Step::Retry;
            }
            Err(e) => {
                self.finish(PollState::Failed);
                self.executor.logger.warn(&format!(
                    "{}: attempt {} failed, aborting: {}",
                    self.label(),
                    self.attempts,
                    e
                ));
                return Step::Abort(e);
            }
        };

        let verdict: Verdict = predicate(&value).into();
        if verdict.satisfied {
            self.finish(PollState::Succeeded);
            self.executor.logger.info(&format!(
                "{}: success state reached after {} attempt(s), exiting spin",
                self.label(),
                self.attempts
            ));
            return Step::Done(value);
        }

        self.executor.logger.info(&format!(
            "{}: waiting for success state... err={}",
            self.label(),
            verdict.reason
        ));
        self.last_reason = Some(verdict.reason);
        self.last_value = Some(value);
        Step::Retry
    }

    fn time_out(mut self) -> PollTimeoutError<V> {
        self.finish(PollState::TimedOut);

        let now = self.executor.time_provider.now_millis();
        let elapsed = self.deadline.elapsed(now);
        let reason = self
            .last_reason
            .take()
            .unwrap_or_else(|| NO_ATTEMPT_REASON.to_string());

        self.executor.logger.warn(&format!(
            "{}: gave up after {} and {} attempt(s): {}",
            self.label(),
            display_duration(elapsed),
            self.attempts,
            reason
        ));

        PollTimeoutError {
            label: self.executor.config.label.clone(),
            reason,
            last_value: self.last_value.take(),
            attempts: self.attempts,
            elapsed,
            timeout: self.executor.config.timeout,
        }
    }

    fn finish(&mut self, next: PollState) {
        if let Err(e) = self.state.transition(next) {
            self.executor.logger.warn(&e.to_string());
        }
    }
}

fn truthy_verdict<V: Truthy>(value: &V) -> Verdict {
    if value.is_truthy() {
        Verdict::satisfied()
    } else {
        Verdict::pending("value is falsy")
    }
}

impl PollingExecutor {
    pub fn new(
        config: PollConfig,
        time_provider: Arc<dyn TimeProvider>,
        sleeper: Arc<dyn Sleeper>,
        logger: Arc<dyn PollLogger>,
    ) -> Self {
        Self {
            config,
            time_provider,
            sleeper,
            logger,
        }
    }

    /// Executor wired to the wall clock, real sleeps and `tracing`
    pub fn system(config: PollConfig) -> Self {
        Self::new(
            config,
            Arc::new(SystemTimeProvider),
            Arc::new(SystemSleeper),
            Arc::new(TracingPollLogger),
        )
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Same collaborators, different options
    pub fn with_config(&self, config: PollConfig) -> Self {
        Self {
            config,
            time_provider: self.time_provider.clone(),
            sleeper: self.sleeper.clone(),
            logger: self.logger.clone(),
        }
    }

    /// Poll `probe` until `predicate` is satisfied
    ///
    /// Returns the first satisfying value; the probe is not called again after
    /// success. Probe errors are logged and retried when `ignore_errors` is set,
    /// otherwise returned unchanged as `SpinError::Probe`.
    ///
    /// # Example
    /// ```
    /// use settle_core::application::PollingExecutor;
    /// use settle_core::domain::PollConfig;
    /// use std::time::Duration;
    ///
    /// let executor = PollingExecutor::system(PollConfig::new(
    ///     Duration::from_secs(10),
    ///     Duration::ZERO,
    /// ));
    /// let mut calls = 0;
    /// let value = executor
    ///     .spin(
    ///         || {
    ///             calls += 1;
    ///             Ok::<_, String>(if calls == 3 { "ok" } else { "pending" })
    ///         },
    ///         |v| (*v == "ok", "not yet"),
    ///     )
    ///     .unwrap();
    /// assert_eq!(value, "ok");
    /// assert_eq!(calls, 3);
    /// ```
    pub fn spin<V, E, F, P, R>(&self, mut probe: F, mut predicate: P) -> Result<V, SpinError<V, E>>
    where
        V: Debug,
        E: Display + Debug,
        F: FnMut() -> Result<V, E>,
        P: FnMut(&V) -> R,
        R: Into<Verdict>,
    {
        let mut run = PollRun::begin(self);
        while run.next_attempt() {
            match run.observe(probe(), &mut predicate) {
                Step::Done(value) => return Ok(value),
                Step::Abort(e) => return Err(SpinError::Probe(e)),
                Step::Retry => self.sleeper.sleep(self.config.poll_interval),
            }
        }
        Err(SpinError::TimedOut(run.time_out()))
    }

    /// Async twin of `spin`: the probe returns a future and the sleep is awaited
    pub async fn spin_async<V, E, F, Fut, P, R>(
        &self,
        mut probe: F,
        mut predicate: P,
    ) -> Result<V, SpinError<V, E>>
    where
        V: Debug,
        E: Display + Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        P: FnMut(&V) -> R,
        R: Into<Verdict>,
    {
        let mut run = PollRun::begin(self);
        while run.next_attempt() {
            let result = probe().await;
            match run.observe(result, &mut predicate) {
                Step::Done(value) => return Ok(value),
                Step::Abort(e) => return Err(SpinError::Probe(e)),
                Step::Retry => self.sleeper.sleep_async(self.config.poll_interval).await,
            }
        }
        Err(SpinError::TimedOut(run.time_out()))
    }

    /// Poll until the probe returns a truthy value
    ///
    /// `Ok(None)` when the deadline passes; `Err` only for a propagated probe
    /// error (`ignore_errors = false`).
    pub fn time_wait_return<V, E, F>(&self, probe: F) -> Result<Option<V>, E>
    where
        V: Truthy + Debug,
        E: Display + Debug,
        F: FnMut() -> Result<V, E>,
    {
        match self.spin(probe, truthy_verdict::<V>) {
            Ok(value) => Ok(Some(value)),
            Err(SpinError::TimedOut(_)) => Ok(None),
            Err(SpinError::Probe(e)) => Err(e),
        }
    }

    pub async fn time_wait_return_async<V, E, F, Fut>(&self, probe: F) -> Result<Option<V>, E>
    where
        V: Truthy + Debug,
        E: Display + Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        match self.spin_async(probe, truthy_verdict::<V>).await {
            Ok(value) => Ok(Some(value)),
            Err(SpinError::TimedOut(_)) => Ok(None),
            Err(SpinError::Probe(e)) => Err(e),
        }
    }
}

/// `PollingExecutor::spin` with production collaborators
pub fn spin<V, E, F, P, R>(
    probe: F,
    predicate: P,
    config: &PollConfig,
) -> Result<V, SpinError<V, E>>
where
    V: Debug,
    E: Display + Debug,
    F: FnMut() -> Result<V, E>,
    P: FnMut(&V) -> R,
    R: Into<Verdict>,
{
    PollingExecutor::system(config.clone()).spin(probe, predicate)
}

/// `PollingExecutor::time_wait_return` with production collaborators
pub fn time_wait_return<V, E, F>(probe: F, config: &PollConfig) -> Result<Option<V>, E>
where
    V: Truthy + Debug,
    E: Display + Debug,
    F: FnMut() -> Result<V, E>,
{
    PollingExecutor::system(config.clone()).time_wait_return(probe)
}
