// src/exec/runner.rs

//! Runs one job to completion against an [`ExecutionBackend`].

use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::errors::Result;
use crate::exec::backend::ExecutionBackend;
use crate::exec::handle::{ExecutionHandle, JobOutcome, JobReport};
use crate::job::JobDescriptor;
use crate::types::ExecutionState;

#[derive(Debug, Clone, Copy)]
pub struct RunnerOptions {
    /// Pause between two `progress` calls.
    pub poll_interval: Duration,
    /// Abandon a job that has not reached a terminal state after this long.
    pub timeout: Option<Duration>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: None,
        }
    }
}

impl RunnerOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            poll_interval: cfg.poll_interval(),
            timeout: cfg.job_timeout(),
        }
    }
}

/// Submits jobs one at a time and polls the backend until each is terminal.
///
/// There are no retries: a job the backend reports as failed is finished.
pub struct JobRunner<B: ExecutionBackend> {
    backend: B,
    options: RunnerOptions,
    abort: CancellationToken,
}

impl<B: ExecutionBackend> std::fmt::Debug for JobRunner<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRunner")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<B: ExecutionBackend> JobRunner<B> {
    pub fn new(backend: B, options: RunnerOptions) -> Self {
        Self {
            backend,
            options,
            abort: CancellationToken::new(),
        }
    }

    /// Cancelling `abort` abandons whatever job is being driven at the time.
    pub fn with_abort(mut self, abort: CancellationToken) -> Self {
        self.abort = abort;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Submit `job` once and drive it to a terminal state.
    ///
    /// The only error is a rejected submission; every outcome after that is
    /// reported in the returned [`JobReport`]. The backend forgets the
    /// submission once the outcome is known.
    pub async fn run(&mut self, job: JobDescriptor) -> Result<JobReport> {
        let mut handle = self.submit(job)?;
        let outcome = self.drive(&mut handle).await;
        self.backend.release(handle.id());
        Ok(handle.into_report(outcome))
    }

    pub fn submit(&mut self, job: JobDescriptor) -> Result<ExecutionHandle> {
        let id = self.backend.submit(&job)?;
        info!(
            job = %job.name(),
            execution = %id,
            kind = %job.kind(),
            user = job.user().unwrap_or("-"),
            "job submitted"
        );
        Ok(ExecutionHandle::new(id, job))
    }

    /// Poll the backend until `handle` reaches a terminal state.
    ///
    /// Calling this on a handle that already finished does nothing and
    /// returns the recorded outcome.
    pub async fn drive(&mut self, handle: &mut ExecutionHandle) -> JobOutcome {
        if let Some(outcome) = handle.outcome() {
            debug!(
                job = %handle.job().name(),
                execution = %handle.id(),
                "execution already finished; nothing to drive"
            );
            return outcome.clone();
        }

        let id = handle.id();
        let name = handle.job().name();

        let mut ticker = time::interval(self.options.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        let deadline = self.options.timeout.map(|t| Instant::now() + t);

        loop {
            if let Err(err) = self.backend.progress().await {
                warn!(job = %name, execution = %id, error = %err, "backend progress failed; polling again");
            }

            let state = match self.backend.state(id) {
                Some(s) => s,
                None => {
                    let outcome = JobOutcome::Failed {
                        reason: "execution unknown to backend".to_string(),
                    };
                    warn!(job = %name, execution = %id, "backend lost track of job");
                    handle.finish(outcome.clone());
                    return outcome;
                }
            };

            if let Some(previous) = handle.observe(state) {
                info!(job = %name, execution = %id, from = %previous, to = %state, "job in status {state}");
            }

            if state.is_terminal() {
                let outcome = match state {
                    ExecutionState::Terminated => JobOutcome::Succeeded,
                    _ => JobOutcome::Failed {
                        reason: self
                            .backend
                            .failure_reason(id)
                            .unwrap_or_else(|| "backend reported failure".to_string()),
                    },
                };
                self.log_finished(handle, &outcome);
                handle.finish(outcome.clone());
                return outcome;
            }

            tokio::select! {
                biased;
                _ = self.abort.cancelled() => {
                    warn!(job = %name, execution = %id, "abort requested; abandoning running job");
                    self.backend.abandon(id);
                    handle.finish(JobOutcome::Abandoned);
                    return JobOutcome::Abandoned;
                }
                _ = wait_for_deadline(deadline) => {
                    warn!(
                        job = %name,
                        execution = %id,
                        timeout_secs = self.options.timeout.map(|t| t.as_secs_f64()),
                        "job timed out; abandoning it"
                    );
                    self.backend.abandon(id);
                    handle.finish(JobOutcome::TimedOut);
                    return JobOutcome::TimedOut;
                }
                _ = ticker.tick() => {}
            }
        }
    }

    fn log_finished(&self, handle: &ExecutionHandle, outcome: &JobOutcome) {
        let job = handle.job();
        match outcome {
            JobOutcome::Succeeded => info!(
                job = %job.name(),
                execution = %handle.id(),
                elapsed_ms = handle.elapsed().as_millis() as u64,
                output_dir = ?job.output_directory(),
                "job is now terminated"
            ),
            other => warn!(
                job = %job.name(),
                execution = %handle.id(),
                elapsed_ms = handle.elapsed().as_millis() as u64,
                outcome = %other,
                "job finished without success; not retrying"
            ),
        }
    }
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}
