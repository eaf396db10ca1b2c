// src/engine/dispatcher.rs

//! The dispatch loop: takes jobs off the watch queue and runs them one at a
//! time.

use std::fmt;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::queue::QueueConsumer;
use crate::engine::single_flight::SingleFlight;
use crate::exec::{ExecutionBackend, JobReport, JobRunner};
use crate::job::{JobArchive, JobDescriptor};

/// A job the backend refused to accept. It is dropped, not requeued.
#[derive(Debug, Clone)]
pub struct RejectedJob {
    pub job: JobDescriptor,
    pub reason: String,
}

/// What the dispatch loop did, collected at shutdown.
#[derive(Debug, Default)]
pub struct DispatchSummary {
    /// Jobs that reached a terminal state, in dispatch order.
    pub finished: Vec<JobReport>,
    /// Jobs whose submission was rejected.
    pub rejected: Vec<RejectedJob>,
    /// Jobs still queued when the loop stopped; they never started.
    pub pending: Vec<JobDescriptor>,
}

pub struct Dispatcher<B: ExecutionBackend> {
    queue: QueueConsumer,
    runner: JobRunner<B>,
    guard: SingleFlight,
    period: Duration,
    archive: Option<JobArchive>,
    finished: Vec<JobReport>,
    rejected: Vec<RejectedJob>,
}

impl<B: ExecutionBackend> fmt::Debug for Dispatcher<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("queued", &self.queue.len())
            .field("period", &self.period)
            .field("finished", &self.finished.len())
            .field("rejected", &self.rejected.len())
            .finish_non_exhaustive()
    }
}

impl<B: ExecutionBackend> Dispatcher<B> {
    /// `period` is how long the loop idles between two looks at an empty
    /// queue.
    pub fn new(queue: QueueConsumer, runner: JobRunner<B>, period: Duration) -> Self {
        Self {
            queue,
            runner,
            guard: SingleFlight::new(),
            period,
            archive: None,
            finished: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Move job files into the archive once their job is over.
    pub fn with_archive(mut self, archive: JobArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn single_flight(&self) -> &SingleFlight {
        &self.guard
    }

    pub fn finished(&self) -> &[JobReport] {
        &self.finished
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// A job that is already running when `shutdown` fires is driven to its
    /// terminal state before this returns; queued jobs are left in the queue
    /// (see [`Dispatcher::into_summary`]).
    pub async fn run(&mut self, shutdown: &CancellationToken) {
        info!(period_ms = self.period.as_millis() as u64, "dispatch loop started");

        let mut ticker = time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let Some(job) = self.queue.dequeue() else {
                continue;
            };
            self.dispatch_one(job).await;

            if shutdown.is_cancelled() {
                break;
            }
        }

        info!(still_queued = self.queue.len(), "dispatch loop stopped");
    }

    async fn dispatch_one(&mut self, job: JobDescriptor) {
        let Some(_permit) = self.guard.acquire().await else {
            error!(job = %job.name(), "single-flight guard closed; dropping job");
            return;
        };

        info!(job = %job.name(), remaining = self.queue.len(), "dispatching job");
        debug!(%job, "job details");

        match self.runner.run(job.clone()).await {
            Ok(report) => {
                self.archive_job_file(&job, report.outcome.is_success());
                self.finished.push(report);
            }
            Err(err) => {
                error!(job = %job.name(), error = %err, "job submission failed; dropping job");
                self.archive_job_file(&job, false);
                self.rejected.push(RejectedJob {
                    job,
                    reason: err.to_string(),
                });
            }
        }
    }

    fn archive_job_file(&self, job: &JobDescriptor, succeeded: bool) {
        let Some(archive) = &self.archive else {
            return;
        };
        match archive.archive(job.source_path(), succeeded) {
            Ok(target) => debug!(job = %job.name(), to = ?target, "archived job file"),
            Err(e) => warn!(job = %job.name(), error = %e, "failed to archive job file"),
        }
    }

    /// Stop for good and report everything, including the jobs that were
    /// still queued.
    pub fn into_summary(mut self) -> DispatchSummary {
        let pending = self.queue.drain();
        DispatchSummary {
            finished: self.finished,
            rejected: self.rejected,
            pending,
        }
    }
}
