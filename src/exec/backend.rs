// src/exec/backend.rs

//! Pluggable execution backend abstraction.
//!
//! The job runner talks to an `ExecutionBackend` instead of spawning
//! processes itself, so tests can swap in a scripted backend while production
//! uses [`super::local::LocalBackend`].
//!
//! The contract mirrors a poll-driven compute engine:
//! - `submit` only registers a job; nothing runs yet.
//! - `progress` lets the backend advance every registered job by a step
//!   (stage inputs, start the process, collect results...).
//! - `state` reports where a job currently is.
//! - `release` drops a finished submission for good.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::job::JobDescriptor;
use crate::types::ExecutionState;

/// Backend-assigned identifier of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExecutionId(u64);

impl ExecutionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Trait abstracting where and how jobs are executed.
pub trait ExecutionBackend: Send {
    /// Restrict execution to the named resource.
    fn select_resource(&mut self, name: &str) -> Result<()>;

    /// Register `job` for execution. The returned id starts in
    /// [`ExecutionState::New`].
    ///
    /// Rejections are reported as `SpoolError::BackendSubmission`.
    fn submit(&mut self, job: &JobDescriptor) -> Result<ExecutionId>;

    /// Advance the internal state of all registered jobs.
    fn progress(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Current state of a submission, `None` if the id is unknown.
    fn state(&self, id: ExecutionId) -> Option<ExecutionState>;

    /// Human-readable reason for a `Failed` state, if the backend has one.
    fn failure_reason(&self, _id: ExecutionId) -> Option<String> {
        None
    }

    /// Stop caring about a submission: kill whatever runs for it and mark it
    /// failed. Files already staged for it may be left behind.
    fn abandon(&mut self, id: ExecutionId);

    /// Forget a submission whose outcome has been read. Its id is unknown
    /// afterwards.
    fn release(&mut self, id: ExecutionId);
}
