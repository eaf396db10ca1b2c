// src/exec/handle.rs

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::exec::backend::ExecutionId;
use crate::job::JobDescriptor;
use crate::types::ExecutionState;

/// How a job ended, as far as the operator is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The backend reported `TERMINATED`.
    Succeeded,
    /// The backend reported `FAILED`. Not retried.
    Failed { reason: String },
    /// The configured job timeout elapsed; the submission was abandoned.
    TimedOut,
    /// Abandoned on operator request.
    Abandoned,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded)
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Succeeded => f.write_str("succeeded"),
            JobOutcome::Failed { reason } => write!(f, "failed ({reason})"),
            JobOutcome::TimedOut => f.write_str("timed out"),
            JobOutcome::Abandoned => f.write_str("abandoned"),
        }
    }
}

/// Result of one job runner invocation.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job: JobDescriptor,
    pub execution: ExecutionId,
    pub outcome: JobOutcome,
    pub elapsed: Duration,
}

/// One in-flight submission: its id, the last state observed for it, and the
/// job it runs.
#[derive(Debug)]
pub struct ExecutionHandle {
    id: ExecutionId,
    job: JobDescriptor,
    state: ExecutionState,
    outcome: Option<JobOutcome>,
    started: Instant,
}

impl ExecutionHandle {
    pub fn new(id: ExecutionId, job: JobDescriptor) -> Self {
        Self {
            id,
            job,
            state: ExecutionState::New,
            outcome: None,
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> ExecutionId {
        self.id
    }

    pub fn job(&self) -> &JobDescriptor {
        &self.job
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn outcome(&self) -> Option<&JobOutcome> {
        self.outcome.as_ref()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record a freshly polled state. Returns the previous state if it
    /// changed, `None` if it is the same as last time.
    pub fn observe(&mut self, state: ExecutionState) -> Option<ExecutionState> {
        if state == self.state {
            return None;
        }
        let previous = self.state;
        self.state = state;
        Some(previous)
    }

    pub(crate) fn finish(&mut self, outcome: JobOutcome) {
        self.outcome = Some(outcome);
    }

    pub fn into_report(self, outcome: JobOutcome) -> JobReport {
        JobReport {
            elapsed: self.started.elapsed(),
            job: self.job,
            execution: self.id,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::types::JobKind;

    fn handle() -> ExecutionHandle {
        let job = JobDescriptor::new(
            PathBuf::from("/spool/j.toml"),
            JobKind::Deconvolve,
            None,
            "hucore".into(),
            PathBuf::from("/t.hgsb"),
            vec![],
            PathBuf::from("/out"),
        );
        ExecutionHandle::new(ExecutionId::new(1), job)
    }

    #[test]
    fn unchanged_state_is_reported_once() {
        let mut h = handle();
        assert_eq!(h.observe(ExecutionState::New), None);
        assert_eq!(
            h.observe(ExecutionState::Submitted),
            Some(ExecutionState::New)
        );
        assert_eq!(h.observe(ExecutionState::Submitted), None);
        assert_eq!(
            h.observe(ExecutionState::Running),
            Some(ExecutionState::Submitted)
        );
        assert_eq!(h.state(), ExecutionState::Running);
    }

    #[test]
    fn skipped_states_are_one_transition() {
        let mut h = handle();
        assert_eq!(
            h.observe(ExecutionState::Terminated),
            Some(ExecutionState::New)
        );
        assert!(h.state().is_terminal());
    }
}
