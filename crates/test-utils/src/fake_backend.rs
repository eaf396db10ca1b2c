use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use spoolq::errors::{Result, SpoolError};
use spoolq::exec::{ExecutionBackend, ExecutionId};
use spoolq::job::JobDescriptor;
use spoolq::types::ExecutionState;

/// Something the scripted backend was asked to do or did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    ResourceSelected(String),
    Submitted(String),
    Rejected(String),
    Progress,
    StateChanged(String, ExecutionState),
    Abandoned(String),
    Released(String),
}

/// Shared, cloneable record of backend activity.
#[derive(Debug, Clone, Default)]
pub struct BackendLog {
    events: Arc<Mutex<Vec<BackendEvent>>>,
}

impl BackendLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: BackendEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<BackendEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Job names in submission order.
    pub fn submissions(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BackendEvent::Submitted(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn progress_calls(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, BackendEvent::Progress))
            .count()
    }

    /// Job names in the order they reached a terminal state.
    pub fn terminal(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BackendEvent::StateChanged(name, state) if state.is_terminal() => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Largest number of submitted-but-not-terminal jobs at any point.
    pub fn max_in_flight(&self) -> usize {
        let mut current = 0usize;
        let mut max = 0usize;
        for e in self.events() {
            match e {
                BackendEvent::Submitted(_) => {
                    current += 1;
                    max = max.max(current);
                }
                BackendEvent::StateChanged(_, state) if state.is_terminal() => {
                    current = current.saturating_sub(1);
                }
                _ => {}
            }
        }
        max
    }
}

struct ScriptedJob {
    name: String,
    state: ExecutionState,
    remaining: usize,
}

/// Execution backend that walks every job through
/// `New -> Submitted -> Running -> Terminated`, one state per `progress` call.
///
/// Jobs can be configured to fail, to be rejected at submission, or to run
/// forever.
pub struct ScriptedBackend {
    log: BackendLog,
    running_steps: usize,
    fail: HashSet<String>,
    reject: HashSet<String>,
    hang: HashSet<String>,
    next_id: u64,
    jobs: HashMap<ExecutionId, ScriptedJob>,
}

impl ScriptedBackend {
    pub fn new(log: BackendLog) -> Self {
        Self {
            log,
            running_steps: 0,
            fail: HashSet::new(),
            reject: HashSet::new(),
            hang: HashSet::new(),
            next_id: 1,
            jobs: HashMap::new(),
        }
    }

    /// Extra `progress` calls a job stays `Running` for.
    pub fn running_steps(mut self, steps: usize) -> Self {
        self.running_steps = steps;
        self
    }

    pub fn fail_job(mut self, name: &str) -> Self {
        self.fail.insert(name.to_string());
        self
    }

    pub fn reject_job(mut self, name: &str) -> Self {
        self.reject.insert(name.to_string());
        self
    }

    pub fn hang_job(mut self, name: &str) -> Self {
        self.hang.insert(name.to_string());
        self
    }

    fn set_state(log: &BackendLog, job: &mut ScriptedJob, state: ExecutionState) {
        job.state = state;
        log.push(BackendEvent::StateChanged(job.name.clone(), state));
    }
}

impl ExecutionBackend for ScriptedBackend {
    fn select_resource(&mut self, name: &str) -> Result<()> {
        self.log.push(BackendEvent::ResourceSelected(name.to_string()));
        Ok(())
    }

    fn submit(&mut self, job: &JobDescriptor) -> Result<ExecutionId> {
        let name = job.name();
        if self.reject.contains(&name) {
            self.log.push(BackendEvent::Rejected(name.clone()));
            return Err(SpoolError::BackendSubmission {
                job: name,
                reason: "scripted rejection".to_string(),
            });
        }

        let id = ExecutionId::new(self.next_id);
        self.next_id += 1;
        self.log.push(BackendEvent::Submitted(name.clone()));
        self.jobs.insert(
            id,
            ScriptedJob {
                name,
                state: ExecutionState::New,
                remaining: self.running_steps,
            },
        );
        Ok(id)
    }

    fn progress(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.log.push(BackendEvent::Progress);
            for job in self.jobs.values_mut() {
                match job.state {
                    ExecutionState::New => {
                        Self::set_state(&self.log, job, ExecutionState::Submitted)
                    }
                    ExecutionState::Submitted => {
                        Self::set_state(&self.log, job, ExecutionState::Running)
                    }
                    ExecutionState::Running => {
                        if self.hang.contains(&job.name) {
                            continue;
                        }
                        if job.remaining > 0 {
                            job.remaining -= 1;
                            continue;
                        }
                        let end = if self.fail.contains(&job.name) {
                            ExecutionState::Failed
                        } else {
                            ExecutionState::Terminated
                        };
                        Self::set_state(&self.log, job, end);
                    }
                    ExecutionState::Terminated | ExecutionState::Failed => {}
                }
            }
            Ok(())
        })
    }

    fn state(&self, id: ExecutionId) -> Option<ExecutionState> {
        self.jobs.get(&id).map(|j| j.state)
    }

    fn failure_reason(&self, id: ExecutionId) -> Option<String> {
        self.jobs
            .get(&id)
            .filter(|j| j.state == ExecutionState::Failed)
            .map(|j| format!("scripted failure of {}", j.name))
    }

    fn release(&mut self, id: ExecutionId) {
        if let Some(job) = self.jobs.remove(&id) {
            self.log.push(BackendEvent::Released(job.name));
        }
    }

    fn abandon(&mut self, id: ExecutionId) {
        if let Some(job) = self.jobs.get_mut(&id) {
            self.log.push(BackendEvent::Abandoned(job.name.clone()));
            if !job.state.is_terminal() {
                Self::set_state(&self.log, job, ExecutionState::Failed);
            }
        }
    }
}
