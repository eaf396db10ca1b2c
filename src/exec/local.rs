// src/exec/local.rs

//! Execution backend that runs jobs as child processes on this host.
//!
//! Each call to `progress` moves every unfinished job one step:
//!
//! - `New`: copy all inputs (template included) into a fresh working
//!   directory below the resource's `scratch_dir` -> `Submitted`.
//! - `Submitted`: spawn `<exec> -template <template file>` in that directory,
//!   stdout and stderr both going to `stdout.txt` -> `Running`.
//! - `Running`: once the process exits, copy the declared outputs and
//!   `stdout.txt` into the job's output directory -> `Terminated` on exit
//!   code 0, `Failed` otherwise.
//!
//! Any IO error along the way fails the job.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, anyhow};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::{ConfigFile, ResourceConfig};
use crate::errors::{Result, SpoolError};
use crate::exec::backend::{ExecutionBackend, ExecutionId};
use crate::job::JobDescriptor;
use crate::types::ExecutionState;

/// File receiving the combined stdout/stderr of a job.
pub const STDOUT_FILE: &str = "stdout.txt";

struct LocalJob {
    job: JobDescriptor,
    state: ExecutionState,
    workdir: PathBuf,
    cleanup: bool,
    child: Option<Child>,
    reason: Option<String>,
}

impl LocalJob {
    fn fail(&mut self, id: ExecutionId, reason: String) {
        warn!(job = %self.job.name(), execution = %id, reason = %reason, "local job failed");
        self.state = ExecutionState::Failed;
        self.reason = Some(reason);
        self.child = None;
    }
}

/// Runs jobs on the local machine using one of the configured resources.
pub struct LocalBackend {
    resources: BTreeMap<String, ResourceConfig>,
    selected: Option<String>,
    next_id: u64,
    jobs: BTreeMap<ExecutionId, LocalJob>,
}

impl std::fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBackend")
            .field("selected", &self.selected)
            .field("jobs", &self.jobs.len())
            .finish_non_exhaustive()
    }
}

impl LocalBackend {
    /// Build a backend over the configured resources, pre-selecting the
    /// first enabled one (by name).
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let resources = cfg.resources().clone();
        let selected = resources
            .iter()
            .find(|(_, r)| r.enabled)
            .map(|(name, _)| name.clone());
        Self {
            resources,
            selected,
            next_id: 1,
            jobs: BTreeMap::new(),
        }
    }

    pub fn selected_resource(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Submissions not yet released.
    pub fn tracked_jobs(&self) -> usize {
        self.jobs.len()
    }

    async fn advance(id: ExecutionId, local: &mut LocalJob) {
        match local.state {
            ExecutionState::New => {
                let workdir = local.workdir.clone();
                let inputs = local.job.input_files().to_vec();
                match blocking(move || stage_inputs(&workdir, &inputs)).await {
                    Ok(()) => local.state = ExecutionState::Submitted,
                    Err(e) => local.fail(id, format!("staging inputs: {e:#}")),
                }
            }
            ExecutionState::Submitted => match spawn_job(&local.job, &local.workdir) {
                Ok(child) => {
                    info!(
                        job = %local.job.name(),
                        execution = %id,
                        pid = child.id(),
                        workdir = ?local.workdir,
                        "started job process"
                    );
                    local.child = Some(child);
                    local.state = ExecutionState::Running;
                }
                Err(e) => local.fail(id, format!("{e:#}")),
            },
            ExecutionState::Running => {
                let exited = match local.child.as_mut() {
                    Some(child) => child.try_wait(),
                    None => Err(std::io::Error::other("process handle missing")),
                };
                match exited {
                    Ok(None) => {}
                    Ok(Some(status)) => {
                        local.child = None;
                        let code = status.code().unwrap_or(-1);
                        debug!(job = %local.job.name(), execution = %id, exit_code = code, "job process exited");

                        let workdir = local.workdir.clone();
                        let output_dir = local.job.output_directory().to_path_buf();
                        let outputs = local.job.declared_outputs();
                        let collected =
                            blocking(move || collect_outputs(&workdir, &output_dir, outputs)).await;

                        match (status.success(), collected) {
                            (true, Ok(())) => local.state = ExecutionState::Terminated,
                            (false, _) => local.fail(id, format!("exit code {code}")),
                            (true, Err(e)) => local.fail(id, format!("collecting outputs: {e:#}")),
                        }

                        if local.cleanup {
                            let scratch = local.workdir.clone();
                            let removed = blocking(move || {
                                fs::remove_dir_all(&scratch)
                                    .with_context(|| format!("removing {:?}", scratch))
                            })
                            .await;
                            if let Err(e) = removed {
                                warn!(workdir = ?local.workdir, error = %e, "failed to remove job working directory");
                            }
                        }
                    }
                    Err(e) => local.fail(id, format!("waiting for process: {e}")),
                }
            }
            ExecutionState::Terminated | ExecutionState::Failed => {}
        }
    }
}

impl ExecutionBackend for LocalBackend {
    fn select_resource(&mut self, name: &str) -> Result<()> {
        match self.resources.get(name) {
            Some(r) if r.enabled => {
                info!(resource = %name, kind = ?r.kind, "selected execution resource");
                self.selected = Some(name.to_string());
                Ok(())
            }
            _ => Err(SpoolError::UnknownResource(name.to_string())),
        }
    }

    fn submit(&mut self, job: &JobDescriptor) -> Result<ExecutionId> {
        let rejected = |reason: String| SpoolError::BackendSubmission {
            job: job.name(),
            reason,
        };

        let resource = self
            .selected
            .as_ref()
            .and_then(|name| self.resources.get(name))
            .ok_or_else(|| rejected("no execution resource selected".to_string()))?;

        if let Some(missing) = job.input_files().iter().find(|p| !p.is_file()) {
            return Err(rejected(format!("input file {:?} does not exist", missing)));
        }
        if let Some(name) = job.clashing_input_name() {
            return Err(rejected(format!(
                "two input files are both named {:?}",
                name
            )));
        }

        let id = ExecutionId::new(self.next_id);
        self.next_id += 1;

        let workdir = resource
            .scratch_dir
            .join(format!("{}-{}", job.name(), id.get()));

        self.jobs.insert(
            id,
            LocalJob {
                job: job.clone(),
                state: ExecutionState::New,
                workdir,
                cleanup: resource.cleanup,
                child: None,
                reason: None,
            },
        );
        Ok(id)
    }

    fn progress(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for (id, local) in self.jobs.iter_mut() {
                if !local.state.is_terminal() {
                    Self::advance(*id, local).await;
                }
            }
            Ok(())
        })
    }

    fn state(&self, id: ExecutionId) -> Option<ExecutionState> {
        self.jobs.get(&id).map(|j| j.state)
    }

    fn failure_reason(&self, id: ExecutionId) -> Option<String> {
        self.jobs.get(&id).and_then(|j| j.reason.clone())
    }

    fn abandon(&mut self, id: ExecutionId) {
        let Some(local) = self.jobs.get_mut(&id) else {
            return;
        };
        if let Some(child) = local.child.as_mut() {
            if let Err(e) = child.start_kill() {
                warn!(execution = %id, error = %e, "failed to kill abandoned job process");
            }
        }
        if !local.state.is_terminal() {
            local.fail(id, "abandoned".to_string());
        }
    }

    fn release(&mut self, id: ExecutionId) {
        // Dropping the entry also kills a process that is somehow still
        // alive (`kill_on_drop`).
        if let Some(local) = self.jobs.remove(&id) {
            debug!(job = %local.job.name(), execution = %id, "released execution");
        }
    }
}

async fn blocking<F>(f: F) -> anyhow::Result<()>
where
    F: FnOnce() -> anyhow::Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow!("blocking file operation panicked: {e}"))?
}

fn stage_inputs(workdir: &Path, inputs: &[PathBuf]) -> anyhow::Result<()> {
    fs::create_dir_all(workdir).with_context(|| format!("creating {:?}", workdir))?;
    for input in inputs {
        let name = input
            .file_name()
            .with_context(|| format!("input {:?} has no file name", input))?;
        fs::copy(input, workdir.join(name))
            .with_context(|| format!("copying {:?} into {:?}", input, workdir))?;
    }
    Ok(())
}

fn spawn_job(job: &JobDescriptor, workdir: &Path) -> anyhow::Result<Child> {
    let log_path = workdir.join(STDOUT_FILE);
    let stdout = File::create(&log_path).with_context(|| format!("creating {:?}", log_path))?;
    let stderr = stdout.try_clone()?;

    Command::new(job.exec_command())
        .args(job.arguments())
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning '{}' for job '{}'", job.exec_command(), job.name()))
}

fn collect_outputs(workdir: &Path, output_dir: &Path, outputs: &[&str]) -> anyhow::Result<()> {
    fs::create_dir_all(output_dir).with_context(|| format!("creating {:?}", output_dir))?;

    for name in outputs.iter().copied().chain(std::iter::once(STDOUT_FILE)) {
        let src = workdir.join(name);
        if !src.exists() {
            debug!(output = %name, workdir = ?workdir, "declared output not produced");
            continue;
        }
        copy_tree(&src, &output_dir.join(name))?;
    }
    Ok(())
}

fn copy_tree(src: &Path, dst: &Path) -> anyhow::Result<()> {
    if src.is_dir() {
        fs::create_dir_all(dst).with_context(|| format!("creating {:?}", dst))?;
        for entry in fs::read_dir(src).with_context(|| format!("reading dir {:?}", src))? {
            let entry = entry?;
            copy_tree(&entry.path(), &dst.join(entry.file_name()))?;
        }
    } else {
        fs::copy(src, dst).with_context(|| format!("copying {:?} to {:?}", src, dst))?;
    }
    Ok(())
}
