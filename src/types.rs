use std::fmt;

use serde::Deserialize;

/// Which `hucore` application a job file asks for.
///
/// Preview generation and SNR estimation are separate kinds with their own
/// outputs; they only share the invocation shape with deconvolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    #[default]
    Deconvolve,
    PreviewGen,
    #[serde(rename = "snr")]
    SnrEstimation,
}

impl JobKind {
    /// Artifacts the executable leaves in its working directory.
    pub fn declared_outputs(self) -> &'static [&'static str] {
        match self {
            JobKind::Deconvolve => &["resultdir", "previews"],
            JobKind::PreviewGen => &["previews"],
            JobKind::SnrEstimation => &["estimates"],
        }
    }

    /// Output directory name used when a job file does not name one.
    pub fn default_output_dir(self) -> &'static str {
        match self {
            JobKind::Deconvolve => "deconvolved",
            JobKind::PreviewGen => "previews",
            JobKind::SnrEstimation => "snr",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobKind::Deconvolve => "deconvolve",
            JobKind::PreviewGen => "previewgen",
            JobKind::SnrEstimation => "snr",
        };
        f.write_str(s)
    }
}

/// Lifecycle state of a submitted job as reported by the backend.
///
/// `New -> Submitted -> Running -> (Terminated | Failed)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    New,
    Submitted,
    Running,
    Terminated,
    Failed,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionState::Terminated | ExecutionState::Failed)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionState::New => "NEW",
            ExecutionState::Submitted => "SUBMITTED",
            ExecutionState::Running => "RUNNING",
            ExecutionState::Terminated => "TERMINATED",
            ExecutionState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Kind of execution resource a named `[resource.<name>]` section describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Run `hucore` as a child process on this host.
    #[default]
    Local,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_deconvolution_on_a_local_resource() {
        assert_eq!(JobKind::default(), JobKind::Deconvolve);
        assert_eq!(ResourceKind::default(), ResourceKind::Local);
    }

    #[test]
    fn kinds_display_as_their_job_file_names() {
        let names: Vec<String> = [JobKind::Deconvolve, JobKind::PreviewGen, JobKind::SnrEstimation]
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(names, vec!["deconvolve", "previewgen", "snr"]);
    }
}
