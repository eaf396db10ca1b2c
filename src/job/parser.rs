// src/job/parser.rs

//! Job file parsing.
//!
//! Job files are small TOML documents:
//!
//! ```toml
//! [job]
//! kind = "deconvolve"        # deconvolve | previewgen | snr
//! user = "alice"
//!
//! [hucore]
//! executable = "/usr/local/bin/hucore"
//! template = "decon_it-3.hgsb"
//!
//! [files]
//! inputs = ["/data/a.tif", "/data/b.tif"]
//! output_dir = "/data/results"
//! ```
//!
//! Relative paths are resolved against the job file's directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::errors::{Result, SpoolError};
use crate::fs::FileSystem;
use crate::job::descriptor::JobDescriptor;
use crate::types::JobKind;

/// Where the job text comes from.
#[derive(Debug, Clone)]
pub enum JobSource {
    /// A job file on disk. Must be a regular file.
    File(PathBuf),
    /// Job text already in memory, attributed to `origin`.
    Text { origin: PathBuf, contents: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawJobFile {
    #[serde(default)]
    job: RawJobSection,
    hucore: Option<RawHucoreSection>,
    #[serde(default)]
    files: RawFilesSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawJobSection {
    #[serde(default)]
    kind: JobKind,
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHucoreSection {
    executable: Option<String>,
    template: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFilesSection {
    #[serde(default)]
    inputs: Vec<String>,
    output_dir: Option<String>,
}

/// Turns job files into [`JobDescriptor`]s.
#[derive(Debug, Clone)]
pub struct JobParser {
    fs: Arc<dyn FileSystem>,
    output_root: PathBuf,
}

impl JobParser {
    /// `output_root` is where jobs without an explicit `output_dir` write
    /// their results (a per-kind subdirectory below it).
    pub fn new(fs: Arc<dyn FileSystem>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            output_root: output_root.into(),
        }
    }

    pub fn parse(&self, source: JobSource) -> Result<JobDescriptor> {
        let (path, contents) = match source {
            JobSource::File(path) => {
                if !self.fs.is_file(&path) {
                    return Err(SpoolError::invalid_job(&path, "not a regular file"));
                }
                let contents = self
                    .fs
                    .read_to_string(&path)
                    .map_err(|e| SpoolError::invalid_job(&path, format!("{e:#}")))?;
                (path, contents)
            }
            JobSource::Text { origin, contents } => (origin, contents),
        };

        let source_path = self.fs.canonicalize(&path).unwrap_or_else(|_| path.clone());
        let base_dir = source_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let raw: RawJobFile = toml::from_str(&contents)
            .map_err(|e| SpoolError::invalid_job(&path, e.message().to_string()))?;

        let hucore = raw
            .hucore
            .ok_or_else(|| SpoolError::invalid_job(&path, "missing [hucore] section"))?;
        let exec_command = required(&path, hucore.executable, "hucore.executable")?;
        let template = required(&path, hucore.template, "hucore.template")?;

        let output_directory = match raw.files.output_dir {
            Some(dir) if dir.trim().is_empty() => {
                return Err(SpoolError::invalid_job(&path, "files.output_dir is empty"));
            }
            Some(dir) => resolve(&base_dir, &dir),
            None => self.output_root.join(raw.job.kind.default_output_dir()),
        };

        let mut input_files = Vec::with_capacity(raw.files.inputs.len() + 1);
        for input in raw.files.inputs.iter() {
            if input.trim().is_empty() {
                return Err(SpoolError::invalid_job(&path, "files.inputs contains an empty path"));
            }
            input_files.push(resolve(&base_dir, input));
        }

        let job = JobDescriptor::new(
            source_path,
            raw.job.kind,
            raw.job.user.filter(|u| !u.trim().is_empty()),
            exec_command,
            resolve(&base_dir, &template),
            input_files,
            output_directory,
        );
        if let Some(name) = job.clashing_input_name() {
            return Err(SpoolError::invalid_job(
                &path,
                format!("two input files are both named {name:?}"),
            ));
        }
        Ok(job)
    }
}

fn required(path: &Path, value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        Some(_) => Err(SpoolError::invalid_job(path, format!("{field} is empty"))),
        None => Err(SpoolError::invalid_job(path, format!("missing {field}"))),
    }
}

fn resolve(base: &Path, value: &str) -> PathBuf {
    let p = PathBuf::from(value.trim());
    if p.is_absolute() { p } else { base.join(p) }
}
