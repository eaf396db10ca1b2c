// src/job/descriptor.rs

use std::collections::HashSet;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::types::JobKind;

/// One unit of work found in the spool directory.
///
/// Constructed only by [`crate::job::JobParser`] (or [`JobDescriptor::new`]);
/// read-only afterwards. The template is always one of the input files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    source_path: PathBuf,
    kind: JobKind,
    user: Option<String>,
    exec_command: String,
    template_path: PathBuf,
    input_files: Vec<PathBuf>,
    output_directory: PathBuf,
}

impl JobDescriptor {
    /// Build a descriptor, appending `template_path` to `input_files` unless
    /// it is already listed.
    pub fn new(
        source_path: PathBuf,
        kind: JobKind,
        user: Option<String>,
        exec_command: String,
        template_path: PathBuf,
        mut input_files: Vec<PathBuf>,
        output_directory: PathBuf,
    ) -> Self {
        if !input_files.contains(&template_path) {
            input_files.push(template_path.clone());
        }
        Self {
            source_path,
            kind,
            user,
            exec_command,
            template_path,
            input_files,
            output_directory,
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn exec_command(&self) -> &str {
        &self.exec_command
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    pub fn input_files(&self) -> &[PathBuf] {
        &self.input_files
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Short name for logs: the job file's stem.
    pub fn name(&self) -> String {
        self.source_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.to_string_lossy().into_owned())
    }

    /// Template file name as seen from the backend's working directory,
    /// where every input is staged without its directories.
    pub fn staged_template_name(&self) -> String {
        self.template_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Arguments passed to `exec_command`.
    pub fn arguments(&self) -> Vec<String> {
        vec!["-template".to_string(), self.staged_template_name()]
    }

    pub fn declared_outputs(&self) -> &'static [&'static str] {
        self.kind.declared_outputs()
    }

    /// A file name carried by more than one input, if any. Inputs are staged
    /// side by side, so such a job would lose one of them.
    pub fn clashing_input_name(&self) -> Option<&OsStr> {
        let mut seen = HashSet::new();
        self.input_files
            .iter()
            .filter_map(|p| p.file_name())
            .find(|name| !seen.insert(*name))
    }
}

impl fmt::Display for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} {} -> {}",
            self.name(),
            self.kind,
            self.exec_command,
            self.arguments().join(" "),
            self.output_directory.display()
        )
    }
}
