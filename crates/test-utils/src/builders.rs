use std::fs;
use std::path::{Path, PathBuf};

use spoolq::job::JobDescriptor;
use spoolq::types::JobKind;

/// Builder for job file contents.
#[derive(Debug, Clone)]
pub struct JobFileBuilder {
    kind: Option<String>,
    user: Option<String>,
    executable: Option<String>,
    template: Option<String>,
    inputs: Vec<String>,
    output_dir: Option<String>,
}

impl JobFileBuilder {
    /// A valid deconvolution job using `hucore` and `decon.hgsb`.
    pub fn new() -> Self {
        Self {
            kind: None,
            user: None,
            executable: Some("hucore".to_string()),
            template: Some("/templates/decon.hgsb".to_string()),
            inputs: Vec::new(),
            output_dir: None,
        }
    }

    pub fn kind(mut self, kind: &str) -> Self {
        self.kind = Some(kind.to_string());
        self
    }

    pub fn user(mut self, user: &str) -> Self {
        self.user = Some(user.to_string());
        self
    }

    pub fn executable(mut self, exe: impl AsRef<Path>) -> Self {
        self.executable = Some(exe.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn template(mut self, template: impl AsRef<Path>) -> Self {
        self.template = Some(template.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn without_template(mut self) -> Self {
        self.template = None;
        self
    }

    pub fn input(mut self, input: impl AsRef<Path>) -> Self {
        self.inputs.push(input.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = Some(dir.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn build(&self) -> String {
        let mut out = String::from("[job]\n");
        if let Some(ref kind) = self.kind {
            out.push_str(&format!("kind = {kind:?}\n"));
        }
        if let Some(ref user) = self.user {
            out.push_str(&format!("user = {user:?}\n"));
        }

        out.push_str("\n[hucore]\n");
        if let Some(ref exe) = self.executable {
            out.push_str(&format!("executable = {exe:?}\n"));
        }
        if let Some(ref template) = self.template {
            out.push_str(&format!("template = {template:?}\n"));
        }

        out.push_str("\n[files]\n");
        let inputs: Vec<String> = self.inputs.iter().map(|i| format!("{i:?}")).collect();
        out.push_str(&format!("inputs = [{}]\n", inputs.join(", ")));
        if let Some(ref dir) = self.output_dir {
            out.push_str(&format!("output_dir = {dir:?}\n"));
        }
        out
    }

    /// Write the job file to `dir/name` and return its path.
    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, self.build()).expect("writing job file");
        path
    }

    /// Write the job file into `staging`, then rename it into `spool`, the
    /// way a job submitter deposits files atomically.
    pub fn deposit(&self, staging: &Path, spool: &Path, name: &str) -> PathBuf {
        let staged = self.write_to(staging, name);
        let target = spool.join(name);
        fs::rename(&staged, &target).expect("moving job file into spool dir");
        target
    }
}

impl Default for JobFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for an in-memory `JobDescriptor`.
pub struct JobDescriptorBuilder {
    name: String,
    kind: JobKind,
    template: PathBuf,
    inputs: Vec<PathBuf>,
    output_dir: PathBuf,
}

impl JobDescriptorBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: JobKind::Deconvolve,
            template: PathBuf::from("/templates/decon.hgsb"),
            inputs: Vec::new(),
            output_dir: PathBuf::from("/out"),
        }
    }

    pub fn kind(mut self, kind: JobKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn input(mut self, input: impl Into<PathBuf>) -> Self {
        self.inputs.push(input.into());
        self
    }

    pub fn build(self) -> JobDescriptor {
        JobDescriptor::new(
            PathBuf::from(format!("/spool/{}.toml", self.name)),
            self.kind,
            None,
            "hucore".to_string(),
            self.template,
            self.inputs,
            self.output_dir,
        )
    }
}
