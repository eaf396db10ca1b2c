// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::ResourceKind;

/// Name of the resource used when the config file defines none.
pub const DEFAULT_RESOURCE: &str = "localhost";

/// Config file as deserialized, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub spool: SpoolSection,

    #[serde(default)]
    pub resource: BTreeMap<String, ResourceConfig>,
}

/// `[engine]`: timing of the dispatch loop and the job runner.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    /// How often the runner lets the backend advance a running job.
    #[serde(default = "default_interval_ms")]
    pub poll_interval_ms: u64,

    /// How often the dispatch loop checks the queue when idle.
    #[serde(default = "default_interval_ms")]
    pub dispatch_interval_ms: u64,

    /// Give up on a job after this many seconds. Unset means wait forever.
    #[serde(default)]
    pub job_timeout_secs: Option<u64>,
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_interval_ms(),
            dispatch_interval_ms: default_interval_ms(),
            job_timeout_secs: None,
        }
    }
}

/// `[spool]`: what happens to job files once their job is finished.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpoolSection {
    /// Processed job files are moved into `done/` or `failed/` below this
    /// directory. Unset leaves them in the spool directory.
    #[serde(default)]
    pub archive_dir: Option<PathBuf>,
}

/// `[resource.<name>]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    #[serde(default)]
    pub kind: ResourceKind,

    /// Parent of the per-job working directories.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Remove the working directory once outputs are collected.
    #[serde(default = "default_true")]
    pub cleanup: bool,
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("spoolq")
}

fn default_true() -> bool {
    true
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            kind: ResourceKind::default(),
            scratch_dir: default_scratch_dir(),
            enabled: true,
            cleanup: true,
        }
    }
}

/// Validated configuration. Obtain one via `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    engine: EngineSection,
    spool: SpoolSection,
    resources: BTreeMap<String, ResourceConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        engine: EngineSection,
        spool: SpoolSection,
        resources: BTreeMap<String, ResourceConfig>,
    ) -> Self {
        Self {
            engine,
            spool,
            resources,
        }
    }

    pub fn engine(&self) -> &EngineSection {
        &self.engine
    }

    pub fn spool(&self) -> &SpoolSection {
        &self.spool
    }

    pub fn resources(&self) -> &BTreeMap<String, ResourceConfig> {
        &self.resources
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.engine.poll_interval_ms)
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.engine.dispatch_interval_ms)
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.engine.job_timeout_secs.map(Duration::from_secs)
    }

    pub fn archive_dir(&self) -> Option<&PathBuf> {
        self.spool.archive_dir.as_ref()
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let mut resources = BTreeMap::new();
        resources.insert(DEFAULT_RESOURCE.to_string(), ResourceConfig::default());
        Self::new_unchecked(EngineSection::default(), SpoolSection::default(), resources)
    }
}
