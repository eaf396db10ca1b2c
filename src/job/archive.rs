// src/job/archive.rs

//! Moves finished job files out of the spool directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::fs::FileSystem;

pub const DONE_DIR: &str = "done";
pub const FAILED_DIR: &str = "failed";

/// Target for processed job files: `<root>/done` and `<root>/failed`.
#[derive(Debug, Clone)]
pub struct JobArchive {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl JobArchive {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    /// Move `job_file` into `done/` or `failed/`. Returns the new path.
    ///
    /// An existing file with the same name gets a numeric suffix rather than
    /// being overwritten.
    pub fn archive(&self, job_file: &Path, succeeded: bool) -> Result<PathBuf> {
        let dir = self.root.join(if succeeded { DONE_DIR } else { FAILED_DIR });
        self.fs.create_dir_all(&dir)?;

        let file_name = job_file
            .file_name()
            .with_context(|| format!("job file {:?} has no file name", job_file))?;

        let mut target = dir.join(file_name);
        let mut n = 1;
        while self.fs.exists(&target) {
            target = dir.join(format!("{}.{n}", file_name.to_string_lossy()));
            n += 1;
        }

        self.fs.rename(job_file, &target)?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn moves_into_done_and_failed() {
        let fs = MockFileSystem::new();
        fs.add_file("/spool/a.toml", "x");
        fs.add_file("/spool/b.toml", "y");
        let archive = JobArchive::new(Arc::new(fs.clone()), "/archive");

        let a = archive.archive(Path::new("/spool/a.toml"), true).unwrap();
        let b = archive.archive(Path::new("/spool/b.toml"), false).unwrap();

        assert_eq!(a, PathBuf::from("/archive/done/a.toml"));
        assert_eq!(b, PathBuf::from("/archive/failed/b.toml"));
        assert_eq!(fs.files(), vec![a, b]);
    }

    #[test]
    fn does_not_overwrite_previous_archive() {
        let fs = MockFileSystem::new();
        fs.add_file("/archive/done/a.toml", "old");
        fs.add_file("/spool/a.toml", "new");
        let archive = JobArchive::new(Arc::new(fs.clone()), "/archive");

        let target = archive.archive(Path::new("/spool/a.toml"), true).unwrap();
        assert_eq!(target, PathBuf::from("/archive/done/a.toml.1"));
    }
}
