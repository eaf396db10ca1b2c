// src/watch/event_handler.rs

//! Turning filesystem events into queued jobs.

use std::path::PathBuf;

use notify::EventKind;
use notify::event::{CreateKind, ModifyKind, RenameMode};
use tracing::{debug, info, warn};

use crate::engine::QueueProducer;
use crate::job::{JobParser, JobSource};

/// Does this event mean a new entry showed up in the spool directory?
///
/// Files created in place count, and so do files renamed into the
/// directory, which is how job files are usually deposited atomically.
pub fn is_job_arrival(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(CreateKind::File)
            | EventKind::Create(CreateKind::Any)
            | EventKind::Modify(ModifyKind::Name(RenameMode::To))
            | EventKind::Modify(ModifyKind::Name(RenameMode::Any))
    )
}

/// Paths of an event that should be parsed as job files.
///
/// `RenameMode::Any` does not say which side of the rename a path is, so
/// only paths that still exist are kept for it.
pub fn arrival_paths(event: &notify::Event) -> Vec<PathBuf> {
    if !is_job_arrival(&event.kind) {
        return Vec::new();
    }
    match event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            event.paths.iter().filter(|p| p.exists()).cloned().collect()
        }
        _ => event.paths.clone(),
    }
}

/// Parse one new file and enqueue the job.
///
/// Returns `true` if a job was queued. Invalid job files are logged and
/// dropped; nothing is retried.
pub fn process_new_file(parser: &JobParser, producer: &QueueProducer, path: PathBuf) -> bool {
    info!(path = ?path, "found new job file, processing");

    match parser.parse(JobSource::File(path)) {
        Ok(job) => {
            debug!(%job, "parsed job file");
            let name = job.name();
            match producer.enqueue(job) {
                Ok(()) => {
                    info!(job = %name, "job queued");
                    true
                }
                Err(job) => {
                    warn!(job = %job.name(), "dispatch loop is gone; dropping job");
                    false
                }
            }
        }
        Err(err) => {
            warn!(error = %err, "ignoring invalid job file");
            false
        }
    }
}
