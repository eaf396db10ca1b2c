// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::QueueProducer;
use crate::errors::{Result, SpoolError};
use crate::job::JobParser;
use crate::watch::event_handler::{arrival_paths, process_new_file};

/// Handle for the spool directory watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Call
/// [`WatcherHandle::shutdown`] to stop watching and wait for the events that
/// were already delivered to be processed.
pub struct WatcherHandle {
    watcher: RecommendedWatcher,
    dir: PathBuf,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl WatcherHandle {
    /// Shut the watcher down as soon as `token` is cancelled, without
    /// waiting for anything else. Await the returned task to know it is done.
    pub fn shutdown_on(self, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            token.cancelled().await;
            info!(dir = ?self.dir, "interrupted; no longer accepting job files");
            self.shutdown().await;
        })
    }

    /// The watched directory (canonicalized).
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Unregister the watch, then flush pending event processing.
    ///
    /// Once this returns no further job is enqueued by this watcher.
    pub async fn shutdown(self) {
        let WatcherHandle {
            mut watcher,
            dir,
            task,
        } = self;

        if let Err(err) = watcher.unwatch(&dir) {
            warn!(dir = ?dir, error = %err, "failed to remove watch");
        }
        // Dropping the watcher drops the callback and with it the last event
        // sender, which ends the processing task after it drains.
        drop(watcher);

        if let Err(err) = task.await {
            warn!(error = %err, "watcher event task ended abnormally");
        }
        info!(dir = ?dir, "file watcher stopped");
    }
}

/// Watch `dir` (non-recursively) and queue a job for every job file that
/// appears in it.
///
/// Events are handled one at a time in arrival order, each new path getting
/// exactly one parse attempt. Must be called from within a Tokio runtime.
pub fn spawn_watcher(
    dir: impl Into<PathBuf>,
    parser: JobParser,
    producer: QueueProducer,
) -> Result<WatcherHandle> {
    let dir = dir.into();
    if !dir.is_dir() {
        return Err(SpoolError::Watch(
            notify::Error::generic("spool directory does not exist or is not a directory")
                .add_path(dir),
        ));
    }
    let dir = dir.canonicalize()?;

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // We can't log via tracing here easily, so fallback to stderr.
                    eprintln!("spoolq: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("spoolq: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&dir, RecursiveMode::NonRecursive)?;

    info!("file watcher started on {:?}", dir);

    let task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");
            for path in arrival_paths(&event) {
                process_new_file(&parser, &producer, path);
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { watcher, dir, task })
}
