// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod job;
pub mod logging;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::loader::CONFIG_ENV_VAR;
use crate::config::{config_path_from_env, load_or_default};
use crate::engine::{DispatchSummary, Dispatcher, watch_queue};
use crate::exec::{ExecutionBackend, JobRunner, LocalBackend, RunnerOptions};
use crate::fs::{FileSystem, RealFileSystem};
use crate::job::{JobArchive, JobParser};
use crate::watch::spawn_watcher;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - engine configuration and resource selection
/// - the spool directory watcher and the watch queue
/// - the job runner on top of the local backend
/// - the dispatch loop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let explicit_config = std::env::var_os(CONFIG_ENV_VAR).is_some();
    let config_path = config_path_from_env();
    let cfg = load_or_default(config_path.as_deref(), explicit_config)?;

    let mut backend = LocalBackend::from_config(&cfg);
    if let Some(ref resource) = args.resource {
        backend.select_resource(resource)?;
    }
    info!(resource = ?backend.selected_resource(), "execution backend ready");

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let parser = JobParser::new(Arc::clone(&fs), std::env::current_dir()?);

    let (producer, consumer) = watch_queue();
    let watcher = spawn_watcher(&args.spooldir, parser, producer)?;
    println!("Added watch to {:?}, press Ctrl-C to abort.", watcher.dir());

    let shutdown = CancellationToken::new();
    let abort = CancellationToken::new();
    spawn_interrupt_listener(shutdown.clone(), abort.clone());
    let watcher_stopped = watcher.shutdown_on(shutdown.clone());

    let runner = JobRunner::new(backend, RunnerOptions::from_config(&cfg)).with_abort(abort);
    let mut dispatcher = Dispatcher::new(consumer, runner, cfg.dispatch_interval());
    if let Some(dir) = cfg.archive_dir() {
        dispatcher = dispatcher.with_archive(JobArchive::new(fs, dir.clone()));
    }

    dispatcher.run(&shutdown).await;

    println!("Cleaning up.");
    if let Err(e) = watcher_stopped.await {
        warn!(error = %e, "watcher shutdown task ended abnormally");
    }
    print_summary(&dispatcher.into_summary());

    Ok(())
}

/// First Ctrl-C stops dispatching new jobs; a second one abandons the job
/// that is still running.
fn spawn_interrupt_listener(shutdown: CancellationToken, abort: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        warn!("interrupt received; no new jobs will start (Ctrl-C again abandons the running job)");
        shutdown.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("second interrupt received; abandoning running job");
            abort.cancel();
        }
    });
}

fn print_summary(summary: &DispatchSummary) {
    println!("spoolq summary");
    println!("  finished: {}", summary.finished.len());
    for report in summary.finished.iter() {
        println!(
            "    - {} ({}): {} after {:.1}s",
            report.job.name(),
            report.execution,
            report.outcome,
            report.elapsed.as_secs_f64()
        );
    }

    if !summary.rejected.is_empty() {
        println!("  rejected: {}", summary.rejected.len());
        for rejected in summary.rejected.iter() {
            println!("    - {}: {}", rejected.job.name(), rejected.reason);
        }
    }

    println!("  still queued (never started): {}", summary.pending.len());
    for job in summary.pending.iter() {
        println!("    - {}", job.source_path().display());
    }
}
