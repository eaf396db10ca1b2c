// tests/dispatcher_single_flight.rs

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use spoolq::engine::{Dispatcher, watch_queue};
use spoolq::exec::{JobOutcome, JobRunner, RunnerOptions};
use spoolq::fs::FileSystem;
use spoolq::fs::mock::MockFileSystem;
use spoolq::job::JobArchive;
use spoolq::types::ExecutionState;
use spoolq_test_utils::builders::JobDescriptorBuilder;
use spoolq_test_utils::fake_backend::{BackendEvent, BackendLog, ScriptedBackend};
use spoolq_test_utils::{init_tracing, wait_until, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const PERIOD: Duration = Duration::from_millis(10);

fn runner(backend: ScriptedBackend) -> JobRunner<ScriptedBackend> {
    JobRunner::new(
        backend,
        RunnerOptions {
            poll_interval: Duration::from_millis(5),
            timeout: None,
        },
    )
}

#[tokio::test]
async fn jobs_run_one_at_a_time_in_queue_order() -> TestResult {
    init_tracing();
    let log = BackendLog::new();
    let (tx, rx) = watch_queue();
    let mut dispatcher = Dispatcher::new(rx, runner(ScriptedBackend::new(log.clone()).running_steps(3)), PERIOD);

    // Both files "created in the same instant".
    tx.enqueue(JobDescriptorBuilder::new("first").build()).unwrap();
    tx.enqueue(JobDescriptorBuilder::new("second").build()).unwrap();

    let shutdown = CancellationToken::new();
    let task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            dispatcher.run(&shutdown).await;
            dispatcher
        }
    });

    wait_until(|| log.terminal().len() == 2).await;
    shutdown.cancel();
    let dispatcher = with_timeout(task).await?;

    assert_eq!(log.submissions(), vec!["first", "second"]);
    assert_eq!(log.max_in_flight(), 1);

    // B is submitted only after A reached a terminal state.
    let events = log.events();
    let a_done = events
        .iter()
        .position(|e| *e == BackendEvent::StateChanged("first".into(), ExecutionState::Terminated))
        .unwrap();
    let b_submitted = events
        .iter()
        .position(|e| *e == BackendEvent::Submitted("second".into()))
        .unwrap();
    assert!(a_done < b_submitted);

    let summary = dispatcher.into_summary();
    let names: Vec<String> = summary.finished.iter().map(|r| r.job.name()).collect();
    assert_eq!(names, vec!["first", "second"]);
    assert!(summary.pending.is_empty());
    Ok(())
}

#[tokio::test]
async fn idle_loop_picks_up_a_new_job_exactly_once() -> TestResult {
    init_tracing();
    let log = BackendLog::new();
    let (tx, rx) = watch_queue();
    let mut dispatcher = Dispatcher::new(rx, runner(ScriptedBackend::new(log.clone())), PERIOD);

    let shutdown = CancellationToken::new();
    let task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            dispatcher.run(&shutdown).await;
            dispatcher
        }
    });

    // Let the loop idle over an empty queue for a few periods.
    tokio::time::sleep(PERIOD * 5).await;
    assert!(log.submissions().is_empty());

    tx.enqueue(JobDescriptorBuilder::new("late").build()).unwrap();
    wait_until(|| log.terminal() == vec!["late".to_string()]).await;

    // Give the loop a few more periods to misbehave.
    tokio::time::sleep(PERIOD * 5).await;
    shutdown.cancel();
    let dispatcher = with_timeout(task).await?;

    assert_eq!(log.submissions(), vec!["late"]);
    assert_eq!(dispatcher.finished().len(), 1);
    Ok(())
}

#[tokio::test]
async fn rejected_and_failed_jobs_do_not_stop_the_loop() -> TestResult {
    init_tracing();
    let log = BackendLog::new();
    let backend = ScriptedBackend::new(log.clone())
        .reject_job("rejected")
        .fail_job("broken");
    let (tx, rx) = watch_queue();
    let mut dispatcher = Dispatcher::new(rx, runner(backend), PERIOD);

    for name in ["rejected", "broken", "fine"] {
        tx.enqueue(JobDescriptorBuilder::new(name).build()).unwrap();
    }

    let shutdown = CancellationToken::new();
    let task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            dispatcher.run(&shutdown).await;
            dispatcher
        }
    });

    wait_until(|| log.terminal().len() == 2).await;
    shutdown.cancel();
    let summary = with_timeout(task).await?.into_summary();

    assert_eq!(summary.rejected.len(), 1);
    assert_eq!(summary.rejected[0].job.name(), "rejected");

    let outcomes: Vec<(String, bool)> = summary
        .finished
        .iter()
        .map(|r| (r.job.name(), r.outcome.is_success()))
        .collect();
    assert_eq!(
        outcomes,
        vec![("broken".to_string(), false), ("fine".to_string(), true)]
    );
    assert_eq!(log.submissions(), vec!["broken", "fine"]);
    Ok(())
}

#[tokio::test]
async fn shutdown_lets_running_job_finish_and_reports_queued_ones() -> TestResult {
    init_tracing();
    let log = BackendLog::new();
    let (tx, rx) = watch_queue();
    let mut dispatcher = Dispatcher::new(
        rx,
        runner(ScriptedBackend::new(log.clone()).running_steps(10)),
        PERIOD,
    );

    for name in ["running", "queued-1", "queued-2"] {
        tx.enqueue(JobDescriptorBuilder::new(name).build()).unwrap();
    }

    let shutdown = CancellationToken::new();
    let task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            dispatcher.run(&shutdown).await;
            dispatcher
        }
    });

    wait_until(|| {
        log.events()
            .contains(&BackendEvent::StateChanged("running".into(), ExecutionState::Running))
    })
    .await;
    shutdown.cancel();

    let summary = with_timeout(task).await?.into_summary();

    assert_eq!(summary.finished.len(), 1);
    assert_eq!(summary.finished[0].job.name(), "running");
    assert_eq!(summary.finished[0].outcome, JobOutcome::Succeeded);

    let pending: Vec<String> = summary.pending.iter().map(|j| j.name()).collect();
    assert_eq!(pending, vec!["queued-1", "queued-2"]);
    assert_eq!(log.submissions(), vec!["running"]);
    Ok(())
}

#[tokio::test]
async fn busy_single_flight_slot_holds_back_dispatch() -> TestResult {
    init_tracing();
    let log = BackendLog::new();
    let (tx, rx) = watch_queue();
    let dispatcher = Dispatcher::new(rx, runner(ScriptedBackend::new(log.clone())), PERIOD);

    let guard = dispatcher.single_flight().clone();
    let slot = guard.try_acquire().expect("slot starts free");

    tx.enqueue(JobDescriptorBuilder::new("waiting").build()).unwrap();

    let shutdown = CancellationToken::new();
    let task = tokio::spawn({
        let shutdown = shutdown.clone();
        let mut dispatcher = dispatcher;
        async move {
            dispatcher.run(&shutdown).await;
            dispatcher
        }
    });

    tokio::time::sleep(PERIOD * 5).await;
    assert!(log.submissions().is_empty());

    drop(slot);
    wait_until(|| log.terminal().len() == 1).await;
    shutdown.cancel();
    with_timeout(task).await?;

    assert_eq!(log.submissions(), vec!["waiting"]);
    Ok(())
}

#[tokio::test]
async fn finished_job_files_are_archived_by_outcome() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/spool/ok.toml", "x");
    fs.add_file("/spool/broken.toml", "y");

    let log = BackendLog::new();
    let (tx, rx) = watch_queue();
    let mut dispatcher = Dispatcher::new(
        rx,
        runner(ScriptedBackend::new(log.clone()).fail_job("broken")),
        PERIOD,
    )
    .with_archive(JobArchive::new(Arc::new(fs.clone()), "/archive"));

    tx.enqueue(JobDescriptorBuilder::new("ok").build()).unwrap();
    tx.enqueue(JobDescriptorBuilder::new("broken").build()).unwrap();

    let shutdown = CancellationToken::new();
    let task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            dispatcher.run(&shutdown).await;
            dispatcher
        }
    });

    wait_until(|| log.terminal().len() == 2).await;
    shutdown.cancel();
    with_timeout(task).await?;

    assert_eq!(
        fs.files(),
        vec![
            PathBuf::from("/archive/done/ok.toml"),
            PathBuf::from("/archive/failed/broken.toml"),
        ]
    );
    assert!(!fs.exists(Path::new("/spool/ok.toml")));
    Ok(())
}
