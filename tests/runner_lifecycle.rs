// tests/runner_lifecycle.rs

use std::error::Error;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use spoolq::errors::SpoolError;
use spoolq::exec::{JobOutcome, JobRunner, RunnerOptions};
use spoolq::types::ExecutionState;
use spoolq_test_utils::builders::JobDescriptorBuilder;
use spoolq_test_utils::fake_backend::{BackendEvent, BackendLog, ScriptedBackend};
use spoolq_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn fast() -> RunnerOptions {
    RunnerOptions {
        poll_interval: Duration::from_millis(5),
        timeout: None,
    }
}

#[tokio::test]
async fn job_is_submitted_once_and_polled_to_termination() -> TestResult {
    init_tracing();
    let log = BackendLog::new();
    let mut runner = JobRunner::new(ScriptedBackend::new(log.clone()).running_steps(2), fast());

    let report = with_timeout(runner.run(JobDescriptorBuilder::new("a").build())).await?;

    assert_eq!(report.outcome, JobOutcome::Succeeded);
    assert_eq!(report.job.name(), "a");
    assert_eq!(log.submissions(), vec!["a".to_string()]);
    // New->Submitted, Submitted->Running, two extra Running polls, Running->Terminated.
    assert_eq!(log.progress_calls(), 5);
    // The backend is told to forget the job once its outcome is in.
    assert_eq!(log.events().last(), Some(&BackendEvent::Released("a".to_string())));

    let states: Vec<ExecutionState> = log
        .events()
        .into_iter()
        .filter_map(|e| match e {
            BackendEvent::StateChanged(_, s) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            ExecutionState::Submitted,
            ExecutionState::Running,
            ExecutionState::Terminated
        ]
    );
    Ok(())
}

#[tokio::test]
async fn backend_failure_is_a_terminal_outcome_not_retried() -> TestResult {
    init_tracing();
    let log = BackendLog::new();
    let mut runner = JobRunner::new(ScriptedBackend::new(log.clone()).fail_job("bad"), fast());

    let report = with_timeout(runner.run(JobDescriptorBuilder::new("bad").build())).await?;

    match report.outcome {
        JobOutcome::Failed { reason } => assert!(reason.contains("scripted failure")),
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(log.submissions().len(), 1);
    Ok(())
}

#[tokio::test]
async fn rejected_submission_is_an_error() {
    init_tracing();
    let log = BackendLog::new();
    let mut runner = JobRunner::new(ScriptedBackend::new(log.clone()).reject_job("nope"), fast());

    let result = with_timeout(runner.run(JobDescriptorBuilder::new("nope").build())).await;

    assert!(matches!(result, Err(SpoolError::BackendSubmission { .. })));
    assert_eq!(log.progress_calls(), 0);
}

#[tokio::test]
async fn driving_a_finished_handle_is_a_no_op() -> TestResult {
    init_tracing();
    let log = BackendLog::new();
    let mut runner = JobRunner::new(ScriptedBackend::new(log.clone()), fast());

    let mut handle = runner.submit(JobDescriptorBuilder::new("once").build())?;
    let first = with_timeout(runner.drive(&mut handle)).await;
    assert_eq!(first, JobOutcome::Succeeded);
    assert_eq!(handle.state(), ExecutionState::Terminated);

    let events_before = log.events();
    let second = with_timeout(runner.drive(&mut handle)).await;

    assert_eq!(second, JobOutcome::Succeeded);
    assert_eq!(handle.state(), ExecutionState::Terminated);
    assert_eq!(log.events(), events_before);
    assert_eq!(log.submissions().len(), 1);
    Ok(())
}

#[tokio::test]
async fn hung_job_times_out_and_is_abandoned() -> TestResult {
    init_tracing();
    let log = BackendLog::new();
    let options = RunnerOptions {
        poll_interval: Duration::from_millis(5),
        timeout: Some(Duration::from_millis(100)),
    };
    let mut runner = JobRunner::new(ScriptedBackend::new(log.clone()).hang_job("stuck"), options);

    let report = with_timeout(runner.run(JobDescriptorBuilder::new("stuck").build())).await?;

    assert_eq!(report.outcome, JobOutcome::TimedOut);
    assert!(log.events().contains(&BackendEvent::Abandoned("stuck".to_string())));
    Ok(())
}

#[tokio::test]
async fn abort_token_abandons_running_job() -> TestResult {
    init_tracing();
    let log = BackendLog::new();
    let abort = CancellationToken::new();
    let mut runner = JobRunner::new(ScriptedBackend::new(log.clone()).hang_job("long"), fast())
        .with_abort(abort.clone());

    let canceller = {
        let log = log.clone();
        tokio::spawn(async move {
            spoolq_test_utils::wait_until(|| {
                log.events()
                    .contains(&BackendEvent::StateChanged("long".into(), ExecutionState::Running))
            })
            .await;
            abort.cancel();
        })
    };

    let report = with_timeout(runner.run(JobDescriptorBuilder::new("long").build())).await?;
    canceller.await?;

    assert_eq!(report.outcome, JobOutcome::Abandoned);
    assert!(log.events().contains(&BackendEvent::Abandoned("long".to_string())));
    Ok(())
}
