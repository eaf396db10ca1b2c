// src/exec/mod.rs

//! Job execution layer.
//!
//! - [`backend`] defines the `ExecutionBackend` trait the runner drives.
//! - [`local`] is the production backend: it stages inputs into a scratch
//!   directory and runs the job's executable with `tokio::process::Command`.
//! - [`handle`] holds the per-submission handle, outcomes and reports.
//! - [`runner`] submits a job and polls the backend until it is terminal.

pub mod backend;
pub mod handle;
pub mod local;
pub mod runner;

pub use backend::{ExecutionBackend, ExecutionId};
pub use handle::{ExecutionHandle, JobOutcome, JobReport};
pub use local::LocalBackend;
pub use runner::{JobRunner, RunnerOptions};
