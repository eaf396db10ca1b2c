// src/engine/mod.rs

//! Queueing and dispatch.
//!
//! - [`queue`]: the FIFO between the directory watcher and the dispatch loop.
//! - [`single_flight`]: the guard that keeps at most one job in flight.
//! - [`dispatcher`]: the loop that pops jobs and hands them to the runner.

pub mod dispatcher;
pub mod queue;
pub mod single_flight;

pub use dispatcher::{DispatchSummary, Dispatcher, RejectedJob};
pub use queue::{QueueConsumer, QueueProducer, watch_queue};
pub use single_flight::{MAX_JOBS_IN_FLIGHT, SingleFlight};
