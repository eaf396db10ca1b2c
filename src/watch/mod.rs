// src/watch/mod.rs

//! Spool directory watching.
//!
//! This module is responsible for:
//! - Registering a non-recursive `notify` watch on the spool directory.
//! - Picking the events that mean "a job file appeared".
//! - Parsing each new file and putting the result on the watch queue.
//!
//! It does **not** know about execution; it only feeds the queue.

pub mod event_handler;
pub mod watcher;

pub use event_handler::{is_job_arrival, process_new_file};
pub use watcher::{WatcherHandle, spawn_watcher};
