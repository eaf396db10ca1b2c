// src/engine/queue.rs

//! FIFO hand-off between the directory watcher and the dispatch loop.
//!
//! The queue is an unbounded mpsc channel split into a cloneable
//! [`QueueProducer`] and a single [`QueueConsumer`]; neither side needs a lock.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::debug;

use crate::job::JobDescriptor;

/// Create a new, empty watch queue.
pub fn watch_queue() -> (QueueProducer, QueueConsumer) {
    let (tx, rx) = mpsc::unbounded_channel();
    (QueueProducer { tx }, QueueConsumer { rx })
}

/// Appending side of the watch queue.
#[derive(Debug, Clone)]
pub struct QueueProducer {
    tx: mpsc::UnboundedSender<JobDescriptor>,
}

impl QueueProducer {
    /// Append `job` to the back of the queue.
    ///
    /// Returns the job back if the consumer is gone.
    pub fn enqueue(&self, job: JobDescriptor) -> Result<(), JobDescriptor> {
        self.tx.send(job).map_err(|e| e.0)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Popping side of the watch queue. There is exactly one.
#[derive(Debug)]
pub struct QueueConsumer {
    rx: mpsc::UnboundedReceiver<JobDescriptor>,
}

impl QueueConsumer {
    /// Remove and return the oldest job, or `None` if the queue is empty.
    /// Never blocks.
    pub fn dequeue(&mut self) -> Option<JobDescriptor> {
        match self.rx.try_recv() {
            Ok(job) => Some(job),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Remove every queued job, oldest first.
    pub fn drain(&mut self) -> Vec<JobDescriptor> {
        let mut jobs = Vec::with_capacity(self.len());
        while let Some(job) = self.dequeue() {
            jobs.push(job);
        }
        debug!(drained = jobs.len(), "drained watch queue");
        jobs
    }
}
