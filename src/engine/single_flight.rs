// src/engine/single_flight.rs

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

/// Number of jobs allowed in flight at once.
pub const MAX_JOBS_IN_FLIGHT: usize = 1;

/// Guard that admits at most [`MAX_JOBS_IN_FLIGHT`] jobs at a time.
///
/// Holding the returned permit is what "a job is running" means; dropping it
/// frees the slot.
#[derive(Debug, Clone)]
pub struct SingleFlight {
    slots: Arc<Semaphore>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Semaphore::new(MAX_JOBS_IN_FLIGHT)),
        }
    }

    /// Wait for the slot. `None` only if the guard was closed.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.slots).acquire_owned().await.ok()
    }

    /// Take the slot if it is free.
    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        match Arc::clone(&self.slots).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(TryAcquireError::NoPermits) | Err(TryAcquireError::Closed) => None,
        }
    }

    pub fn in_flight(&self) -> usize {
        MAX_JOBS_IN_FLIGHT - self.slots.available_permits()
    }
}

impl Default for SingleFlight {
    fn default() -> Self {
        Self::new()
    }
}
