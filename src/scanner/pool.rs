//! Bounded worker pool for probe tasks.
//!
//! A counting semaphore caps how many probes run at once. Tokio's semaphore
//! is fair, so waiting probes are admitted in the order they asked.

use crate::error::ScanError;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default number of concurrently executing probes.
pub const DEFAULT_MAX_CONCURRENCY: usize = 100;

/// Fixed-capacity pool of probe slots.
///
/// Cloning shares the same slots. A pool is owned by one
/// [`ScanCoordinator`](super::ScanCoordinator); scans started from that
/// coordinator share its capacity, while separate coordinators never
/// compete for slots.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl WorkerPool {
    /// Create a pool with `capacity` slots.
    pub fn new(capacity: usize) -> Result<Self, ScanError> {
        if capacity == 0 {
            return Err(ScanError::InvalidConfig(
                "worker pool capacity must be at least 1".to_string(),
            ));
        }
        if capacity > Semaphore::MAX_PERMITS {
            return Err(ScanError::InvalidConfig(format!(
                "worker pool capacity {} exceeds {}",
                capacity,
                Semaphore::MAX_PERMITS
            )));
        }
        Ok(Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Wait for a free slot.
    ///
    /// The slot is released when the returned permit is dropped. Returns
    /// `None` only if the pool was closed.
    pub async fn admit(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.slots).acquire_owned().await.ok()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }

    /// True when no slot is held.
    pub fn is_idle(&self) -> bool {
        self.in_flight() == 0
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self {
            slots: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENCY)),
            capacity: DEFAULT_MAX_CONCURRENCY,
        }
    }
}
