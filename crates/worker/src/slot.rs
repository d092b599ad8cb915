//! Process-wide exclusive execution slot.
//!
//! Each service's FIFO already serializes its own jobs; the slot is the
//! separate guarantee that at most one collaborator runs at any instant
//! across every service sharing it.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A semaphore of size one shared by all job services in the process.
#[derive(Debug, Clone)]
pub struct ExecutionSlot {
    semaphore: Arc<Semaphore>,
}

impl ExecutionSlot {
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Wait for the slot. `None` only if the slot was closed.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore).acquire_owned().await.ok()
    }
}

impl Default for ExecutionSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_one_holder_at_a_time() {
        let slot = ExecutionSlot::new();
        let permit = slot.acquire().await.expect("first acquire");

        let other = slot.clone();
        let waiter = tokio::spawn(async move { other.acquire().await.is_some() });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(permit);
        assert!(waiter.await.expect("join"));
    }
}
