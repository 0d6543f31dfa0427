//! Process-wide admission control for concurrent runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use autoflow_protocols::EngineError;

/// Bounds how many runs may hold a browser session simultaneously.
///
/// Admission is atomic (semaphore check-and-decrement); no fairness or
/// ordering guarantee is made across waiters. Owned by the engine value, so
/// independent engine instances never share a budget.
pub struct SlotManager {
    semaphore: Arc<Semaphore>,
    active: Arc<AtomicUsize>,
    max: usize,
}

impl SlotManager {
    /// Create a manager with `max` slots.
    pub fn new(max: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max)),
            active: Arc::new(AtomicUsize::new(0)),
            max,
        }
    }

    /// Block the calling run until a slot is free. The returned permit
    /// releases the slot on drop.
    pub async fn acquire(&self) -> Result<SlotPermit, EngineError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| EngineError::ShuttingDown)?;

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(active, max = self.max, "Acquired concurrency slot");

        Ok(SlotPermit {
            _permit: permit,
            active: self.active.clone(),
        })
    }

    /// Runs currently holding a slot.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Configured bound.
    pub fn max(&self) -> usize {
        self.max
    }

    /// Stop admitting new runs. Pending and future `acquire` calls fail
    /// with [`EngineError::ShuttingDown`].
    pub fn close(&self) {
        self.semaphore.close();
    }
}

/// One unit of the concurrency budget, held while a run's session is open.
pub struct SlotPermit {
    _permit: OwnedSemaphorePermit,
    active: Arc<AtomicUsize>,
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        let active = self.active.fetch_sub(1, Ordering::SeqCst) - 1;
        debug!(active, "Released concurrency slot");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_release() {
        let slots = SlotManager::new(2);
        let a = slots.acquire().await.unwrap();
        let b = slots.acquire().await.unwrap();
        assert_eq!(slots.active(), 2);

        drop(a);
        assert_eq!(slots.active(), 1);
        drop(b);
        assert_eq!(slots.active(), 0);
    }

    #[tokio::test]
    async fn test_waiter_blocks_until_release() {
        let slots = Arc::new(SlotManager::new(1));
        let held = slots.acquire().await.unwrap();

        let waiter = {
            let slots = slots.clone();
            tokio::spawn(async move { slots.acquire().await.unwrap() })
        };

        // The waiter cannot get a slot while one is held.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());
        assert_eq!(slots.active(), 1);

        drop(held);
        let _permit = waiter.await.unwrap();
        assert_eq!(slots.active(), 1);
    }

    #[tokio::test]
    async fn test_never_exceeds_max() {
        let slots = Arc::new(SlotManager::new(2));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let slots = slots.clone();
            handles.push(tokio::spawn(async move {
                let permit = slots.acquire().await.unwrap();
                let seen = slots.active();
                tokio::time::sleep(Duration::from_millis(10)).await;
                drop(permit);
                seen
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap() <= 2);
        }
    }

    #[tokio::test]
    async fn test_close_rejects_acquire() {
        let slots = SlotManager::new(1);
        slots.close();
        assert!(matches!(
            slots.acquire().await,
            Err(EngineError::ShuttingDown)
        ));
    }
}
