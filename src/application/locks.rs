use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::EventId;

/// One async mutex per event. Mutations and settlement reads of the same event
/// take the event's lock, so they run one at a time; different events never
/// wait on each other.
#[derive(Default)]
pub struct EventLocks {
    locks: Mutex<HashMap<EventId, Arc<AsyncMutex<()>>>>,
}

impl EventLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `event_id`. Released when the guard drops.
    pub async fn lock(&self, event_id: &EventId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(event_id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Drop the bookkeeping for a deleted event.
    pub fn forget(&self, event_id: &EventId) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.remove(event_id);
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
